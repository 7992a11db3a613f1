//! Recovers a [`FileSet`] from model text that is only mostly JSON.
//!
//! Models wrap their answer in markdown fences, add a sentence before or
//! after it, or return exactly what was asked. Each strategy below strips one
//! kind of noise and nothing else; the first strategy that yields a JSON
//! object wins. Nothing is invented except the three canonical defaults.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::errors::SiteError;
use crate::wire::{EditOutcome, FileSet, INDEX_HTML, SCRIPT_JS, STYLES_CSS};

type JsonObject = Map<String, Value>;
type Strategy = fn(&str) -> Option<JsonObject>;

/// Tried in order; first success wins.
const STRATEGIES: [(&str, Strategy); 3] = [
    ("direct", parse_direct),
    ("fenced", parse_fenced),
    ("braces", parse_brace_span),
];

/// First fenced block, optional language tag, unclosed fence runs to end of text.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*(?:[A-Za-z][\w.+-]*)?[ \t]*\r?\n?(.*?)(?:```|\z)")
        .expect("fence pattern is valid")
});

pub const DEFAULT_STYLES: &str = "body {\n  font-family: system-ui, sans-serif;\n  margin: 0;\n  padding: 2rem;\n  line-height: 1.5;\n}\n";

pub const DEFAULT_SCRIPT: &str = "// No interactive behaviour yet.\n";

fn parse_object(text: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn parse_direct(text: &str) -> Option<JsonObject> {
    parse_object(text.trim())
}

fn parse_fenced(text: &str) -> Option<JsonObject> {
    if !text.contains("```") {
        return None;
    }
    let inner = FENCE.captures(text)?.get(1)?.as_str();
    parse_object(inner.trim())
}

fn parse_brace_span(text: &str) -> Option<JsonObject> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    parse_object(&text[start..=end])
}

/// Runs the strategy chain; keeps the raw text on failure for diagnostics.
pub fn recover_object(raw: &str) -> Result<JsonObject, SiteError> {
    for (name, strategy) in STRATEGIES {
        if let Some(obj) = strategy(raw) {
            tracing::debug!(strategy = name, keys = obj.len(), "recovered JSON object");
            return Ok(obj);
        }
    }
    Err(SiteError::MalformedResponse { raw: raw.to_string() })
}

/// Picks the nested file mapping named by the first matching key, else the object itself.
fn file_mapping(mut obj: JsonObject, nested_keys: &[&str]) -> JsonObject {
    for key in nested_keys {
        if matches!(obj.get(*key), Some(Value::Object(_))) {
            if let Some(Value::Object(inner)) = obj.remove(*key) {
                return inner;
            }
        }
    }
    obj
}

fn into_file_set(obj: JsonObject) -> FileSet {
    obj.into_iter()
        .filter_map(|(name, value)| match value {
            Value::String(content) => Some((name, content)),
            other => {
                tracing::warn!(file = %name, kind = value_kind(&other), "dropping non-text file entry");
                None
            }
        })
        .collect()
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn default_index_html(prompt: &str) -> String {
    let prompt = prompt.trim();
    let description = if prompt.is_empty() { "Your new website" } else { prompt };
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"utf-8\">\n  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n  <title>My Website</title>\n  <link rel=\"stylesheet\" href=\"styles.css\">\n</head>\n<body>\n  <h1>My Website</h1>\n  <p>{}</p>\n  <script src=\"script.js\"></script>\n</body>\n</html>\n",
        escape_html(description)
    )
}

/// Adds any missing canonical file with its fixed default.
pub fn fill_defaults(files: &mut FileSet, prompt: &str) {
    if !files.contains(INDEX_HTML) {
        files.insert(INDEX_HTML, default_index_html(prompt));
    }
    if !files.contains(STYLES_CSS) {
        files.insert(STYLES_CSS, DEFAULT_STYLES);
    }
    if !files.contains(SCRIPT_JS) {
        files.insert(SCRIPT_JS, DEFAULT_SCRIPT);
    }
}

/// The site used when generation fails outright.
pub fn default_files(prompt: &str) -> FileSet {
    let mut files = FileSet::new();
    fill_defaults(&mut files, prompt);
    files
}

/// Model text -> renderable FileSet. `prompt` only feeds the default page.
pub fn coerce(raw: &str, prompt: &str) -> Result<FileSet, SiteError> {
    let obj = recover_object(raw)?;
    let mut files = into_file_set(file_mapping(obj, &["files"]));
    fill_defaults(&mut files, prompt);
    Ok(files)
}

/// Chat-edit reply: files to merge, or plain text when no object is recoverable.
pub fn coerce_edit(raw: &str) -> EditOutcome {
    let mut obj = match recover_object(raw) {
        Ok(obj) => obj,
        Err(_) => return EditOutcome::Reply(raw.trim().to_string()),
    };
    let message = match obj.remove("message") {
        Some(Value::String(m)) => Some(m),
        Some(other) => {
            obj.insert("message".into(), other);
            None
        }
        None => None,
    };
    let files = into_file_set(file_mapping(obj, &["files_updated", "files"]));
    if files.is_empty() {
        return EditOutcome::Reply(message.unwrap_or_else(|| raw.trim().to_string()));
    }
    EditOutcome::Updated { files, message }
}
