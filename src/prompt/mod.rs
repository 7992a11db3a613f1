use crate::cli::Backend;
use crate::wire::FileSet;

pub fn system_prompt_generate() -> String {
r#"You are an AI website generator.
Respond ONLY with valid JSON. No explanations.

JSON format:
{
  "files": {
    "index.html": "...",
    "styles.css": "...",
    "script.js": "...",
    "backend.py": "..." (only when a backend is requested)
  }
}

Rules:
- index.html links styles.css and script.js with relative paths.
- Realistic, domain-appropriate copy. No lorem ipsum.
- Semantic HTML, labelled form inputs, sufficient color contrast.
- Do NOT write markdown.
- Do NOT write extra text.
- MUST return pure JSON."#
        .to_string()
}

pub fn system_prompt_edit() -> String {
r#"You are an AI assistant that edits an existing static website.
If the user asks for a change, respond ONLY with JSON:
{
  "files_updated": { "<filename>": "<complete new file content>" },
  "message": "<one or two sentences describing what changed>"
}
Include only the files you changed, each in full. Never return partial files or diffs.
If the user only asks a question, answer in plain text without JSON."#
        .to_string()
}

pub fn system_prompt_explain() -> String {
    "You are a patient web development tutor. Explain code clearly and concisely in markdown, \
     section by section, for someone learning HTML, CSS and JavaScript."
        .to_string()
}

fn backend_line(backend: Backend) -> Option<&'static str> {
    match backend {
        Backend::None => None,
        Backend::Flask => Some("Also include backend.py: a minimal Flask app that serves the static files and exposes any API the page needs."),
        Backend::FastApi => Some("Also include backend.py: a minimal FastAPI app that serves the static files and exposes any API the page needs."),
    }
}

pub fn user_prompt_generate(prompt: &str, backend: Backend, responsive: bool) -> String {
    let mut out = format!("User Request:\n{}\n", prompt.trim());
    if responsive {
        out.push_str("\nThe site must be fully responsive, with a layout that works on mobile screens.");
    }
    if let Some(line) = backend_line(backend) {
        out.push('\n');
        out.push_str(line);
    }
    out
}

pub fn user_prompt_edit(message: &str, current: &FileSet) -> anyhow::Result<String> {
    Ok(format!(
        "Modify these website files according to the user's message.\n\nUser message:\n{}\n\nCurrent files:\n{}\n",
        message.trim(),
        current.to_json_pretty()?
    ))
}

pub fn user_prompt_explain(filename: &str, source: &str) -> String {
    format!("Explain the file `{filename}`:\n\n{source}")
}
