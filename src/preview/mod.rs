use anyhow::Result;
use fs_err as fs;
use std::path::Path;

use crate::cli::Theme;
use crate::wire::{FileSet, INDEX_HTML, SCRIPT_JS, STYLES_CSS};

/// Inline stylesheet and script around the page body so a browser can open one file.
pub fn combine_to_html(files: &FileSet, theme: Theme) -> String {
    let html = files.get(INDEX_HTML).unwrap_or_default();
    let css = files.get(STYLES_CSS).unwrap_or_default();
    let js = files.get(SCRIPT_JS).unwrap_or_default();

    let doc = format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset='utf-8'>\n<style>{css}</style>\n</head>\n<body>\n{html}\n<script>{js}</script>\n</body>\n</html>\n"
    );
    match theme {
        Theme::Auto => doc,
        Theme::Light => doc.replacen("<body", "<body data-theme='light'", 1),
        Theme::Dark => doc.replacen("<body", "<body data-theme='dark'", 1),
    }
}

pub fn write_preview(path: &Path, files: &FileSet, theme: Theme) -> Result<usize> {
    let doc = combine_to_html(files, theme);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &doc)?;
    Ok(doc.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> FileSet {
        [
            ("index.html".to_string(), "<h1>Hi</h1>".to_string()),
            ("styles.css".to_string(), "h1{color:red}".to_string()),
            ("script.js".to_string(), "console.log(1)".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn inlines_all_three_files() {
        let doc = combine_to_html(&files(), Theme::Auto);
        assert!(doc.contains("<style>h1{color:red}</style>"));
        assert!(doc.contains("<body>\n<h1>Hi</h1>"));
        assert!(doc.contains("<script>console.log(1)</script>"));
    }

    #[test]
    fn theme_marks_body_once() {
        let doc = combine_to_html(&files(), Theme::Dark);
        assert!(doc.contains("<body data-theme='dark'>"));
        assert_eq!(doc.matches("data-theme").count(), 1);
    }

    #[test]
    fn missing_files_render_empty() {
        let doc = combine_to_html(&FileSet::new(), Theme::Light);
        assert!(doc.contains("<style></style>"));
        assert!(doc.contains("data-theme='light'"));
    }

    #[test]
    fn writes_preview_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let out = temp.path().join("out").join("preview.html");
        let n = write_preview(&out, &files(), Theme::Auto).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap().len(), n);
    }
}
