use colored::Colorize;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

use crate::diff::{ChangeKind, FileChange};
use crate::history::Version;
use crate::wire::{DeployResult, FileSet};

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();
    let mut s = String::new();
    if io::stdin().read_line(&mut s).is_ok() {
        let ans = s.trim().to_lowercase();
        ans == "y" || ans == "yes"
    } else {
        false
    }
}

pub fn show_files(title: &str, files: &FileSet) {
    println!("\n{}", format!("=== {title} ===").bold());
    for (name, content) in files {
        println!("  {:<28} {:>10}", name, format_size(content.len(), DECIMAL).dimmed());
    }
    println!(
        "  {} files, {}",
        files.len().to_string().bold(),
        format_size(files.total_bytes(), DECIMAL)
    );
}

fn colorize_line(line: &str) -> String {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold().to_string()
    } else if line.starts_with("@@") {
        line.cyan().to_string()
    } else if line.starts_with('+') {
        line.green().to_string()
    } else if line.starts_with('-') {
        line.red().to_string()
    } else {
        line.to_string()
    }
}

/// Changed files with their diffs, optionally restricted to one filename.
pub fn print_changes(changes: &[FileChange], only: Option<&str>) {
    let shown: Vec<&FileChange> = changes
        .iter()
        .filter(|c| only.map_or(true, |name| c.name == name))
        .collect();
    if shown.is_empty() {
        println!("{}", "(no changes)".dimmed());
        return;
    }
    for c in shown {
        let label = match c.kind {
            ChangeKind::Added => "[ADDED]".green().bold(),
            ChangeKind::Removed => "[REMOVED]".red().bold(),
            ChangeKind::Modified => "[MODIFIED]".yellow().bold(),
        };
        println!(
            "{} {}  ({} -> {})",
            label,
            c.name,
            format_size(c.bytes_before, DECIMAL),
            format_size(c.bytes_after, DECIMAL)
        );
        for line in &c.lines {
            println!("{}", colorize_line(line));
        }
        println!();
    }
}

pub fn print_history(versions: &[Version]) {
    if versions.is_empty() {
        println!("No versions yet. Generate a website to create versions.");
        return;
    }
    println!("\n{}", "=== VERSIONS (newest last) ===".bold());
    for v in versions {
        println!(
            "  {}  {}  {} files  {}",
            v.short_id().yellow(),
            v.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            v.files.len(),
            v.message
        );
    }
}

pub fn print_deploy_dashboard(res: &DeployResult) {
    println!(
        "\n{}",
        "┏━━━━━━━━━━━━━━━━━━━━━━━ Deploy Results ━━━━━━━━━━━━━━━━━━━━━━┓".bold()
    );
    println!(
        "  {}: {}   {}: {}   {}: {}   {}: {}",
        "Repository".bold(), res.full_name,
        "Uploaded".green().bold(), res.uploaded,
        "Failed".red().bold(), res.failures.len(),
        "Mode".bold(), if res.adopted_existing { "update" } else { "create" }
    );
    println!("{}", "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold());

    for f in &res.failures {
        println!("  {} {}: {}", "[FAILED]".red().bold(), f.path, f.reason);
    }
    if res.pages_enabled {
        println!("\n{} {}", "Live site URL:".green().bold(), res.url);
    } else {
        println!(
            "\n{} enable Pages manually in the repository settings; it will serve at {}",
            "Pages not enabled:".yellow().bold(),
            res.url
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_lines_keep_their_text() {
        colored::control::set_override(false);
        assert_eq!(colorize_line("+added"), "+added");
        assert_eq!(colorize_line("--- a/x"), "--- a/x");
        assert_eq!(colorize_line(" context"), " context");
    }
}
