use crate::wire::FileSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind { Added, Removed, Modified }

#[derive(Debug, Clone)]
pub struct FileChange {
    pub name: String,
    pub kind: ChangeKind,
    pub bytes_before: usize,
    pub bytes_after: usize,
    pub lines: Vec<String>,
}

/// Unified diff with three lines of context; empty when the texts match.
pub fn file_diff(name: &str, old: &str, new: &str) -> Vec<String> {
    if old == new {
        return Vec::new();
    }
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();
    difflib::unified_diff(&a, &b, &format!("a/{name}"), &format!("b/{name}"), "", "", 3)
        .into_iter()
        .map(|l| l.trim_end_matches(|c: char| c == '\n' || c == '\t').to_string())
        .collect()
}

/// Per-file changes from `old` to `new`, sorted by filename. Unchanged files are omitted.
pub fn fileset_diff(old: &FileSet, new: &FileSet) -> Vec<FileChange> {
    let mut out = Vec::new();
    for (name, before) in old {
        match new.get(name) {
            None => out.push(FileChange {
                name: name.clone(),
                kind: ChangeKind::Removed,
                bytes_before: before.len(),
                bytes_after: 0,
                lines: file_diff(name, before, ""),
            }),
            Some(after) if after != before.as_str() => out.push(FileChange {
                name: name.clone(),
                kind: ChangeKind::Modified,
                bytes_before: before.len(),
                bytes_after: after.len(),
                lines: file_diff(name, before, after),
            }),
            Some(_) => {}
        }
    }
    for (name, after) in new {
        if !old.contains(name) {
            out.push(FileChange {
                name: name.clone(),
                kind: ChangeKind::Added,
                bytes_before: 0,
                bytes_after: after.len(),
                lines: file_diff(name, "", after),
            });
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}
