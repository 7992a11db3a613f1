use fs_err as fs;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::errors::{SiteError, SiteResult};
use crate::wire::FileSet;

/// Model-supplied names must stay inside the site directory.
pub fn checked_relative(name: &str) -> SiteResult<PathBuf> {
    let path = Path::new(name);
    if name.trim().is_empty() || path.is_absolute() {
        return Err(SiteError::InvalidPath(name.to_string()));
    }
    for c in path.components() {
        match c {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(SiteError::InvalidPath(name.to_string())),
        }
    }
    Ok(path.to_path_buf())
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Reads every visible text file under `dir`; names use `/` separators.
pub fn load_site(dir: &Path) -> SiteResult<FileSet> {
    let mut files = FileSet::new();
    if !dir.exists() {
        return Ok(files);
    }
    for entry in WalkDir::new(dir).sort_by_file_name().into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = entry.map_err(|e| SiteError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = match entry.path().strip_prefix(dir) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        match fs::read_to_string(entry.path()) {
            Ok(content) => {
                files.insert(name, content);
            }
            Err(e) => tracing::warn!(file = %name, error = %e, "skipping unreadable file"),
        }
    }
    Ok(files)
}

/// Writes the whole set or nothing: every name is checked and every file
/// staged in a temp file before the first one replaces its target.
/// Returns bytes written.
pub fn write_site(dir: &Path, files: &FileSet) -> SiteResult<u64> {
    let mut targets = Vec::with_capacity(files.len());
    for (name, content) in files {
        targets.push((dir.join(checked_relative(name)?), content));
    }

    let mut staged = Vec::with_capacity(targets.len());
    for (abs, content) in targets {
        let parent = abs.parent().unwrap_or(dir);
        fs::create_dir_all(parent)?;
        let tmp = NamedTempFile::new_in(parent)?;
        fs::write(tmp.path(), content)?;
        staged.push((tmp, abs, content.len() as u64));
    }

    let mut written = 0u64;
    for (tmp, abs, len) in staged {
        tmp.persist(&abs).map_err(|e| SiteError::Io(e.error))?;
        written += len;
    }
    tracing::debug!(dir = %dir.display(), files = files.len(), bytes = written, "wrote site");
    Ok(written)
}

/// Deletes files under `dir` that are not in `keep`, so a restore or regenerate leaves no stale files.
pub fn prune_site(dir: &Path, keep: &FileSet) -> SiteResult<Vec<String>> {
    let current = load_site(dir)?;
    let mut removed = Vec::new();
    for name in current.names() {
        if !keep.contains(name) {
            fs::remove_file(dir.join(checked_relative(name)?))?;
            removed.push(name.to_string());
        }
    }
    Ok(removed)
}
