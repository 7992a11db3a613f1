use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::wire::FileSet;

/// A full snapshot of the site, saved after every generate, edit or restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub files: FileSet,
}

impl Version {
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

fn version_path(dir: &Path, v: &Version) -> PathBuf {
    dir.join(format!("{}_{}.json", v.timestamp.format("%Y%m%dT%H%M%S%.6fZ"), v.id))
}

pub fn save_version(dir: &Path, files: &FileSet, message: &str) -> Result<Version> {
    fs::create_dir_all(dir)?;
    let version = Version {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        message: message.trim().to_string(),
        files: files.clone(),
    };
    let path = version_path(dir, &version);
    fs::write(&path, to_string_pretty(&version)?)?;
    tracing::debug!(path = %path.display(), "saved version");
    Ok(version)
}

/// Oldest first. Unparseable snapshot files are skipped with a warning.
pub fn list_versions(dir: &Path) -> Result<Vec<Version>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let text = fs::read_to_string(&path)?;
        match serde_json::from_str::<Version>(&text) {
            Ok(v) => out.push(v),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable version"),
        }
    }
    out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    Ok(out)
}

/// Looks a version up by a unique prefix of its id (hyphens optional).
pub fn load_version(dir: &Path, id_prefix: &str) -> Result<Version> {
    let needle = id_prefix.trim().replace('-', "").to_lowercase();
    if needle.is_empty() {
        bail!("empty version id");
    }
    let mut matches: Vec<Version> = list_versions(dir)?
        .into_iter()
        .filter(|v| v.id.simple().to_string().starts_with(&needle))
        .collect();
    match matches.len() {
        0 => Err(anyhow!("no version matches {id_prefix}")),
        1 => Ok(matches.remove(0)),
        n => Err(anyhow!("{n} versions match {id_prefix}; use more characters")),
    }
}

/// (previous, newest), when at least two versions exist.
pub fn latest_pair(dir: &Path) -> Result<Option<(Version, Version)>> {
    let mut all = list_versions(dir).context("reading version history")?;
    if all.len() < 2 {
        return Ok(None);
    }
    let newest = all.pop();
    let previous = all.pop();
    Ok(previous.zip(newest))
}
