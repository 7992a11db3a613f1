use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{Args, ProviderKind};
use crate::errors::SiteError;

pub const CONFIG_FILE: &str = "vibe_sitegen.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root: String,
    pub site_dir: String,
    pub history_dir: String,
    pub provider: ProviderKind,
    /// Empty means the provider's default model.
    pub model: String,
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub json_mode: bool,
    pub ollama_url: String,
    pub github_api_base: String,
    pub pages_branch: String,
    pub upload_concurrency: usize,
    pub recheck_attempts: u32,
    /// Pause between repository rechecks after a name conflict.
    pub recheck_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: ".".into(),
            site_dir: "site".into(),
            history_dir: ".vibe/versions".into(),
            provider: ProviderKind::Gemini,
            model: String::new(),
            timeout_secs: 120,
            max_output_tokens: 8192,
            temperature: 0.2,
            json_mode: true,
            ollama_url: "http://localhost:11434".into(),
            github_api_base: "https://api.github.com".into(),
            pages_branch: "main".into(),
            upload_concurrency: 1,
            recheck_attempts: 2,
            recheck_delay_ms: 500,
        }
    }
}

impl Config {
    /// Reads `path`, or `<root>/vibe_sitegen.toml` when no path is given.
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(root: &Path, path: Option<&Path>) -> Result<Self, SiteError> {
        let (file, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (root.join(CONFIG_FILE), false),
        };
        if !file.exists() {
            if explicit {
                return Err(SiteError::Config(format!("{} does not exist", file.display())));
            }
            tracing::debug!(path = %file.display(), "no config file, using defaults");
            return Ok(Self { root: root.display().to_string(), ..Self::default() });
        }
        let text = fs::read_to_string(&file)?;
        let mut cfg: Config = toml::from_str(&text)
            .map_err(|e| SiteError::Config(format!("{}: {e}", file.display())))?;
        cfg.root = root.display().to_string();
        tracing::debug!(path = %file.display(), "loaded config");
        Ok(cfg)
    }

    /// CLI flags win over file values.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(p) = args.provider {
            if p != self.provider {
                self.model.clear();
            }
            self.provider = p;
        }
        if let Some(m) = &args.model {
            self.model = m.clone();
        }
        if let Some(t) = args.timeout_secs {
            self.timeout_secs = t;
        }
    }

    pub fn model_name(&self) -> &str {
        if self.model.trim().is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    pub fn site_path(&self) -> PathBuf {
        Path::new(&self.root).join(&self.site_dir)
    }

    pub fn history_path(&self) -> PathBuf {
        Path::new(&self.root).join(&self.history_dir)
    }
}
