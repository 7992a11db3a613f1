use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(alias = "google")]
    Gemini,
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.5-flash",
            ProviderKind::OpenAI => "gpt-4.1-mini",
            ProviderKind::Anthropic => "claude-sonnet-4-5",
            ProviderKind::Ollama => "llama3.1",
        }
    }
}

/// Optional server stub generated next to the static files.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    None,
    Flask,
    #[value(name = "fastapi", alias = "fast-api")]
    FastApi,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
}

#[derive(Parser, Debug)]
#[command(name = "vibe_sitegen", version, about = "Generate, refine and deploy small websites with an LLM")]
pub struct Args {
    /// Project root holding the site directory and version history.
    #[arg(long, default_value = ".")]
    pub root: String,

    /// TOML config file (defaults to <root>/vibe_sitegen.toml when present).
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a new site from a description.
    Generate {
        #[arg(long, short)]
        prompt: String,
        #[arg(long, value_enum, default_value_t = Backend::None)]
        backend: Backend,
        #[arg(long, default_value_t = false)]
        no_responsive: bool,
    },
    /// Ask the model to change the current site.
    Edit {
        #[arg(long, short)]
        message: String,
    },
    /// Write one self-contained HTML file for a browser.
    Preview {
        #[arg(long, value_enum, default_value_t = Theme::Auto)]
        theme: Theme,
        #[arg(long, default_value = "preview.html")]
        out: String,
    },
    /// Package the current site as a ZIP archive.
    Export {
        #[arg(long, default_value = "site.zip")]
        out: String,
    },
    /// Explain one file of the current site.
    Explain {
        #[arg(long)]
        file: String,
    },
    /// List saved versions, newest last.
    History,
    /// Replace the current site with a saved version.
    Restore {
        id: String,
    },
    /// Diff the last two versions.
    Diff {
        #[arg(long)]
        file: Option<String>,
    },
    /// Create or update a GitHub repository and enable Pages.
    Deploy {
        #[arg(long)]
        repo: String,
        #[arg(long, default_value_t = false)]
        private: bool,
        #[arg(long, short, default_value_t = false)]
        yes: bool,
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}
