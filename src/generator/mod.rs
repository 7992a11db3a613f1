use crate::cli::Backend;
use crate::coerce;
use crate::config::Config;
use crate::errors::{SiteError, SiteResult};
use crate::prompt;
use crate::provider::DynProvider;
use crate::wire::{EditOutcome, FileSet, Instruction, LlmRequest};

#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub backend: Backend,
    pub responsive: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { backend: Backend::None, responsive: true }
    }
}

/// Request knobs shared by every call.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub json_mode: bool,
}

impl From<&Config> for Limits {
    fn from(cfg: &Config) -> Self {
        Self {
            max_output_tokens: cfg.max_output_tokens,
            temperature: cfg.temperature,
            json_mode: cfg.json_mode,
        }
    }
}

pub struct WebsiteGenerator {
    provider: DynProvider,
    limits: Limits,
}

impl WebsiteGenerator {
    pub fn new(provider: DynProvider, limits: Limits) -> Self {
        Self { provider, limits }
    }

    fn request(&self, instruction: Instruction, json_mode: bool) -> LlmRequest {
        LlmRequest {
            instruction,
            max_output_tokens: self.limits.max_output_tokens,
            json_mode: json_mode && self.limits.json_mode,
            temperature: self.limits.temperature,
        }
    }

    async fn call(&self, req: &LlmRequest) -> SiteResult<String> {
        self.provider
            .complete(req)
            .await
            .map_err(|e| SiteError::Provider(format!("{e:#}")))
    }

    /// New site from a description. `MalformedResponse` means the caller should use `fallback_site`.
    pub async fn generate_website(&self, user_prompt: &str, opts: &GenerateOptions) -> SiteResult<FileSet> {
        let req = self.request(
            Instruction {
                system: prompt::system_prompt_generate(),
                user: prompt::user_prompt_generate(user_prompt, opts.backend, opts.responsive),
                developer: None,
            },
            true,
        );
        let raw = self.call(&req).await?;
        let files = coerce::coerce(&raw, user_prompt)?;
        tracing::info!(files = files.len(), bytes = files.total_bytes(), "generated site");
        Ok(files)
    }

    /// One chat turn against the current files. JSON mode stays off so the model may just answer.
    pub async fn edit_files(&self, message: &str, current: &FileSet) -> SiteResult<EditOutcome> {
        let user = prompt::user_prompt_edit(message, current).map_err(|e| SiteError::Provider(e.to_string()))?;
        let req = self.request(
            Instruction { system: prompt::system_prompt_edit(), user, developer: None },
            false,
        );
        let raw = self.call(&req).await?;
        Ok(coerce::coerce_edit(&raw))
    }

    pub async fn explain_code(&self, filename: &str, source: &str) -> SiteResult<String> {
        let req = self.request(
            Instruction {
                system: prompt::system_prompt_explain(),
                user: prompt::user_prompt_explain(filename, source),
                developer: None,
            },
            false,
        );
        Ok(self.call(&req).await?.trim().to_string())
    }

    pub fn fallback_site(&self, user_prompt: &str) -> FileSet {
        coerce::default_files(user_prompt)
    }
}
