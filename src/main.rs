use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod cli;
mod coerce;
mod config;
mod deploy;
mod diff;
mod errors;
mod export;
mod generator;
mod history;
mod logging;
mod preview;
mod prompt;
mod provider;
mod site;
mod ux;
mod wire;

use cli::{Args, Command};
use config::Config;
use deploy::github::GitHubApi;
use deploy::{DeploySettings, SiteDeployer};
use errors::SiteError;
use generator::{GenerateOptions, Limits, WebsiteGenerator};
use wire::{Credential, EditOutcome, FileSet};

fn make_generator(cfg: &Config) -> Result<WebsiteGenerator> {
    let provider = provider::make_provider(cfg)?;
    Ok(WebsiteGenerator::new(provider, Limits::from(cfg)))
}

fn load_current(cfg: &Config) -> Result<FileSet> {
    let files = site::load_site(&cfg.site_path())?;
    if files.is_empty() {
        bail!("no site in {} yet; run `generate` first", cfg.site_path().display());
    }
    Ok(files)
}

/// Replace the site directory with `files` and snapshot it.
fn commit(cfg: &Config, files: &FileSet, message: &str) -> Result<()> {
    let dir = cfg.site_path();
    site::write_site(&dir, files)?;
    let removed = site::prune_site(&dir, files)?;
    if !removed.is_empty() {
        tracing::debug!(?removed, "pruned stale files");
    }
    let v = history::save_version(&cfg.history_path(), files, message)?;
    println!("Saved version {} ({})", v.short_id().yellow(), message);
    Ok(())
}

async fn run_generate(cfg: &Config, prompt: &str, opts: GenerateOptions) -> Result<()> {
    if prompt.trim().is_empty() {
        bail!("please enter a description for your website");
    }
    let site_gen = make_generator(cfg)?;
    let pb = ux::spinner("AI is building your website...");
    let result = site_gen.generate_website(prompt, &opts).await;
    pb.finish_and_clear();

    let (files, message) = match result {
        Ok(files) => (files, prompt.trim().to_string()),
        Err(SiteError::MalformedResponse { raw }) => {
            tracing::warn!(bytes = raw.len(), "model output had no JSON object");
            tracing::debug!(%raw, "unusable model output");
            println!("{}", "AI model returned unusable output. Using fallback template.".yellow());
            (site_gen.fallback_site(prompt), "Fallback generated site due to error".to_string())
        }
        Err(e) => return Err(e.into()),
    };

    commit(cfg, &files, &message)?;
    ux::show_files("GENERATED", &files);
    Ok(())
}

async fn run_edit(cfg: &Config, message: &str) -> Result<()> {
    let current = load_current(cfg)?;
    let site_gen = make_generator(cfg)?;
    let pb = ux::spinner("AI is thinking...");
    let outcome = site_gen.edit_files(message, &current).await;
    pb.finish_and_clear();

    match outcome? {
        EditOutcome::Updated { files, message: reply } => {
            let mut next = current.clone();
            let touched = next.merge(files);
            ux::print_changes(&diff::fileset_diff(&current, &next), None);
            commit(cfg, &next, &format!("Chat edit: {}", message.trim()))?;
            println!(
                "{} {}",
                "AI:".bold(),
                reply.unwrap_or_else(|| format!("I've updated {}.", touched.join(", ")))
            );
        }
        EditOutcome::Reply(text) => println!("{} {}", "AI:".bold(), text),
    }
    Ok(())
}

async fn run_explain(cfg: &Config, file: &str) -> Result<()> {
    let current = load_current(cfg)?;
    let Some(source) = current.get(file) else {
        bail!("{file} is not in the site (have: {})", current.names().collect::<Vec<_>>().join(", "));
    };
    let site_gen = make_generator(cfg)?;
    let pb = ux::spinner("AI is analyzing the code...");
    let explanation = site_gen.explain_code(file, source).await;
    pb.finish_and_clear();
    println!("{}\n\n{}", format!("Explanation of {file}:").bold(), explanation?);
    Ok(())
}

fn run_restore(cfg: &Config, id: &str) -> Result<()> {
    let v = history::load_version(&cfg.history_path(), id)?;
    commit(cfg, &v.files, &format!("Restored version {}", v.short_id()))
}

fn run_diff(cfg: &Config, file: Option<&str>) -> Result<()> {
    match history::latest_pair(&cfg.history_path())? {
        Some((previous, newest)) => {
            println!(
                "{} {} -> {}",
                "Diff".bold(),
                previous.short_id().yellow(),
                newest.short_id().yellow()
            );
            ux::print_changes(&diff::fileset_diff(&previous.files, &newest.files), file);
        }
        None => println!("Need at least 2 versions to show diffs."),
    }
    Ok(())
}

async fn run_deploy(cfg: &Config, repo: &str, private: bool, yes: bool, token: Option<String>) -> Result<()> {
    let files = load_current(cfg)?;
    let credential = token.and_then(Credential::new);

    ux::show_files("DEPLOY", &files);
    let target = deploy::sanitize_repo_name(repo);
    if !yes && !ux::confirm(&format!("Deploy to GitHub repository '{target}'?")) {
        println!("Aborted by user.");
        return Ok(());
    }

    let api = GitHubApi::new(&cfg.github_api_base, Duration::from_secs(cfg.timeout_secs))
        .context("building GitHub client")?;
    let deployer = SiteDeployer::new(api, DeploySettings::from(cfg));

    let pb = ux::spinner("Creating repository and pushing files...");
    let result = deployer.deploy(repo, &files, !private, credential.as_ref()).await;
    pb.finish_and_clear();

    match result {
        Ok(res) => {
            ux::print_deploy_dashboard(&res);
            Ok(())
        }
        Err(SiteError::Auth(msg)) => bail!("{msg}. Set GITHUB_TOKEN to a token with repo scope."),
        Err(e) => Err(e).context("deployment failed"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.debug);

    let root = PathBuf::from(&args.root);
    let mut cfg = Config::load(&root, args.config.as_deref().map(Path::new))?;
    cfg.apply_args(&args);
    tracing::debug!(?cfg, "effective config");

    match args.command {
        Command::Generate { prompt, backend, no_responsive } => {
            run_generate(&cfg, &prompt, GenerateOptions { backend, responsive: !no_responsive }).await
        }
        Command::Edit { message } => run_edit(&cfg, &message).await,
        Command::Preview { theme, out } => {
            let files = load_current(&cfg)?;
            let bytes = preview::write_preview(Path::new(&out), &files, theme)?;
            println!("Preview written to {} ({bytes} bytes)", out.bold());
            Ok(())
        }
        Command::Export { out } => {
            let files = load_current(&cfg)?;
            let bytes = export::write_zip(Path::new(&out), &files)?;
            println!("Exported {} files to {} ({bytes} bytes)", files.len(), out.bold());
            Ok(())
        }
        Command::Explain { file } => run_explain(&cfg, &file).await,
        Command::History => {
            ux::print_history(&history::list_versions(&cfg.history_path())?);
            Ok(())
        }
        Command::Restore { id } => run_restore(&cfg, &id),
        Command::Diff { file } => run_diff(&cfg, file.as_deref()),
        Command::Deploy { repo, private, yes, token } => run_deploy(&cfg, &repo, private, yes, token).await,
    }
}
