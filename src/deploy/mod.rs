//! Idempotent create-or-update deployment of a [`FileSet`] to a static host.
//!
//! Order of operations: credential check, name sanitizing, identity lookup,
//! create-or-adopt the repository, upload every file, enable Pages. Only the
//! last step is best-effort: its failure is logged and reported through
//! [`DeployResult::pages_enabled`], never returned as an error.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::time::Duration;

use crate::config::Config;
use crate::errors::{HostingError, SiteError, SiteResult};
use crate::wire::{Credential, DeployResult, DeployTarget, FileSet, RepoInfo, UploadFailure};

pub mod github;

/// Outcome of a create-repository call that the service answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCreation {
    Created(RepoInfo),
    /// Name conflict or other validation failure; carries the service message.
    Rejected { message: String },
}

#[derive(Debug, Clone)]
pub struct PutFile<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub path: &'a str,
    pub content: &'a str,
    pub message: &'a str,
    /// Version token of the existing file; required to update instead of create.
    pub sha: Option<&'a str>,
}

/// The REST surface the deployer needs from a hosting service.
#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn current_user(&self, auth: &Credential) -> Result<String, HostingError>;
    async fn create_repo(&self, auth: &Credential, name: &str, private: bool) -> Result<RepoCreation, HostingError>;
    async fn get_repo(&self, auth: &Credential, owner: &str, name: &str) -> Result<Option<RepoInfo>, HostingError>;
    async fn file_sha(&self, auth: &Credential, owner: &str, repo: &str, path: &str) -> Result<Option<String>, HostingError>;
    async fn put_file(&self, auth: &Credential, file: &PutFile<'_>) -> Result<(), HostingError>;
    async fn enable_pages(&self, auth: &Credential, owner: &str, repo: &str, branch: &str, path: &str) -> Result<(), HostingError>;
}

#[derive(Debug, Clone)]
pub struct DeploySettings {
    /// Used when the service does not report a default branch.
    pub pages_branch: String,
    pub upload_concurrency: usize,
    pub recheck_attempts: u32,
    pub recheck_delay: Duration,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            pages_branch: "main".into(),
            upload_concurrency: 1,
            recheck_attempts: 2,
            recheck_delay: Duration::from_millis(500),
        }
    }
}

impl From<&Config> for DeploySettings {
    fn from(cfg: &Config) -> Self {
        Self {
            pages_branch: cfg.pages_branch.clone(),
            upload_concurrency: cfg.upload_concurrency.max(1),
            recheck_attempts: cfg.recheck_attempts.max(1),
            recheck_delay: Duration::from_millis(cfg.recheck_delay_ms),
        }
    }
}

/// Trim, keep the last path segment of a pasted URL, drop `.git`, one hyphen per space.
pub fn sanitize_repo_name(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed).trim();
    let segment = segment.strip_suffix(".git").unwrap_or(segment);
    segment.replace(' ', "-")
}

/// Public URL GitHub Pages serves the repository at.
pub fn pages_url(owner: &str, repo: &str) -> String {
    let host = format!("{}.github.io", owner.to_lowercase());
    if repo.eq_ignore_ascii_case(&host) {
        format!("https://{host}/")
    } else {
        format!("https://{host}/{repo}/")
    }
}

pub struct SiteDeployer<H> {
    api: H,
    settings: DeploySettings,
}

impl<H: HostingApi> SiteDeployer<H> {
    pub fn new(api: H, settings: DeploySettings) -> Self {
        Self { api, settings }
    }

    /// Create or update `repo_name_raw` with `files` and turn on Pages.
    ///
    /// Fails with `Auth` (missing/rejected credential), `RepoCreate`,
    /// `RepoLookup` (conflict could not be rechecked) or `Upload` (no file
    /// landed). Partial upload failure is a success with `failures` filled in.
    pub async fn deploy(
        &self,
        repo_name_raw: &str,
        files: &FileSet,
        make_public: bool,
        credential: Option<&Credential>,
    ) -> SiteResult<DeployResult> {
        let auth = credential.ok_or_else(|| SiteError::Auth("hosting token missing".into()))?;

        let requested = sanitize_repo_name(repo_name_raw);
        if requested.is_empty() {
            return Err(SiteError::RepoCreate(format!("{repo_name_raw:?} is not a usable repository name")));
        }

        let owner = self
            .api
            .current_user(auth)
            .await
            .map_err(|e| SiteError::Auth(format!("could not resolve the token's user: {e}")))?;
        tracing::info!(%owner, repo = %requested, "deploying");

        let (repo, adopted_existing) = self.create_or_adopt(auth, &owner, &requested, !make_public).await?;
        let target = DeployTarget { owner, repo: repo.name.clone(), make_public };
        tracing::debug!(repo = %target.repo, public = target.make_public, adopted_existing, "repository ready");

        let (uploaded, failures) = self.upload_all(auth, &target, files).await;
        if uploaded == 0 {
            let detail = failures
                .iter()
                .map(|f| format!("{}: {}", f.path, f.reason))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SiteError::Upload(if detail.is_empty() { "file set is empty".into() } else { detail }));
        }

        let branch = repo.default_branch.as_deref().unwrap_or(&self.settings.pages_branch);
        let pages_enabled = self.enable_pages(auth, &target, branch).await;

        Ok(DeployResult {
            url: pages_url(&target.owner, &target.repo),
            uploaded,
            failures,
            full_name: format!("{}/{}", target.owner, target.repo),
            adopted_existing,
            pages_enabled,
        })
    }

    async fn create_or_adopt(
        &self,
        auth: &Credential,
        owner: &str,
        name: &str,
        private: bool,
    ) -> SiteResult<(RepoInfo, bool)> {
        match self.api.create_repo(auth, name, private).await {
            Ok(RepoCreation::Created(info)) => {
                if info.name != name {
                    tracing::info!(requested = name, confirmed = %info.name, "service adjusted repository name");
                }
                Ok((info, false))
            }
            Ok(RepoCreation::Rejected { message }) => match self.recheck(auth, owner, name).await? {
                Some(info) => {
                    tracing::info!(repo = %info.name, "repository exists, updating it");
                    Ok((info, true))
                }
                None => Err(SiteError::RepoCreate(message)),
            },
            Err(e) => Err(SiteError::RepoCreate(e.to_string())),
        }
    }

    /// Existence check after a conflict. Transport and 5xx failures are retried;
    /// if the service still cannot answer this is `RepoLookup`, not `RepoCreate`.
    async fn recheck(&self, auth: &Credential, owner: &str, name: &str) -> SiteResult<Option<RepoInfo>> {
        let attempts = self.settings.recheck_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.api.get_repo(auth, owner, name).await {
                Ok(found) => return Ok(found),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(attempt, error = %e, "repository recheck failed, retrying");
                    tokio::time::sleep(self.settings.recheck_delay).await;
                }
                Err(e) => return Err(SiteError::RepoLookup(e.to_string())),
            }
        }
    }

    async fn upload_all(&self, auth: &Credential, target: &DeployTarget, files: &FileSet) -> (usize, Vec<UploadFailure>) {
        let results: Vec<Result<(), UploadFailure>> = stream::iter(files.iter())
            .map(|(path, content)| self.upload_one(auth, target, path, content))
            .buffer_unordered(self.settings.upload_concurrency.max(1))
            .collect()
            .await;

        let mut uploaded = 0;
        let mut failures = Vec::new();
        for r in results {
            match r {
                Ok(()) => uploaded += 1,
                Err(f) => failures.push(f),
            }
        }
        failures.sort_by(|a, b| a.path.cmp(&b.path));
        (uploaded, failures)
    }

    /// Probe for the current version token immediately before writing.
    async fn upload_one(&self, auth: &Credential, target: &DeployTarget, path: &str, content: &str) -> Result<(), UploadFailure> {
        let fail = |reason: String| {
            tracing::warn!(file = path, %reason, "upload failed");
            UploadFailure { path: path.to_string(), reason }
        };

        let sha = self
            .api
            .file_sha(auth, &target.owner, &target.repo, path)
            .await
            .map_err(|e| fail(format!("probe failed: {e}")))?;

        let message = match sha {
            Some(_) => format!("Update {path}"),
            None => format!("Add {path}"),
        };
        let put = PutFile {
            owner: &target.owner,
            repo: &target.repo,
            path,
            content,
            message: &message,
            sha: sha.as_deref(),
        };
        self.api.put_file(auth, &put).await.map_err(|e| fail(e.to_string()))?;
        tracing::debug!(file = path, updated = sha.is_some(), "uploaded");
        Ok(())
    }

    async fn enable_pages(&self, auth: &Credential, target: &DeployTarget, branch: &str) -> bool {
        match self.api.enable_pages(auth, &target.owner, &target.repo, branch, "/").await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "could not enable Pages; files are uploaded");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet, VecDeque};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        User,
        CreateRepo { name: String, private: bool },
        GetRepo { owner: String, name: String },
        FileSha { path: String },
        PutFile { path: String, sha: Option<String>, message: String },
        EnablePages { repo: String, branch: String },
    }

    struct FakeHosting {
        calls: Mutex<Vec<Call>>,
        user: Result<String, HostingError>,
        create: Result<RepoCreation, HostingError>,
        lookups: Mutex<VecDeque<Result<Option<RepoInfo>, HostingError>>>,
        existing: HashMap<String, String>,
        failing: HashSet<String>,
        pages: Result<(), HostingError>,
    }

    impl FakeHosting {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                user: Ok("Octo".into()),
                create: Ok(RepoCreation::Created(RepoInfo { name: "My-Site".into(), default_branch: Some("main".into()) })),
                lookups: Mutex::new(VecDeque::new()),
                existing: HashMap::new(),
                failing: HashSet::new(),
                pages: Ok(()),
            }
        }

        fn record(&self, call: Call) {
            self.calls.lock().push(call);
        }
    }

    #[async_trait]
    impl HostingApi for FakeHosting {
        async fn current_user(&self, _auth: &Credential) -> Result<String, HostingError> {
            self.record(Call::User);
            self.user.clone()
        }

        async fn create_repo(&self, _auth: &Credential, name: &str, private: bool) -> Result<RepoCreation, HostingError> {
            self.record(Call::CreateRepo { name: name.into(), private });
            self.create.clone()
        }

        async fn get_repo(&self, _auth: &Credential, owner: &str, name: &str) -> Result<Option<RepoInfo>, HostingError> {
            self.record(Call::GetRepo { owner: owner.into(), name: name.into() });
            self.lookups.lock().pop_front().unwrap_or(Ok(None))
        }

        async fn file_sha(&self, _auth: &Credential, _owner: &str, _repo: &str, path: &str) -> Result<Option<String>, HostingError> {
            self.record(Call::FileSha { path: path.into() });
            Ok(self.existing.get(path).cloned())
        }

        async fn put_file(&self, _auth: &Credential, file: &PutFile<'_>) -> Result<(), HostingError> {
            self.record(Call::PutFile {
                path: file.path.into(),
                sha: file.sha.map(str::to_string),
                message: file.message.into(),
            });
            if self.failing.contains(file.path) {
                Err(HostingError::Status { status: 422, message: "invalid content".into() })
            } else {
                Ok(())
            }
        }

        async fn enable_pages(&self, _auth: &Credential, _owner: &str, repo: &str, branch: &str, _path: &str) -> Result<(), HostingError> {
            self.record(Call::EnablePages { repo: repo.into(), branch: branch.into() });
            self.pages.clone()
        }
    }

    fn site() -> FileSet {
        crate::coerce::default_files("test")
    }

    fn token() -> Credential {
        Credential::new("ghp_test").unwrap()
    }

    fn deployer(api: FakeHosting) -> SiteDeployer<FakeHosting> {
        SiteDeployer::new(api, DeploySettings { recheck_delay: Duration::ZERO, ..DeploySettings::default() })
    }

    fn count(d: &SiteDeployer<FakeHosting>, pred: impl Fn(&Call) -> bool) -> usize {
        d.api.calls.lock().iter().filter(|c| pred(c)).count()
    }

    #[test]
    fn sanitizes_pasted_urls_and_spaces() {
        assert_eq!(sanitize_repo_name("https://host/group/My Site "), "My-Site");
        assert_eq!(sanitize_repo_name("  cookbook shop  "), "cookbook-shop");
        assert_eq!(sanitize_repo_name("https://github.com/octo/site.git/"), "site");
        assert_eq!(sanitize_repo_name("plain"), "plain");
        assert_eq!(sanitize_repo_name("   "), "");
        assert_eq!(sanitize_repo_name("My  Site"), "My--Site");
        assert_eq!(sanitize_repo_name("group/ portfolio 2024"), "portfolio-2024");
    }

    #[test]
    fn settings_follow_config() {
        let cfg = Config { upload_concurrency: 0, recheck_attempts: 5, recheck_delay_ms: 20, ..Config::default() };
        let settings = DeploySettings::from(&cfg);
        assert_eq!(settings.upload_concurrency, 1);
        assert_eq!(settings.recheck_attempts, 5);
        assert_eq!(settings.recheck_delay, Duration::from_millis(20));
        assert_eq!(settings.pages_branch, "main");
    }

    #[test]
    fn pages_url_handles_user_site_repo() {
        assert_eq!(pages_url("Octo", "My-Site"), "https://octo.github.io/My-Site/");
        assert_eq!(pages_url("Octo", "octo.github.io"), "https://octo.github.io/");
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_call() {
        let d = deployer(FakeHosting::new());
        let err = d.deploy("site", &site(), true, Credential::new("").as_ref()).await.unwrap_err();
        assert!(matches!(err, SiteError::Auth(_)));
        assert!(d.api.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn blank_repo_name_fails_before_any_call() {
        let d = deployer(FakeHosting::new());
        let err = d.deploy(" / ", &site(), true, Some(&token())).await.unwrap_err();
        assert!(matches!(err, SiteError::RepoCreate(_)));
        assert!(d.api.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn rejected_identity_is_auth_error() {
        let mut api = FakeHosting::new();
        api.user = Err(HostingError::Status { status: 401, message: "Bad credentials".into() });
        let d = deployer(api);
        let err = d.deploy("site", &site(), true, Some(&token())).await.unwrap_err();
        assert!(matches!(err, SiteError::Auth(_)));
        assert_eq!(*d.api.calls.lock(), vec![Call::User]);
    }

    #[tokio::test]
    async fn fresh_deploy_uploads_everything_and_enables_pages() {
        let d = deployer(FakeHosting::new());
        let result = d.deploy("https://host/group/My Site ", &site(), true, Some(&token())).await.unwrap();

        assert_eq!(result.url, "https://octo.github.io/My-Site/");
        assert_eq!(result.uploaded, 3);
        assert!(result.failures.is_empty());
        assert!(!result.adopted_existing);
        assert!(result.pages_enabled);
        assert_eq!(result.full_name, "Octo/My-Site");

        let calls = d.api.calls.lock().clone();
        assert_eq!(calls[0], Call::User);
        assert_eq!(calls[1], Call::CreateRepo { name: "My-Site".into(), private: false });
        assert_eq!(calls.last(), Some(&Call::EnablePages { repo: "My-Site".into(), branch: "main".into() }));
        assert!(calls.contains(&Call::PutFile { path: "index.html".into(), sha: None, message: "Add index.html".into() }));
    }

    #[tokio::test]
    async fn adopts_confirmed_name_from_service() {
        let mut api = FakeHosting::new();
        api.create = Ok(RepoCreation::Created(RepoInfo { name: "my-site".into(), default_branch: None }));
        let d = deployer(api);
        let result = d.deploy("my site!", &site(), false, Some(&token())).await.unwrap();
        assert_eq!(result.url, "https://octo.github.io/my-site/");
        assert_eq!(count(&d, |c| matches!(c, Call::CreateRepo { private: true, .. })), 1);
        // falls back to the configured branch
        assert_eq!(count(&d, |c| matches!(c, Call::EnablePages { branch, .. } if branch == "main")), 1);
    }

    #[tokio::test]
    async fn conflict_with_existing_repo_updates_it() {
        let mut api = FakeHosting::new();
        api.create = Ok(RepoCreation::Rejected { message: "name already exists on this account".into() });
        api.lookups = Mutex::new(VecDeque::from([Ok(Some(RepoInfo {
            name: "My-Site".into(),
            default_branch: Some("gh-pages".into()),
        }))]));
        api.existing.insert("index.html".into(), "abc123".into());
        let d = deployer(api);

        let result = d.deploy("My Site", &site(), true, Some(&token())).await.unwrap();
        assert!(result.adopted_existing);
        assert_eq!(result.uploaded, 3);

        let calls = d.api.calls.lock().clone();
        assert!(calls.contains(&Call::GetRepo { owner: "Octo".into(), name: "My-Site".into() }));
        assert!(calls.contains(&Call::PutFile {
            path: "index.html".into(),
            sha: Some("abc123".into()),
            message: "Update index.html".into(),
        }));
        assert!(calls.contains(&Call::EnablePages { repo: "My-Site".into(), branch: "gh-pages".into() }));
    }

    #[tokio::test]
    async fn conflict_without_repo_is_create_error_with_service_message() {
        let mut api = FakeHosting::new();
        api.create = Ok(RepoCreation::Rejected { message: "name is invalid".into() });
        let d = deployer(api);
        match d.deploy("bad", &site(), true, Some(&token())).await.unwrap_err() {
            SiteError::RepoCreate(msg) => assert_eq!(msg, "name is invalid"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(count(&d, |c| matches!(c, Call::FileSha { .. } | Call::PutFile { .. })), 0);
    }

    #[tokio::test]
    async fn other_create_failure_is_create_error() {
        let mut api = FakeHosting::new();
        api.create = Err(HostingError::Status { status: 403, message: "quota".into() });
        let d = deployer(api);
        let err = d.deploy("site", &site(), true, Some(&token())).await.unwrap_err();
        assert!(matches!(err, SiteError::RepoCreate(_)));
        assert_eq!(count(&d, |c| matches!(c, Call::GetRepo { .. })), 0);
    }

    #[tokio::test]
    async fn flaky_recheck_is_retried() {
        let mut api = FakeHosting::new();
        api.create = Ok(RepoCreation::Rejected { message: "exists".into() });
        api.lookups = Mutex::new(VecDeque::from([
            Err(HostingError::Transport("connection reset".into())),
            Ok(Some(RepoInfo { name: "site".into(), default_branch: None })),
        ]));
        let d = deployer(api);
        let result = d.deploy("site", &site(), true, Some(&token())).await.unwrap();
        assert!(result.adopted_existing);
        assert_eq!(count(&d, |c| matches!(c, Call::GetRepo { .. })), 2);
    }

    #[tokio::test]
    async fn unanswerable_recheck_is_lookup_error() {
        let mut api = FakeHosting::new();
        api.create = Ok(RepoCreation::Rejected { message: "exists".into() });
        api.lookups = Mutex::new(VecDeque::from([
            Err(HostingError::Status { status: 502, message: "bad gateway".into() }),
            Err(HostingError::Status { status: 502, message: "bad gateway".into() }),
        ]));
        let d = deployer(api);
        let err = d.deploy("site", &site(), true, Some(&token())).await.unwrap_err();
        assert!(matches!(err, SiteError::RepoLookup(_)));
        assert_eq!(count(&d, |c| matches!(c, Call::GetRepo { .. })), 2);
    }

    #[tokio::test]
    async fn all_uploads_failing_is_upload_error_and_skips_pages() {
        let mut api = FakeHosting::new();
        api.failing = ["index.html", "styles.css", "script.js"].into_iter().map(String::from).collect();
        let d = deployer(api);
        let err = d.deploy("site", &site(), true, Some(&token())).await.unwrap_err();
        assert!(matches!(err, SiteError::Upload(_)));
        assert_eq!(count(&d, |c| matches!(c, Call::PutFile { .. })), 3);
        assert_eq!(count(&d, |c| matches!(c, Call::EnablePages { .. })), 0);
    }

    #[tokio::test]
    async fn partial_upload_failure_still_succeeds() {
        let mut api = FakeHosting::new();
        api.failing.insert("script.js".into());
        let d = deployer(api);
        let result = d.deploy("site", &site(), true, Some(&token())).await.unwrap();
        assert_eq!(result.uploaded, 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].path, "script.js");
        assert!(!result.url.is_empty());
        assert_eq!(count(&d, |c| matches!(c, Call::EnablePages { .. })), 1);
    }

    #[tokio::test]
    async fn pages_failure_is_swallowed() {
        let mut api = FakeHosting::new();
        api.pages = Err(HostingError::Status { status: 422, message: "plan does not support Pages".into() });
        let d = deployer(api);
        let result = d.deploy("site", &site(), false, Some(&token())).await.unwrap();
        assert!(!result.pages_enabled);
        assert_eq!(result.uploaded, 3);
    }

    #[tokio::test]
    async fn concurrent_uploads_cover_every_file() {
        let api = FakeHosting::new();
        let d = SiteDeployer::new(api, DeploySettings { upload_concurrency: 4, ..DeploySettings::default() });
        let mut files = site();
        files.insert("about.html", "<p>about</p>");
        let result = d.deploy("site", &files, true, Some(&token())).await.unwrap();
        assert_eq!(result.uploaded, 4);
        assert_eq!(count(&d, |c| matches!(c, Call::FileSha { .. })), 4);
    }
}
