use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{HostingApi, PutFile, RepoCreation};
use crate::errors::HostingError;
use crate::wire::{Credential, RepoInfo};

const API_VERSION: &str = "2022-11-28";

/// GitHub REST v3 client for the repository, contents and Pages endpoints.
pub struct GitHubApi {
    client: Client,
    base: Url,
}

#[derive(Deserialize)]
struct User {
    login: Option<String>,
}

#[derive(Deserialize)]
struct Repo {
    name: String,
    #[serde(default)]
    default_branch: Option<String>,
}

impl From<Repo> for RepoInfo {
    fn from(r: Repo) -> Self {
        RepoInfo { name: r.name, default_branch: r.default_branch }
    }
}

#[derive(Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// `message` plus any detail messages; raw body when it is not GitHub's error shape.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(e) => {
            let mut parts: Vec<String> = e.message.into_iter().collect();
            parts.extend(e.errors.into_iter().filter_map(|d| d.message));
            if parts.is_empty() { body.to_string() } else { parts.join(": ") }
        }
        Err(_) => body.to_string(),
    }
}

async fn status_error(resp: Response) -> HostingError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    HostingError::Status { status, message: error_message(&body) }
}

async fn decode<T: for<'de> Deserialize<'de>>(resp: Response) -> Result<T, HostingError> {
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| HostingError::Decode(e.to_string()))
}

impl GitHubApi {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, HostingError> {
        let base = Url::parse(api_base).map_err(|e| HostingError::Decode(format!("bad api base {api_base}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, HostingError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| HostingError::Decode(format!("{} cannot take a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> Result<Url, HostingError> {
        let mut segments = vec!["repos", owner, repo, "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.url(&segments)
    }

    fn request(&self, method: Method, url: Url, auth: &Credential) -> RequestBuilder {
        tracing::debug!(%method, %url, "github request");
        self.client
            .request(method, url)
            .bearer_auth(auth.secret())
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(USER_AGENT, concat!("vibe_sitegen/", env!("CARGO_PKG_VERSION")))
    }
}

#[async_trait]
impl HostingApi for GitHubApi {
    async fn current_user(&self, auth: &Credential) -> Result<String, HostingError> {
        let resp = self.request(Method::GET, self.url(&["user"])?, auth).send().await?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        let user: User = decode(resp).await?;
        user.login
            .filter(|l| !l.is_empty())
            .ok_or_else(|| HostingError::Decode("user response has no login".into()))
    }

    async fn create_repo(&self, auth: &Credential, name: &str, private: bool) -> Result<RepoCreation, HostingError> {
        let resp = self
            .request(Method::POST, self.url(&["user", "repos"])?, auth)
            .json(&json!({ "name": name, "private": private }))
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() => Ok(RepoCreation::Created(decode::<Repo>(resp).await?.into())),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let body = resp.text().await?;
                Ok(RepoCreation::Rejected { message: error_message(&body) })
            }
            _ => Err(status_error(resp).await),
        }
    }

    async fn get_repo(&self, auth: &Credential, owner: &str, name: &str) -> Result<Option<RepoInfo>, HostingError> {
        let resp = self.request(Method::GET, self.url(&["repos", owner, name])?, auth).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(Some(decode::<Repo>(resp).await?.into())),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(status_error(resp).await),
        }
    }

    async fn file_sha(&self, auth: &Credential, owner: &str, repo: &str, path: &str) -> Result<Option<String>, HostingError> {
        let resp = self.request(Method::GET, self.contents_url(owner, repo, path)?, auth).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(Some(decode::<ContentEntry>(resp).await?.sha)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(status_error(resp).await),
        }
    }

    async fn put_file(&self, auth: &Credential, file: &PutFile<'_>) -> Result<(), HostingError> {
        let mut body = json!({
            "message": file.message,
            "content": STANDARD.encode(file.content.as_bytes()),
        });
        if let Some(sha) = file.sha {
            body["sha"] = json!(sha);
        }
        let resp = self
            .request(Method::PUT, self.contents_url(file.owner, file.repo, file.path)?, auth)
            .json(&body)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(status_error(resp).await)
        }
    }

    async fn enable_pages(&self, auth: &Credential, owner: &str, repo: &str, branch: &str, path: &str) -> Result<(), HostingError> {
        let resp = self
            .request(Method::POST, self.url(&["repos", owner, repo, "pages"])?, auth)
            .json(&json!({ "source": { "branch": branch, "path": path } }))
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() => Ok(()),
            // already enabled
            StatusCode::CONFLICT => Ok(()),
            _ => Err(status_error(resp).await),
        }
    }
}
