//! Typed REST client over the backend HTTP contract.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::chat::{ChatRequest, ChatTransport, EventStream};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::http::{bearer_headers, shared_client, status_to_error};
use crate::types::*;
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_timeout;

/// Per-request deadline for plain REST calls. The chat stream manages its
/// own deadline in `ChatSession` and is exempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the documentation backend.
///
/// Every call forwards the configured bearer token and maps non-2xx
/// responses through `status_to_error`, so callers can branch on
/// `is_unauthorized()` / `is_conflict()`. Idempotent reads run under the
/// retry policy; mutations are issued exactly once.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl BackendClient {
    /// Build a client from explicit values.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            token: token.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Build a client from a resolved config.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(config.require_base_url()?, config.require_token()?))
    }

    /// Override the retry policy for idempotent reads.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Organizations & installations

    pub async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let resp: OrganizationsResponse = self.get_json("/orgs").await?;
        Ok(resp.organizations)
    }

    pub async fn list_installations(&self, org_id: &str) -> Result<Vec<Installation>> {
        let resp: InstallationsResponse =
            self.get_json(&format!("/orgs/{org_id}/installations")).await?;
        Ok(resp.installations)
    }

    pub async fn list_installation_repos(&self, installation_id: i64) -> Result<Vec<GithubRepo>> {
        let resp: GithubReposResponse = self
            .get_json(&format!("/installations/{installation_id}/repos"))
            .await?;
        Ok(resp.repositories)
    }

    /// Link a completed GitHub App installation to an organization.
    pub async fn link_installation(&self, request: &LinkInstallationRequest) -> Result<()> {
        self.send_json::<_, serde_json::Value>(Method::POST, "/installations/link", Some(request))
            .await?;
        Ok(())
    }

    // Repositories & ingestion

    pub async fn list_repositories(&self, org_id: &str) -> Result<Vec<ConnectedRepo>> {
        let resp: ConnectedReposResponse =
            self.get_json(&format!("/orgs/{org_id}/repositories")).await?;
        Ok(resp.repositories)
    }

    /// Connect a repository and queue its first full scan.
    ///
    /// A 409 means a scan is already queued; callers usually treat that as
    /// success and refresh (`err.is_conflict()`).
    pub async fn connect_repo(&self, request: &ConnectRepoRequest) -> Result<i64> {
        let resp: ConnectRepoResponse = self
            .send_json(Method::POST, "/installations/connect-repo", Some(request))
            .await?;
        Ok(resp.repo_id)
    }

    /// Queue a new ingestion job for an already-connected repository.
    pub async fn queue_scan(&self, org_id: &str, repo_id: i64, job_type: &str) -> Result<()> {
        let body = serde_json::json!({ "job_type": job_type });
        self.send_json::<_, serde_json::Value>(
            Method::POST,
            &format!("/orgs/{org_id}/repositories/{repo_id}/queue"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    pub async fn list_ingestion_tasks(&self, repo_id: i64) -> Result<Vec<IngestionTask>> {
        let resp: TasksResponse = self
            .get_json(&format!("/repos/{repo_id}/ingestion/tasks"))
            .await?;
        Ok(resp.tasks)
    }

    pub async fn cancel_ingestion_job(&self, job_id: i64) -> Result<()> {
        self.send_json::<serde_json::Value, serde_json::Value>(
            Method::POST,
            &format!("/ingestion/jobs/{job_id}/cancel"),
            None,
        )
        .await?;
        Ok(())
    }

    /// Disconnect a repository, deleting its documentation and chunks.
    pub async fn disconnect_repo(&self, repo_id: i64) -> Result<()> {
        self.send_json::<serde_json::Value, serde_json::Value>(
            Method::DELETE,
            &format!("/repos/{repo_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    // Documents & wiki

    pub async fn list_documents(&self, repo_id: i64) -> Result<Vec<DocumentMeta>> {
        let resp: DocumentsResponse =
            self.get_json(&format!("/repos/{repo_id}/documents")).await?;
        Ok(resp.documents)
    }

    pub async fn presign_document(&self, doc_id: i64) -> Result<PresignedUrl> {
        self.get_json(&format!("/documents/{doc_id}/presign")).await
    }

    pub async fn list_wiki_pages(&self, repo_id: i64) -> Result<Vec<WikiPage>> {
        let resp: WikiPagesResponse =
            self.get_json(&format!("/repos/{repo_id}/wiki/pages")).await?;
        Ok(resp.pages)
    }

    pub async fn presign_wiki_page(&self, repo_id: i64, slug: &str) -> Result<PresignedUrl> {
        self.get_json(&format!("/repos/{repo_id}/wiki/pages/{slug}/presign"))
            .await
    }

    pub async fn list_org_documents(&self, org_id: &str) -> Result<Vec<DocumentMeta>> {
        let resp: DocumentsResponse =
            self.get_json(&format!("/orgs/{org_id}/documents")).await?;
        Ok(resp.documents)
    }

    pub async fn presign_org_document(&self, org_id: &str, file_name: &str) -> Result<PresignedUrl> {
        self.get_json(&format!("/orgs/{org_id}/documents/{file_name}/presign"))
            .await
    }

    // Account

    /// Delete the account and every resource owned by it.
    pub async fn delete_account(&self) -> Result<()> {
        self.send_json::<serde_json::Value, serde_json::Value>(
            Method::DELETE,
            "/account/delete",
            None,
        )
        .await?;
        Ok(())
    }

    // Chat

    /// Open the streaming chat endpoint.
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<EventStream> {
        let url = format!("{}/chat/stream", self.base_url);
        debug!(query_len = request.query.len(), "Opening chat stream");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.token))
            .json(request)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }

        Ok(EventStream::from_response(resp))
    }

    // Internals

    /// GET + decode, retried per policy.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.retry
            .execute(|| {
                with_timeout(REQUEST_TIMEOUT, async move {
                    let resp = self.request(Method::GET, path).send().await?;
                    Self::decode(resp).await
                })
            })
            .await
    }

    /// Issue a non-idempotent request once and decode the body.
    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        with_timeout(REQUEST_TIMEOUT, async move {
            let mut req = self.request(method, path);
            if let Some(body) = body {
                req = req.json(body);
            }
            let resp = req.send().await?;
            Self::decode(resp).await
        })
        .await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Backend request");
        shared_client()
            .request(method, &url)
            .headers(bearer_headers(&self.token))
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }
        let body = resp.text().await?;
        if body.is_empty() {
            // Mutation endpoints may reply 204 / empty body.
            return serde_json::from_str("null").map_err(ClientError::from);
        }
        serde_json::from_str(&body).map_err(ClientError::from)
    }
}

#[async_trait]
impl ChatTransport for BackendClient {
    async fn open_chat(&self, request: &ChatRequest) -> Result<EventStream> {
        self.chat_stream(request).await
    }
}
