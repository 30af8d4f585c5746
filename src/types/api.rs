//! Resource types for the backend REST contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// An organization the authenticated user belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

/// A GitHub App installation linked to an organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Installation {
    pub installation_id: i64,
    pub account_login: String,
}

/// A repository visible under an installation (not yet connected).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GithubRepo {
    pub id: i64,
    pub full_name: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// A repository connected to the backend, with its most recent ingestion job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectedRepo {
    pub id: i64,
    pub github_repo_id: i64,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_job: Option<IngestionJob>,
}

impl ConnectedRepo {
    /// Whether the latest job is still pending or processing.
    pub fn has_transient_job(&self) -> bool {
        self.latest_job
            .as_ref()
            .is_some_and(|j| j.status.is_transient())
    }
}

/// The most recent ingestion job for a connected repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestionJob {
    /// Job id; older backends omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub status: JobStatus,
    pub job_type: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of an ingestion job.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether the job is still in flight (worth polling).
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

/// One stage of a running ingestion job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestionTask {
    pub id: i64,
    pub stage: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// Lifecycle of an ingestion task.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Metadata for a generated document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMeta {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A generated wiki page for a repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WikiPage {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

/// A short-lived URL for fetching rendered content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresignedUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

// Request bodies

/// Connect a repository and queue its first scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRepoRequest {
    pub installation_id: i64,
    pub github_repo_id: i64,
    pub full_name: String,
}

/// Link a fresh GitHub App installation to an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkInstallationRequest {
    pub installation_id: i64,
    pub organization_id: String,
}

// Response envelopes (the backend wraps lists in named fields)

#[derive(Debug, Deserialize)]
pub(crate) struct OrganizationsResponse {
    #[serde(default)]
    pub organizations: Vec<Organization>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstallationsResponse {
    #[serde(default)]
    pub installations: Vec<Installation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubReposResponse {
    #[serde(default)]
    pub repositories: Vec<GithubRepo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectedReposResponse {
    #[serde(default)]
    pub repositories: Vec<ConnectedRepo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectRepoResponse {
    pub repo_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TasksResponse {
    #[serde(default)]
    pub tasks: Vec<IngestionTask>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentsResponse {
    #[serde(default)]
    pub documents: Vec<DocumentMeta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WikiPagesResponse {
    #[serde(default)]
    pub pages: Vec<WikiPage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_round_trips_snake_case() {
        let json = r#""processing""#;
        let status: JobStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status, JobStatus::Processing);
        assert_eq!(status.to_string(), "processing");
        assert!(status.is_transient());
        assert!(!JobStatus::Cancelled.is_transient());
    }

    #[test]
    fn connected_repo_parses_without_latest_job() {
        let json = r#"{"id": 7, "github_repo_id": 99, "full_name": "acme/site"}"#;
        let repo: ConnectedRepo = serde_json::from_str(json).unwrap();
        assert!(repo.latest_job.is_none());
        assert!(!repo.has_transient_job());
    }

    #[test]
    fn connected_repo_parses_job_without_id() {
        let json = r#"{
            "id": 7,
            "github_repo_id": 99,
            "full_name": "acme/site",
            "latest_job": {
                "status": "pending",
                "job_type": "full_scan",
                "created_at": "2024-06-01T12:00:00Z"
            }
        }"#;
        let repo: ConnectedRepo = serde_json::from_str(json).unwrap();
        let job = repo.latest_job.as_ref().unwrap();
        assert!(job.id.is_none());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(repo.has_transient_job());
    }

    #[test]
    fn github_repo_defaults_branch_to_main() {
        let json = r#"{"id": 1, "full_name": "acme/site"}"#;
        let repo: GithubRepo = serde_json::from_str(json).unwrap();
        assert_eq!(repo.default_branch, "main");
    }
}
