//! Polling fallbacks for ingestion progress.
//!
//! Job status is not pushed by the backend; the dashboard polls the
//! repository list while any job is in flight and the per-repo task list
//! while an ingestion popover is open. Both loops are expressed here as
//! finite async streams of snapshots.

use std::time::Duration;

use futures::Stream;
use tracing::warn;

use crate::client::BackendClient;
use crate::types::{ConnectedRepo, IngestionTask};

/// Cadence for the repository status poll.
pub const REPO_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Cadence for the per-repo task poll.
pub const TASK_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Poll the connected-repository list while any latest job is transient.
///
/// Fetches immediately, then on the interval. Yields every successful
/// snapshot (including the final settled one) and completes once no repo
/// has a pending or processing job. Poll errors are logged and skipped.
pub fn poll_repositories(
    client: BackendClient,
    org_id: String,
    interval: Duration,
) -> impl Stream<Item = Vec<ConnectedRepo>> {
    async_stream::stream! {
        loop {
            match client.list_repositories(&org_id).await {
                Ok(repos) => {
                    let settled = !repos.iter().any(ConnectedRepo::has_transient_job);
                    yield repos;
                    if settled {
                        break;
                    }
                }
                Err(e) => {
                    warn!(org_id, error = %e, "Repository poll failed");
                }
            }
            tokio::time::sleep(interval).await;
        }
    }
}

/// Poll one repository's ingestion tasks until all are terminal.
///
/// An empty task list keeps polling (the job may not have started its
/// first stage yet).
pub fn poll_tasks(
    client: BackendClient,
    repo_id: i64,
    interval: Duration,
) -> impl Stream<Item = Vec<IngestionTask>> {
    async_stream::stream! {
        loop {
            match client.list_ingestion_tasks(repo_id).await {
                Ok(tasks) => {
                    let done =
                        !tasks.is_empty() && tasks.iter().all(|t| t.status.is_terminal());
                    yield tasks;
                    if done {
                        break;
                    }
                }
                Err(e) => {
                    warn!(repo_id, error = %e, "Task poll failed");
                }
            }
            tokio::time::sleep(interval).await;
        }
    }
}
