use autosnap_core::Snapshot;
use tracing::info;

use crate::error::GatewayError;

/// One page of a snapshot listing.
#[derive(Debug, Clone, Default)]
pub struct SnapshotPage {
    pub snapshots: Vec<Snapshot>,
    pub next_page_token: Option<String>,
}

/// The three provider operations the orchestrator relies on.
///
/// Create and delete only report whether the provider accepted the request; completion is
/// observed by a later run's listing.
#[async_trait::async_trait]
pub trait SnapshotGateway: Send + Sync {
    /// Fetch a single page of the account-wide listing.
    async fn list_page(&self, page_token: Option<String>) -> Result<SnapshotPage, GatewayError>;

    /// Ask the provider to snapshot `instance_name` under `snapshot_name`.
    async fn create_snapshot(
        &self,
        instance_name: &str,
        snapshot_name: &str,
    ) -> Result<(), GatewayError>;

    /// Ask the provider to delete `snapshot_name`.
    async fn delete_snapshot(&self, snapshot_name: &str) -> Result<(), GatewayError>;

    /// Complete account-wide listing. Pages are requested one after another until the
    /// provider stops returning a continuation token.
    async fn list_snapshots(&self) -> Result<Vec<Snapshot>, GatewayError> {
        let mut page = 1;
        info!(page, "loading snapshots");
        let mut result = self.list_page(None).await?;
        let mut snapshots = std::mem::take(&mut result.snapshots);

        while let Some(token) = result.next_page_token.take() {
            page += 1;
            info!(page, "loading snapshots");
            result = self
                .list_page(Some(token))
                .await
                .map_err(|source| GatewayError::Pagination {
                    page,
                    source: Box::new(source),
                })?;
            snapshots.append(&mut result.snapshots);
        }

        info!(pages = page, total = snapshots.len(), "snapshot listing complete");
        Ok(snapshots)
    }
}
