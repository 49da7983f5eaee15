use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use autosnap_core::Snapshot;
use autosnap_gateway::{InMemoryGateway, LightsailConfig, LightsailGateway, SnapshotGateway};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::Settings;

/// Where a run sends its provider calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Lightsail,
    /// Snapshots loaded from a JSON file into memory. Creates and deletes stay in memory, so a
    /// run can be tried against a recorded listing without touching an account.
    Local(PathBuf),
}

pub async fn connect(
    provider: &Provider,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<Arc<dyn SnapshotGateway>> {
    match provider {
        Provider::Lightsail => {
            let gateway = LightsailGateway::new(LightsailConfig {
                region: settings.region.clone(),
                endpoint: settings.endpoint.clone(),
                max_attempts: settings.max_attempts,
            })
            .await;
            Ok(Arc::new(gateway))
        }
        Provider::Local(path) => {
            let snapshots = load_local_snapshots(path)?;
            info!(?path, snapshots = snapshots.len(), "using local snapshot listing");
            Ok(Arc::new(InMemoryGateway::new(snapshots).with_clock(now)))
        }
    }
}

/// Reads a JSON array of `{"name", "instance_name", "created_at"}` records.
pub fn load_local_snapshots(path: &Path) -> Result<Vec<Snapshot>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot listing {path:?}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing snapshot listing {path:?}"))
}
