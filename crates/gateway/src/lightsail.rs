use autosnap_core::Snapshot;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_lightsail::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_lightsail::types::InstanceSnapshot;
use aws_sdk_lightsail::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::gateway::{SnapshotGateway, SnapshotPage};

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
pub struct LightsailConfig {
    pub region: String,
    /// Overrides the regional Lightsail endpoint.
    pub endpoint: Option<String>,
    /// Attempts per provider call, including the first. 1 disables retries.
    pub max_attempts: u32,
}

/// Amazon Lightsail instance snapshots through the AWS SDK.
pub struct LightsailGateway {
    client: Client,
}

impl LightsailGateway {
    /// Credentials come from the SDK's default provider chain (environment, profile, web
    /// identity, container and instance metadata).
    pub async fn new(config: LightsailConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts.max(1)));
        if let Some(endpoint) = config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        Self::from_client(Client::new(&sdk_config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SnapshotGateway for LightsailGateway {
    async fn list_page(&self, page_token: Option<String>) -> Result<SnapshotPage, GatewayError> {
        let output = self
            .client
            .get_instance_snapshots()
            .set_page_token(page_token)
            .send()
            .await
            .map_err(|e| provider_error("GetInstanceSnapshots", e))?;

        let records = output.instance_snapshots.unwrap_or_default();
        let listed = records.len();
        let snapshots: Vec<Snapshot> = records.into_iter().filter_map(into_snapshot).collect();
        if snapshots.len() < listed {
            warn!(
                skipped = listed - snapshots.len(),
                "ignoring snapshots without a name or creation time"
            );
        }

        Ok(SnapshotPage {
            snapshots,
            next_page_token: output.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn create_snapshot(
        &self,
        instance_name: &str,
        snapshot_name: &str,
    ) -> Result<(), GatewayError> {
        let output = self
            .client
            .create_instance_snapshot()
            .instance_name(instance_name)
            .instance_snapshot_name(snapshot_name)
            .send()
            .await
            .map_err(|e| provider_error("CreateInstanceSnapshot", e))?;
        debug!(
            snapshot = snapshot_name,
            operations = output.operations.map_or(0, |ops| ops.len()),
            "create accepted"
        );
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_name: &str) -> Result<(), GatewayError> {
        let output = self
            .client
            .delete_instance_snapshot()
            .instance_snapshot_name(snapshot_name)
            .send()
            .await
            .map_err(|e| provider_error("DeleteInstanceSnapshot", e))?;
        debug!(
            snapshot = snapshot_name,
            operations = output.operations.map_or(0, |ops| ops.len()),
            "delete accepted"
        );
        Ok(())
    }
}

/// Snapshots whose source instance is gone have no `fromInstanceName`; they get an empty
/// instance name and never match a configured instance.
fn into_snapshot(record: InstanceSnapshot) -> Option<Snapshot> {
    let name = record.name?;
    let created_at = record
        .created_at
        .and_then(|t| t.to_millis().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)?;
    Some(Snapshot::new(
        name,
        record.from_instance_name.unwrap_or_default(),
        created_at,
    ))
}

/// Modeled service errors keep their HTTP status and error code; everything that never got a
/// response is a transport failure.
fn provider_error<E>(operation: &'static str, err: SdkError<E>) -> GatewayError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(e) => GatewayError::Api {
            status: e.raw().status().as_u16(),
            error_type: e.err().code().unwrap_or("UnknownError").to_owned(),
            message: e
                .err()
                .message()
                .map(str::to_owned)
                .unwrap_or_else(|| DisplayErrorContext(&err).to_string()),
        },
        SdkError::ResponseError(e) => GatewayError::Response {
            operation,
            status: e.raw().status().as_u16(),
            message: DisplayErrorContext(&err).to_string(),
        },
        _ => GatewayError::Transport {
            operation,
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}
