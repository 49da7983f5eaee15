use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use autosnap_core::Snapshot;
use chrono::{DateTime, Utc};

use crate::error::GatewayError;
use crate::gateway::{SnapshotGateway, SnapshotPage};

/// In-process snapshot provider with paginated listing and injectable failures.
///
/// Snapshots created through it are stamped with the gateway's clock, which defaults to the
/// wall clock and can be pinned with [`InMemoryGateway::with_clock`].
pub struct InMemoryGateway {
    page_size: usize,
    clock: Option<DateTime<Utc>>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    snapshots: Vec<Snapshot>,
    created: Vec<String>,
    deleted: Vec<String>,
    list_calls: usize,
    failing_instances: HashSet<String>,
    failing_deletes: HashSet<String>,
    failing_page: Option<usize>,
}

impl InMemoryGateway {
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        Self {
            page_size: 50,
            clock: None,
            state: Mutex::new(State {
                snapshots,
                ..State::default()
            }),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    /// Make every create for `instance` fail.
    pub fn fail_creates_for(&self, instance: &str) {
        self.state().failing_instances.insert(instance.to_owned());
    }

    /// Make deleting `snapshot_name` fail.
    pub fn fail_delete_of(&self, snapshot_name: &str) {
        self.state().failing_deletes.insert(snapshot_name.to_owned());
    }

    /// Make the `page`-th listing request (1-based) fail.
    pub fn fail_listing_page(&self, page: usize) {
        self.state().failing_page = Some(page);
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.state().snapshots.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.state().created.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl SnapshotGateway for InMemoryGateway {
    async fn list_page(&self, page_token: Option<String>) -> Result<SnapshotPage, GatewayError> {
        let mut state = self.state();
        state.list_calls += 1;
        if state.failing_page == Some(state.list_calls) {
            return Err(GatewayError::api(500, "ServiceException", "listing unavailable"));
        }

        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| GatewayError::api(400, "InvalidInputException", "bad page token"))?,
            None => 0,
        };
        let end = (offset + self.page_size).min(state.snapshots.len());
        let snapshots = state.snapshots.get(offset..end).unwrap_or_default().to_vec();
        let next_page_token = (end < state.snapshots.len()).then(|| end.to_string());

        Ok(SnapshotPage {
            snapshots,
            next_page_token,
        })
    }

    async fn create_snapshot(
        &self,
        instance_name: &str,
        snapshot_name: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.state();
        if state.failing_instances.contains(instance_name) {
            return Err(GatewayError::api(
                400,
                "OperationFailureException",
                format!("cannot snapshot {instance_name}"),
            ));
        }
        if state.snapshots.iter().any(|s| s.name == snapshot_name) {
            return Err(GatewayError::api(
                400,
                "InvalidInputException",
                format!("snapshot {snapshot_name} already exists"),
            ));
        }

        let created_at = self.clock.unwrap_or_else(Utc::now);
        state
            .snapshots
            .push(Snapshot::new(snapshot_name, instance_name, created_at));
        state.created.push(snapshot_name.to_owned());
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_name: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        if state.failing_deletes.contains(snapshot_name) {
            return Err(GatewayError::api(
                400,
                "OperationFailureException",
                format!("cannot delete {snapshot_name}"),
            ));
        }

        let before = state.snapshots.len();
        state.snapshots.retain(|s| s.name != snapshot_name);
        if state.snapshots.len() == before {
            return Err(GatewayError::api(
                400,
                "NotFoundException",
                format!("snapshot {snapshot_name} does not exist"),
            ));
        }
        state.deleted.push(snapshot_name.to_owned());
        Ok(())
    }
}
