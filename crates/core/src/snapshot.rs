use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name suffix that marks a snapshot as created (and therefore owned) by this tool.
pub const MANAGED_SUFFIX: &str = "-autosnap";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub name: String,
    pub instance_name: String,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(
        name: impl Into<String>,
        instance_name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            instance_name: instance_name.into(),
            created_at,
        }
    }

    /// Whether the name carries the managed-snapshot marker.
    pub fn is_managed(&self) -> bool {
        self.name.ends_with(MANAGED_SUFFIX)
    }
}

/// Builds the name for a new managed snapshot: `<instance>-<epoch millis>-autosnap`.
pub fn managed_snapshot_name(instance_name: &str, at: DateTime<Utc>) -> String {
    format!("{instance_name}-{}{MANAGED_SUFFIX}", at.timestamp_millis())
}
