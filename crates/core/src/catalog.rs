use std::collections::BTreeMap;

use crate::snapshot::Snapshot;

/// Managed snapshots of one instance, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceHistory {
    snapshots: Vec<Snapshot>,
}

impl InstanceHistory {
    /// Sorts by `created_at`, breaking ties by name so the order does not depend on
    /// the order the provider listed them in.
    pub fn from_unsorted(mut snapshots: Vec<Snapshot>) -> Self {
        snapshots.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Self { snapshots }
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Per-run view of managed snapshots, grouped by owning instance.
///
/// Built once per run from the complete provider listing and shared by reference; it is
/// never cached across runs.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    histories: BTreeMap<String, InstanceHistory>,
}

impl Catalog {
    /// Keeps only snapshots that carry the managed marker and belong to one of
    /// `managed_instances`. Everything else is dropped without being reported.
    pub fn build<S: AsRef<str>>(raw: Vec<Snapshot>, managed_instances: &[S]) -> Self {
        let mut grouped: BTreeMap<String, Vec<Snapshot>> = managed_instances
            .iter()
            .map(|name| (name.as_ref().to_owned(), Vec::new()))
            .collect();

        for snapshot in raw {
            if !snapshot.is_managed() {
                continue;
            }
            if let Some(group) = grouped.get_mut(&snapshot.instance_name) {
                group.push(snapshot);
            }
        }

        let histories = grouped
            .into_iter()
            .map(|(instance, snapshots)| (instance, InstanceHistory::from_unsorted(snapshots)))
            .collect();
        Self { histories }
    }

    /// History for `instance`; empty for instances without managed snapshots or
    /// instances the catalog was not built for.
    pub fn history(&self, instance: &str) -> InstanceHistory {
        self.histories.get(instance).cloned().unwrap_or_default()
    }

    pub fn managed_snapshot_count(&self) -> usize {
        self.histories.values().map(InstanceHistory::len).sum()
    }
}
