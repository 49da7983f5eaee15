pub mod catalog;
pub mod policy;
pub mod retention;
pub mod snapshot;

pub use catalog::{Catalog, InstanceHistory};
pub use policy::RetentionPolicy;
pub use retention::{age_in_days, classify, decide, needs_backup_today, Decision, Tier, Verdict};
pub use snapshot::{managed_snapshot_name, Snapshot, MANAGED_SUFFIX};
