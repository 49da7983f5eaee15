use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Action {
    Create,
    Delete,
    /// The instance's task itself died before reporting.
    Task,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Failure {
    pub action: Action,
    pub snapshot: String,
    pub message: String,
}

/// What happened to one instance during a run. In a dry run `created` and `deleted` hold the
/// calls that would have been made.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct InstanceReport {
    pub instance: String,
    pub created: Option<String>,
    pub retained: usize,
    pub deleted: Vec<String>,
    pub failures: Vec<Failure>,
}

impl InstanceReport {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RunReport {
    pub dry_run: bool,
    pub instances: Vec<InstanceReport>,
}

impl RunReport {
    pub fn created(&self) -> usize {
        self.instances.iter().filter(|r| r.created.is_some()).count()
    }

    pub fn retained(&self) -> usize {
        self.instances.iter().map(|r| r.retained).sum()
    }

    pub fn deleted(&self) -> usize {
        self.instances.iter().map(|r| r.deleted.len()).sum()
    }

    pub fn failures(&self) -> usize {
        self.instances.iter().map(|r| r.failures.len()).sum()
    }

    /// Instances that hit at least one provider failure.
    pub fn failed_instances(&self) -> Vec<&str> {
        self.instances
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| r.instance.as_str())
            .collect()
    }

    pub fn is_partial_failure(&self) -> bool {
        self.instances.iter().any(|r| !r.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_across_instances() {
        let mut web = InstanceReport::new("web-1");
        web.created = Some("web-1-1-autosnap".to_owned());
        web.retained = 3;
        web.deleted = vec!["a".to_owned(), "b".to_owned()];

        let mut db = InstanceReport::new("db-1");
        db.retained = 1;
        db.failures.push(Failure {
            action: Action::Delete,
            snapshot: "c".to_owned(),
            message: "boom".to_owned(),
        });

        let report = RunReport {
            dry_run: false,
            instances: vec![web, db],
        };
        assert_eq!(report.created(), 1);
        assert_eq!(report.retained(), 4);
        assert_eq!(report.deleted(), 2);
        assert_eq!(report.failures(), 1);
        assert!(report.is_partial_failure());
        assert_eq!(report.failed_instances(), ["db-1"]);
    }
}
