//! Retention decisions for a single instance's snapshot history.
//!
//! Everything here is pure: "now" is always passed in, and its UTC offset defines what a
//! calendar day is for the day-of-week and day-of-month checks.

use chrono::{DateTime, Datelike, FixedOffset, Weekday};
use serde::{Deserialize, Serialize};

use crate::catalog::InstanceHistory;
use crate::policy::RetentionPolicy;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Tier {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Decision {
    Retain(Tier),
    Delete,
}

impl Decision {
    pub fn is_retain(&self) -> bool {
        matches!(self, Decision::Retain(_))
    }
}

/// One snapshot together with the verdict the engine reached for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict<'a> {
    pub snapshot: &'a Snapshot,
    pub age_days: i64,
    pub decision: Decision,
}

/// Whole days between `created_at` and `now`, truncated toward zero.
pub fn age_in_days(snapshot: &Snapshot, now: DateTime<FixedOffset>) -> i64 {
    now.signed_duration_since(snapshot.created_at).num_days()
}

/// True when the history is empty or its latest snapshot was taken on an earlier (or later)
/// calendar day than `now`.
pub fn needs_backup_today(history: &InstanceHistory, now: DateTime<FixedOffset>) -> bool {
    match history.latest() {
        None => true,
        Some(latest) => {
            latest.created_at.with_timezone(&now.timezone()).date_naive() != now.date_naive()
        }
    }
}

/// Decides a single snapshot. Tiers are exclusive: the first window the age falls into is the
/// only one consulted, and failing its predicate means deletion.
pub fn decide(snapshot: &Snapshot, now: DateTime<FixedOffset>, policy: &RetentionPolicy) -> Decision {
    let age = age_in_days(snapshot, now);
    let local = snapshot.created_at.with_timezone(&now.timezone());
    let sunday = local.weekday() == Weekday::Sun;

    if age <= policy.daily_window_days {
        Decision::Retain(Tier::Daily)
    } else if age <= policy.weekly_window_days() {
        if sunday {
            Decision::Retain(Tier::Weekly)
        } else {
            Decision::Delete
        }
    } else if age <= policy.monthly_window_days() {
        if sunday && local.day() <= 7 {
            Decision::Retain(Tier::Monthly)
        } else {
            Decision::Delete
        }
    } else {
        Decision::Delete
    }
}

/// Classifies every snapshot independently, returning verdicts in input order.
pub fn classify<'a>(
    snapshots: &'a [Snapshot],
    now: DateTime<FixedOffset>,
    policy: &RetentionPolicy,
) -> Vec<Verdict<'a>> {
    snapshots
        .iter()
        .map(|snapshot| Verdict {
            snapshot,
            age_days: age_in_days(snapshot, now),
            decision: decide(snapshot, now, policy),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, Utc};

    use super::*;

    fn now(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).expect("rfc3339")
    }

    fn snap(name: &str, created: &str) -> Snapshot {
        let created_at = DateTime::parse_from_rfc3339(created)
            .expect("rfc3339")
            .with_timezone(&Utc);
        Snapshot::new(format!("{name}-autosnap"), "web-1", created_at)
    }

    fn policy() -> RetentionPolicy {
        RetentionPolicy::new(7, 4, 3)
    }

    fn decisions(snapshots: &[Snapshot], now: DateTime<FixedOffset>) -> BTreeMap<String, Decision> {
        classify(snapshots, now, &policy())
            .into_iter()
            .map(|v| (v.snapshot.name.clone(), v.decision))
            .collect()
    }

    #[test]
    fn three_tier_scenario() {
        let now = now("2024-03-31T12:00:00Z");
        let history = vec![
            snap("dec-01", "2023-12-01T12:00:00Z"),
            snap("feb-04", "2024-02-04T12:00:00Z"),
            snap("mar-04", "2024-03-04T12:00:00Z"),
            snap("mar-10", "2024-03-10T12:00:00Z"),
            snap("mar-25", "2024-03-25T12:00:00Z"),
        ];

        let verdicts = classify(&history, now, &policy());
        let summary: Vec<_> = verdicts.iter().map(|v| (v.age_days, v.decision)).collect();
        assert_eq!(
            summary,
            vec![
                (121, Decision::Delete),
                (56, Decision::Retain(Tier::Monthly)),
                (27, Decision::Delete),
                (21, Decision::Retain(Tier::Weekly)),
                (6, Decision::Retain(Tier::Daily)),
            ]
        );
    }

    #[test]
    fn daily_window_ignores_calendar() {
        let now = now("2024-03-31T12:00:00Z");
        let edge = snap("edge", "2024-03-24T12:00:00Z");
        assert_eq!(age_in_days(&edge, now), 7);
        assert_eq!(decide(&edge, now, &policy()), Decision::Retain(Tier::Daily));

        let wednesday = snap("wed", "2024-03-27T12:00:00Z");
        assert_eq!(decide(&wednesday, now, &policy()), Decision::Retain(Tier::Daily));

        let today = snap("today", "2024-03-31T01:00:00Z");
        assert_eq!(age_in_days(&today, now), 0);
        assert_eq!(decide(&today, now, &policy()), Decision::Retain(Tier::Daily));
    }

    #[test]
    fn age_truncates_partial_days() {
        let now = now("2024-03-31T12:00:00Z");
        let almost_eight = snap("almost", "2024-03-23T12:00:01Z");
        assert_eq!(age_in_days(&almost_eight, now), 7);
        assert!(decide(&almost_eight, now, &policy()).is_retain());
    }

    #[test]
    fn weekly_window_keeps_only_sundays() {
        let now = now("2024-03-31T12:00:00Z");
        // 2024-03-17 Sunday (age 14), 2024-03-16 Saturday (age 15), 2024-03-03 Sunday (age 28).
        assert_eq!(
            decide(&snap("sun", "2024-03-17T12:00:00Z"), now, &policy()),
            Decision::Retain(Tier::Weekly)
        );
        assert_eq!(decide(&snap("sat", "2024-03-16T12:00:00Z"), now, &policy()), Decision::Delete);
        assert_eq!(
            decide(&snap("edge", "2024-03-03T12:00:00Z"), now, &policy()),
            Decision::Retain(Tier::Weekly)
        );
    }

    #[test]
    fn monthly_window_keeps_only_first_sunday() {
        let now = now("2024-03-31T12:00:00Z");
        // 2024-02-25 Sunday but day 25, 2024-01-07 first Sunday of January (age 84).
        assert_eq!(decide(&snap("late", "2024-02-25T12:00:00Z"), now, &policy()), Decision::Delete);
        assert_eq!(
            decide(&snap("jan-07", "2024-01-07T12:00:00Z"), now, &policy()),
            Decision::Retain(Tier::Monthly)
        );
        // First-week Monday in the monthly window.
        assert_eq!(decide(&snap("mon", "2024-02-05T12:00:00Z"), now, &policy()), Decision::Delete);
    }

    #[test]
    fn monthly_window_upper_bound_is_inclusive() {
        let first_sunday = snap("jan-07", "2024-01-07T12:00:00Z");

        let last_day = now("2024-04-06T12:00:00Z");
        assert_eq!(age_in_days(&first_sunday, last_day), 90);
        assert_eq!(decide(&first_sunday, last_day, &policy()), Decision::Retain(Tier::Monthly));

        let day_after = now("2024-04-07T12:00:00Z");
        assert_eq!(age_in_days(&first_sunday, day_after), 91);
        assert_eq!(decide(&first_sunday, day_after, &policy()), Decision::Delete);
    }

    #[test]
    fn day_past_weekly_window_is_judged_by_monthly_rule() {
        // Both Sundays, age 29 = weeks * 7 + 1.
        let first_sunday = snap("mar-03", "2024-03-03T12:00:00Z");
        let now_first = now("2024-04-01T12:00:00Z");
        assert_eq!(age_in_days(&first_sunday, now_first), 29);
        assert_eq!(decide(&first_sunday, now_first, &policy()), Decision::Retain(Tier::Monthly));

        let second_sunday = snap("mar-10", "2024-03-10T12:00:00Z");
        let now_second = now("2024-04-08T12:00:00Z");
        assert_eq!(age_in_days(&second_sunday, now_second), 29);
        assert_eq!(decide(&second_sunday, now_second, &policy()), Decision::Delete);
    }

    #[test]
    fn day_past_daily_window_requires_sunday() {
        let now = now("2024-03-31T12:00:00Z");
        // Saturday 2024-03-23, age 8.
        let saturday = snap("sat", "2024-03-23T12:00:00Z");
        assert_eq!(age_in_days(&saturday, now), 8);
        assert_eq!(decide(&saturday, now, &policy()), Decision::Delete);
    }

    #[test]
    fn beyond_monthly_window_is_always_deleted() {
        let now = now("2024-03-31T12:00:00Z");
        // 2023-12-03 is a first Sunday but age 119 > 90.
        assert_eq!(decide(&snap("old", "2023-12-03T12:00:00Z"), now, &policy()), Decision::Delete);
    }

    #[test]
    fn calendar_predicates_use_the_offset_of_now() {
        // 2024-03-09T23:30Z is Saturday in UTC but Sunday at +02:00.
        let created = snap("shifted", "2024-03-09T23:30:00Z");
        let utc_now = now("2024-03-31T12:00:00Z");
        let plus_two = now("2024-03-31T14:00:00+02:00");

        assert_eq!(decide(&created, utc_now, &policy()), Decision::Delete);
        assert_eq!(decide(&created, plus_two, &policy()), Decision::Retain(Tier::Weekly));
    }

    #[test]
    fn classification_is_order_independent() {
        let now = now("2024-03-31T12:00:00Z");
        let start = now.with_timezone(&Utc) - Duration::days(120);
        let history: Vec<_> = (0..120)
            .map(|d| {
                Snapshot::new(
                    format!("s{d:03}-autosnap"),
                    "web-1",
                    start + Duration::days(d) + Duration::hours(d % 5),
                )
            })
            .collect();
        let mut shuffled = history.clone();
        shuffled.reverse();
        shuffled.rotate_left(37);

        assert_eq!(decisions(&history, now), decisions(&shuffled, now));
    }

    #[test]
    fn empty_history() {
        let now = now("2024-03-31T12:00:00Z");
        let history = InstanceHistory::default();
        assert!(needs_backup_today(&history, now));
        assert!(classify(history.snapshots(), now, &policy()).is_empty());
    }

    #[test]
    fn same_day_snapshot_suppresses_new_backup() {
        let now = now("2024-03-31T12:00:00Z");
        let history = InstanceHistory::from_unsorted(vec![
            snap("yesterday", "2024-03-30T23:59:00Z"),
            snap("morning", "2024-03-31T00:05:00Z"),
        ]);
        assert!(!needs_backup_today(&history, now));
    }

    #[test]
    fn previous_day_snapshot_requires_new_backup() {
        let now = now("2024-03-31T00:01:00Z");
        let history = InstanceHistory::from_unsorted(vec![snap("late", "2024-03-30T23:59:00Z")]);
        assert!(needs_backup_today(&history, now));
    }

    #[test]
    fn calendar_day_follows_offset_of_now() {
        // 22:30Z on the 30th is already the 31st at +02:00.
        let history = InstanceHistory::from_unsorted(vec![snap("late", "2024-03-30T22:30:00Z")]);
        assert!(needs_backup_today(&history, now("2024-03-31T09:00:00Z")));
        assert!(!needs_backup_today(&history, now("2024-03-31T09:00:00+02:00")));
    }
}
