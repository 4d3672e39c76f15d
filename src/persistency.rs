use chrono::{DateTime, TimeDelta, Utc};

use crate::fetcher::Revision;

pub const SECONDS_PER_HOUR: f64 = 3600.0;
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// A revision together with how long it stood before the next revision replaced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistencyRecord {
    pub revision: Revision,
    pub persistency: TimeDelta,
}

impl PersistencyRecord {
    pub fn persistency_seconds(&self) -> f64 {
        self.persistency.num_milliseconds() as f64 / 1000.0
    }

    pub fn persistency_hours(&self) -> f64 {
        self.persistency_seconds() / SECONDS_PER_HOUR
    }

    pub fn persistency_days(&self) -> f64 {
        self.persistency_seconds() / SECONDS_PER_DAY
    }
}

/// Compute the persistency of every revision, measuring the latest one against the current time.
///
/// See [`compute_persistency_at`].
pub fn compute_persistency(revisions: &[Revision]) -> Vec<PersistencyRecord> {
    compute_persistency_at(revisions, Utc::now())
}

/// Compute the persistency of every revision as of `now`.
///
/// The revisions are sorted by timestamp (ties keep their input order). Each revision persists
/// until the timestamp of its successor; the most recent one persists until `now`.
///
/// # Example
///
/// ```
/// # use wikipersist::persistency::compute_persistency_at;
/// # use wikipersist::fetcher::{Author, Revision};
/// # use chrono::{DateTime, TimeDelta};
/// let at = |seconds| Revision {
///     id: seconds as u64,
///     author: Author { name: "Fmercer".into(), id: 1 },
///     timestamp: DateTime::from_timestamp(seconds, 0).unwrap(),
///     size: None,
///     delta: 0,
/// };
/// let now = DateTime::from_timestamp(10_000, 0).unwrap();
///
/// let records = compute_persistency_at(&[at(7_200), at(0)], now);
/// assert_eq!(records[0].persistency, TimeDelta::hours(2));
/// assert_eq!(records[1].persistency_seconds(), 2_800.0);
/// ```
pub fn compute_persistency_at(revisions: &[Revision], now: DateTime<Utc>) -> Vec<PersistencyRecord> {
    let mut sorted = revisions.to_vec();
    sorted.sort_by_key(|r| r.timestamp);

    let superseded_at: Vec<DateTime<Utc>> = sorted
        .iter()
        .skip(1)
        .map(|r| r.timestamp)
        .chain(std::iter::once(now))
        .collect();

    let records: Vec<PersistencyRecord> = sorted
        .into_iter()
        .zip(superseded_at)
        .map(|(revision, until)| PersistencyRecord {
            persistency: until - revision.timestamp,
            revision,
        })
        .collect();

    if let Some(last) = records.last() {
        if last.persistency < TimeDelta::zero() {
            tracing::warn!(
                message = "latest revision is newer than the reference time",
                revision = last.revision.id,
                timestamp = %last.revision.timestamp,
                now = %now
            );
        }
    }

    records
}
