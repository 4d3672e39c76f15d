use chrono::{DateTime, Utc};
use compact_str::CompactString;
use rustc_hash::FxHashSet;

use crate::fetcher::Revision;

/// Restricts a revision history to a time window and, optionally, to a set of editors.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionFilter {
    /// Inclusive lower bound on the revision timestamp.
    pub start: DateTime<Utc>,
    /// Editor allow-list; `None` admits every author.
    pub editors: Option<FxHashSet<CompactString>>,
}

/// What is left of a fetched history once the filter has run.
///
/// Keeps "nothing was fetched" apart from "everything was filtered out".
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    NoRevisions,
    FilteredOut { fetched: usize },
    Revisions(Vec<Revision>),
}

impl RevisionFilter {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            editors: None,
        }
    }

    pub fn with_editors<I, S>(mut self, editors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        self.editors = Some(editors.into_iter().map(Into::into).collect());
        self
    }

    pub fn matches(&self, revision: &Revision) -> bool {
        if revision.timestamp < self.start {
            return false;
        }
        match &self.editors {
            Some(editors) => editors.contains(&revision.author.name),
            None => true,
        }
    }

    /// Keep the matching revisions, in their original order.
    ///
    /// `delta` is carried over untouched: a kept revision still refers to its predecessor in the
    /// fetched history, even if that predecessor was dropped here.
    pub fn apply(&self, revisions: &[Revision]) -> Vec<Revision> {
        let kept: Vec<Revision> = revisions
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();

        tracing::debug!(
            message = "filtered revisions",
            fetched = revisions.len(),
            kept = kept.len(),
            start = %self.start,
            editor_filter = self.editors.is_some()
        );
        kept
    }

    pub fn select(&self, fetched: &[Revision]) -> Selection {
        if fetched.is_empty() {
            return Selection::NoRevisions;
        }

        let kept = self.apply(fetched);
        if kept.is_empty() {
            Selection::FilteredOut {
                fetched: fetched.len(),
            }
        } else {
            Selection::Revisions(kept)
        }
    }
}

/// Free-function form of [`RevisionFilter::apply`].
pub fn filter_revisions(
    revisions: &[Revision],
    start: DateTime<Utc>,
    allowed_editors: Option<&FxHashSet<CompactString>>,
) -> Vec<Revision> {
    RevisionFilter {
        start,
        editors: allowed_editors.cloned(),
    }
    .apply(revisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::prelude::*;

    fn history() -> Vec<Revision> {
        vec![
            Revision {
                size: Some(100),
                delta: 0,
                ..revision(1, "Fmercer", "2014-02-27T23:59:59Z")
            },
            Revision {
                size: Some(150),
                delta: 50,
                ..revision(2, "Somebody", "2014-02-28T00:00:00Z")
            },
            Revision {
                size: Some(120),
                delta: -30,
                ..revision(3, "Fmercer", "2014-03-02T08:00:00Z")
            },
            Revision {
                size: Some(130),
                delta: 10,
                ..revision(4, "Citedesdames", "2014-03-03T08:00:00Z")
            },
        ]
    }

    #[test]
    fn start_bound_is_inclusive() {
        let filter = RevisionFilter::new(utc("2014-02-28T00:00:00Z"));
        let kept = filter.apply(&history());
        assert_eq!(kept.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn allow_list_restricts_authors() {
        let filter = RevisionFilter::new(utc("2014-01-01T00:00:00Z"))
            .with_editors(["Fmercer", "Citedesdames"]);
        let kept = filter.apply(&history());
        assert_eq!(kept.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3, 4]);
    }

    #[test]
    fn editor_names_match_exactly() {
        let filter = RevisionFilter::new(utc("2014-01-01T00:00:00Z")).with_editors(["fmercer"]);
        assert!(filter.apply(&history()).is_empty());
    }

    #[test]
    fn delta_is_not_recomputed_after_filtering() {
        // revision 3 keeps the delta against revision 2 even though 2 is filtered out
        let filter = RevisionFilter::new(utc("2014-01-01T00:00:00Z")).with_editors(["Fmercer"]);
        let kept = filter.apply(&history());

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].id, 3);
        assert_eq!(kept[1].delta, -30);
        assert_ne!(
            kept[1].delta,
            kept[1].size.unwrap() as i64 - kept[0].size.unwrap() as i64
        );
    }

    #[test]
    fn keeps_duplicates_and_order() {
        let mut revisions = history();
        revisions.push(revisions[1].clone());
        let filter = RevisionFilter::new(utc("2014-02-28T00:00:00Z"));

        let kept = filter.apply(&revisions);
        assert_eq!(kept.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3, 4, 2]);
    }

    #[test]
    fn free_function_matches_filter() {
        let editors: FxHashSet<CompactString> = ["Fmercer".into()].into_iter().collect();
        let start = utc("2014-02-28T00:00:00Z");

        let kept = filter_revisions(&history(), start, Some(&editors));
        assert_eq!(kept.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3]);
        assert_eq!(filter_revisions(&history(), start, None).len(), 3);
    }

    #[test]
    fn selection_distinguishes_empty_from_filtered() {
        let filter = RevisionFilter::new(utc("2020-01-01T00:00:00Z"));

        assert_eq!(filter.select(&[]), Selection::NoRevisions);
        assert_eq!(
            filter.select(&history()),
            Selection::FilteredOut { fetched: 4 }
        );

        let filter = RevisionFilter::new(utc("2014-03-03T00:00:00Z"));
        match filter.select(&history()) {
            Selection::Revisions(kept) => assert_eq!(kept[0].id, 4),
            other => panic!("unexpected selection: {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn filtering_is_idempotent(
            revisions in proptest_support::revision_vec(40),
            start in proptest_support::timestamp(),
            restrict in any::<bool>(),
        ) {
            let mut filter = RevisionFilter::new(start);
            if restrict {
                filter = filter.with_editors(["Fmercer", "ZL027", ""]);
            }

            let once = filter.apply(&revisions);
            let twice = filter.apply(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
