use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use tracing::instrument;

use crate::{
    api::{ApiRevision, FetchError, QueryParams, QueryResponse, RevisionApi},
    page::PageRef,
};

// Source: https://www.mediawiki.org/wiki/API:Revisions
const REVISION_PROPERTIES: &str = "ids|timestamp|user|userid|size";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Author {
    // empty for suppressed usernames
    pub name: CompactString,
    pub id: u64,
}

/// One saved edit of a page, as fetched from the revision history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision {
    pub id: u64,
    pub author: Author,
    pub timestamp: DateTime<Utc>,
    pub size: Option<u64>,
    /// Size difference to the revision fetched immediately before this one.
    ///
    /// `0` for the first fetched revision and whenever either size is unknown. Not recomputed when
    /// revisions are filtered out later.
    pub delta: i64,
}

impl Revision {
    fn from_api(revision: ApiRevision, delta: i64) -> Self {
        Self {
            id: revision.revid,
            author: Author {
                name: revision.user.unwrap_or_default(),
                id: revision.userid.unwrap_or(0),
            },
            timestamp: revision.timestamp,
            size: revision.size,
            delta,
        }
    }
}

/// Running size of the page across a fetch.
#[derive(Debug, Default)]
struct SizeTracker {
    last_size: Option<u64>,
}

impl SizeTracker {
    /// Delta of `size` against the previous revision; always replaces the remembered size,
    /// so an unknown size only zeroes the delta of the revision right after it.
    fn next_delta(&mut self, size: Option<u64>) -> i64 {
        let delta = match (self.last_size, size) {
            (Some(last), Some(size)) => size as i64 - last as i64,
            _ => 0,
        };
        self.last_size = size;
        delta
    }
}

/// A fetch that was aborted by a failed request.
///
/// Carries the revisions received before the failure.
#[derive(Debug, thiserror::Error)]
#[error("fetching revisions aborted after {} revisions", revisions.len())]
pub struct IncompleteFetch {
    pub revisions: Vec<Revision>,
    #[source]
    pub source: FetchError,
}

fn initial_params(page: &PageRef, start: Option<DateTime<Utc>>) -> QueryParams {
    let mut params: QueryParams = vec![
        ("action", "query".to_string()),
        ("prop", "revisions".to_string()),
        ("titles", page.title.clone()),
        ("rvprop", REVISION_PROPERTIES.to_string()),
        ("rvlimit", "max".to_string()),
        // oldest first
        ("rvdir", "newer".to_string()),
        ("format", "json".to_string()),
        ("formatversion", "2".to_string()),
    ];
    if let Some(start) = start {
        params.push(("rvstart", start.format(TIMESTAMP_FORMAT).to_string()));
    }
    params
}

fn set_continuation(params: &mut QueryParams, token: String) {
    if let Some((_, value)) = params.iter_mut().find(|(key, _)| *key == "rvcontinue") {
        *value = token;
    } else {
        params.push(("rvcontinue", token));
    }
}

/// Fetch the revision history of `page`, oldest revision first.
///
/// Requests are issued one after another, each asking for the maximum batch size, until the API
/// stops returning a continuation token. If `start` is given only revisions at or after it are
/// requested.
///
/// A page that does not exist yields an empty history. Any failed request ends the fetch; the
/// revisions collected up to that point are returned inside the [`IncompleteFetch`].
#[instrument(skip(api, page), fields(page = %page))]
pub fn fetch_revisions<A: RevisionApi + ?Sized>(
    api: &mut A,
    page: &PageRef,
    start: Option<DateTime<Utc>>,
) -> Result<Vec<Revision>, IncompleteFetch> {
    let mut params = initial_params(page, start);
    let mut revisions = Vec::new();
    let mut sizes = SizeTracker::default();
    let mut requests = 0usize;

    loop {
        requests += 1;
        tracing::debug!(message = "requesting revisions", request = requests);

        let response = match api.query(page, &params) {
            Ok(response) => response,
            Err(source) => {
                tracing::error!(message = "revision request failed, aborting fetch", error = %source, request = requests, collected = revisions.len());
                return Err(IncompleteFetch { revisions, source });
            }
        };

        let QueryResponse {
            query,
            continuation,
            error,
        } = response;

        if let Some(error) = error {
            tracing::error!(message = "API reported an error, aborting fetch", code = error.code.as_str(), info = error.info.as_str());
            return Err(IncompleteFetch {
                revisions,
                source: FetchError::Api {
                    code: error.code,
                    info: error.info,
                },
            });
        }

        let Some(api_page) = query.and_then(|q| q.pages.into_iter().next()) else {
            tracing::info!(message = "response contains no pages", request = requests);
            break;
        };
        if api_page.missing {
            let title = api_page.title.as_deref().unwrap_or(page.title.as_str());
            tracing::info!(message = "page does not exist", title);
        }

        let received = api_page.revisions.len();
        for revision in api_page.revisions {
            let delta = sizes.next_delta(revision.size);
            revisions.push(Revision::from_api(revision, delta));
        }
        tracing::debug!(message = "received revisions", received, total = revisions.len());

        match continuation.and_then(|c| c.rvcontinue) {
            Some(token) if !token.is_empty() => set_continuation(&mut params, token),
            _ => break,
        }
    }

    tracing::info!(message = "fetched revision history", revisions = revisions.len(), requests);
    Ok(revisions)
}

/// Run [`fetch_revisions`] on its own thread.
///
/// The fetch itself stays sequential; this only keeps the calling thread free while it runs.
pub fn spawn_fetch<A>(
    mut api: A,
    page: PageRef,
    start: Option<DateTime<Utc>>,
) -> JoinHandle<Result<Vec<Revision>, IncompleteFetch>>
where
    A: RevisionApi + Send + 'static,
{
    std::thread::spawn(move || fetch_revisions(&mut api, &page, start))
}
