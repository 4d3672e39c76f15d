use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::{
    api::{FetchError, QueryResponse, RevisionApi},
    fetcher::{Author, Revision},
    page::PageRef,
};

pub mod prelude {
    pub(crate) use super::proptest as proptest_support;
    pub(crate) use super::{
        api_revision, dummy_revision, missing_page, response_page, revision, test_page, utc,
        MockApi,
    };
    pub(crate) use proptest::prelude::*;
}

/// Scripted stand-in for the Action API.
///
/// Hands out `responses` in order and records every request it receives. Once the script is
/// exhausted it answers with an empty response.
pub struct MockApi {
    pub responses: VecDeque<Result<QueryResponse, FetchError>>,
    pub requests: Vec<Vec<(&'static str, String)>>,
    pub languages: Vec<String>,
}

impl MockApi {
    pub fn new(responses: Vec<Result<QueryResponse, FetchError>>) -> Self {
        Self {
            responses: responses.into(),
            requests: Vec::new(),
            languages: Vec::new(),
        }
    }
}

impl RevisionApi for MockApi {
    fn query(
        &mut self,
        page: &PageRef,
        params: &[(&'static str, String)],
    ) -> Result<QueryResponse, FetchError> {
        self.requests.push(params.to_vec());
        self.languages.push(page.language.clone());
        self.responses
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResponse::default()))
    }
}

pub fn test_page() -> PageRef {
    PageRef::new("Anne_Conway_(philosopher)", "en")
}

pub fn utc(timestamp: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(timestamp)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn api_revision(id: u64, user: &str, timestamp: &str, size: Option<u64>) -> Value {
    let mut revision = json!({
        "revid": id,
        "parentid": id.saturating_sub(1),
        "user": user,
        "userid": id * 10,
        "timestamp": timestamp,
    });
    if let Some(size) = size {
        revision["size"] = json!(size);
    }
    revision
}

pub fn response_page(revisions: &[Value], rvcontinue: Option<&str>) -> QueryResponse {
    let mut response = json!({
        "batchcomplete": rvcontinue.is_none(),
        "query": {"pages": [{
            "pageid": 1,
            "ns": 0,
            "title": "Anne Conway (philosopher)",
            "revisions": revisions,
        }]}
    });
    if let Some(token) = rvcontinue {
        response["continue"] = json!({"rvcontinue": token, "continue": "||"});
    }
    serde_json::from_value(response).unwrap()
}

pub fn missing_page() -> QueryResponse {
    serde_json::from_value(json!({
        "batchcomplete": true,
        "query": {"pages": [{"ns": 0, "title": "Anne Conway (philosopher)", "missing": true}]}
    }))
    .unwrap()
}

pub fn dummy_revision() -> Revision {
    Revision {
        id: 0,
        author: Author {
            name: "Dummy".into(),
            id: 0,
        },
        timestamp: DateTime::from_timestamp_nanos(0),
        size: None,
        delta: 0,
    }
}

pub fn revision(id: u64, user: &str, timestamp: &str) -> Revision {
    Revision {
        id,
        author: Author {
            name: user.into(),
            id: id * 10,
        },
        timestamp: utc(timestamp),
        ..dummy_revision()
    }
}

pub mod proptest {
    use chrono::{DateTime, Utc};
    use compact_str::CompactString;
    use proptest::prelude::*;

    use crate::fetcher::{Author, Revision};

    // 2001-01-15 to roughly 2030
    const MIN_SECONDS: i64 = 979_516_800;
    const MAX_SECONDS: i64 = 1_900_000_000;

    pub fn editor_name() -> impl Strategy<Value = CompactString> {
        prop_oneof![
            Just(CompactString::from("Fmercer")),
            Just(CompactString::from("Citedesdames")),
            Just(CompactString::from("ZL027")),
            Just(CompactString::from("")),
            "[A-Za-z ]{1,12}".prop_map(CompactString::from),
        ]
    }

    pub fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        (MIN_SECONDS..MAX_SECONDS)
            .prop_map(|seconds| DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }

    prop_compose! {
        pub fn any_revision(id: u64)
                (name in editor_name(), timestamp in timestamp(), size in proptest::option::of(0u64..200_000), delta in -5_000i64..5_000)
        -> Revision {
            Revision {
                id, /* must be unique */
                author: Author { name, id: id * 10 },
                timestamp,
                size,
                delta,
            }
        }
    }

    /// Revisions in arbitrary timestamp order, with unique ids.
    pub fn revision_vec(max_revisions: u64) -> impl Strategy<Value = Vec<Revision>> {
        (0..max_revisions).prop_flat_map(|num_revisions| {
            let mut revisions = Vec::new();
            for i in 0..num_revisions {
                revisions.push(any_revision(i + 1));
            }
            revisions
        })
    }
}
