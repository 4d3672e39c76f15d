use std::time::Duration;

use compact_str::CompactString;
use serde::Deserialize;

use crate::{config::ApiSettings, page::PageRef};

/// Query parameters of a single Action API request, in the order they are sent.
pub type QueryParams = Vec<(&'static str, String)>;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed")]
    Transport {
        endpoint: String,
        #[source]
        source: ureq::Error,
    },
    #[error("{endpoint} answered with HTTP status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("malformed response from {endpoint}")]
    Malformed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("API error `{code}`: {info}")]
    Api { code: String, info: String },
}

impl FetchError {
    fn from_ureq(endpoint: &str, error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(status) => FetchError::Status {
                endpoint: endpoint.to_string(),
                status,
            },
            source => FetchError::Transport {
                endpoint: endpoint.to_string(),
                source,
            },
        }
    }
}

/// Source of revision-history responses.
///
/// [`HttpApi`] talks to the live MediaWiki Action API; tests substitute scripted responses.
pub trait RevisionApi {
    fn query(&mut self, page: &PageRef, params: &[(&'static str, String)])
        -> Result<QueryResponse, FetchError>;
}

// Response shape of `action=query&prop=revisions&formatversion=2`:
// {"continue":{"rvcontinue":"20140301120000|612","continue":"||"},
//  "query":{"pages":[{"pageid":1,"ns":0,"title":"...","revisions":[{"revid":1,"user":"...","userid":5,"timestamp":"2014-03-01T12:00:00Z","size":100}]}]}}
#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub query: Option<QueryBody>,
    #[serde(rename = "continue", default)]
    pub continuation: Option<Continuation>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryBody {
    #[serde(default)]
    pub pages: Vec<ApiPage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiPage {
    #[serde(default)]
    pub title: Option<String>,
    // set (and `revisions` absent) when the title does not exist
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub revisions: Vec<ApiRevision>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRevision {
    pub revid: u64,
    // absent for suppressed usernames (`"userhidden": true`)
    #[serde(default)]
    pub user: Option<CompactString>,
    #[serde(default)]
    pub userid: Option<u64>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Continuation {
    #[serde(default)]
    pub rvcontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub info: String,
}

/// Blocking client for the MediaWiki Action API.
pub struct HttpApi {
    agent: ureq::Agent,
    user_agent: String,
    endpoint_template: String,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("agent", &std::any::type_name_of_val(&self.agent))
            .field("user_agent", &self.user_agent)
            .field("endpoint_template", &self.endpoint_template)
            .finish()
    }
}

impl HttpApi {
    pub fn new(settings: &ApiSettings) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .new_agent();

        Self {
            agent,
            user_agent: settings.user_agent.clone(),
            endpoint_template: settings.endpoint_template.clone(),
        }
    }
}

impl RevisionApi for HttpApi {
    fn query(
        &mut self,
        page: &PageRef,
        params: &[(&'static str, String)],
    ) -> Result<QueryResponse, FetchError> {
        let endpoint = page.endpoint(&self.endpoint_template);

        let mut request = self
            .agent
            .get(&endpoint)
            .header("User-Agent", &self.user_agent);
        for (key, value) in params {
            request = request.query(*key, value);
        }

        let mut response = request
            .call()
            .map_err(|e| FetchError::from_ureq(&endpoint, e))?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| FetchError::from_ureq(&endpoint, e))?;

        serde_json::from_str(&body).map_err(|source| FetchError::Malformed { endpoint, source })
    }
}
