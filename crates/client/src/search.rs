//! HTTP client for the Elasticsearch-compatible search backend.
//!
//! Three endpoints cover the whole contract:
//!
//! - `POST /{index}/_search`: term filter on `store_id` plus from/size
//! - `PUT /{index}/_doc/{id}`: full-document upsert
//! - `POST /{index}/_update/{id}`: field-level partial update; a 404
//!   here means the document was never inserted, which the core error
//!   taxonomy calls a precondition failure

use async_trait::async_trait;
use revq_core::{Error, SearchBackend, SearchPage};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Default base URL for the search backend.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9200";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Search client configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Base URL (default: http://127.0.0.1:9200).
    pub base_url: String,
    /// Index holding the review replica (default: review).
    pub index: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string(), index: "review".to_string(), timeout: DEFAULT_TIMEOUT }
    }
}

/// Search backend client.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    config: SearchConfig,
}

/// `_search` response envelope, narrowed to what the core needs.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsMetadata,
}

#[derive(Debug, Deserialize)]
struct HitsMetadata {
    total: TotalHits,
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct TotalHits {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: Value,
}

/// Query body for one paginated store filter.
fn search_body(store_id: i64, offset: i32, limit: i32) -> Value {
    json!({
        "from": offset,
        "size": limit,
        "query": {
            "bool": {
                "filter": [
                    { "term": { "store_id": { "value": store_id } } }
                ]
            }
        }
    })
}

impl SearchClient {
    /// Create a new search client with the given configuration.
    pub fn new(config: SearchConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}/{}", self.config.base_url.trim_end_matches('/'), self.config.index, endpoint)
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn search(&self, store_id: i64, offset: i32, limit: i32) -> Result<SearchPage, Error> {
        tracing::debug!(store_id, offset, limit, "searching review index");

        let response = self
            .http
            .post(self.url("_search"))
            .json(&search_body(store_id, offset, limit))
            .send()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Unavailable(format!("search returned {status}: {body}")));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| Error::Serialization(e.to_string()))?;

        Ok(SearchPage {
            total: parsed.hits.total.value,
            hits: parsed.hits.hits.into_iter().map(|h| h.source).collect(),
        })
    }

    async fn upsert(&self, id: &str, doc: &Value) -> Result<(), Error> {
        let response = self
            .http
            .put(self.url(&format!("_doc/{id}")))
            .json(doc)
            .send()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Unavailable(format!("upsert of {id} returned {status}: {body}")));
        }
        Ok(())
    }

    async fn partial_update(&self, id: &str, changes: &Value) -> Result<(), Error> {
        let response = self
            .http
            .post(self.url(&format!("_update/{id}")))
            .json(&json!({ "doc": changes }))
            .send()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::PreconditionFailed { id: id.to_string() });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Unavailable(format!("update of {id} returned {status}: {body}")));
        }
        Ok(())
    }
}
