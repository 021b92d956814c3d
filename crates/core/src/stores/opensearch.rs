use crate::error::SearchError;
use crate::models::{IndexEntry, IngestRecord};
use crate::traits::SearchIndex;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

const BACKEND: &str = "opensearch";
const SCAN_PAGE_SIZE: usize = 1_000;

pub struct OpenSearchIndex {
    client: Arc<Client>,
    endpoint: String,
    index_name: String,
    dimensions: usize,
}

impl OpenSearchIndex {
    pub fn new(
        endpoint: &str,
        index_name: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, SearchError> {
        Url::parse(endpoint)?;
        Ok(Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            index_name: index_name.into(),
            dimensions,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Creates the index with a k-NN mapping for `contentVector` unless it already exists.
    pub async fn ensure_index(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .head(format!("{}/{}", self.endpoint, self.index_name))
            .send()
            .await?;

        if response.status() == StatusCode::OK {
            return Ok(());
        }

        if !response.status().is_client_error() {
            return Err(backend_error(response.status().to_string()));
        }

        let response = self
            .client
            .put(format!("{}/{}", self.endpoint, self.index_name))
            .json(&index_definition(self.dimensions))
            .send()
            .await?;

        if response.status().is_server_error() || response.status().is_client_error() {
            return Err(SearchError::Request(format!(
                "open-search index setup failed with {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn bulk(&self, payload: String) -> Result<(), SearchError> {
        let response = self
            .client
            .post(format!("{}/_bulk", self.endpoint))
            .header("Content-Type", "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status().to_string()));
        }

        let body: Value = response.json().await?;
        check_bulk_response(&body)
    }
}

#[async_trait]
impl SearchIndex for OpenSearchIndex {
    async fn upload_batch(&self, records: &[IngestRecord]) -> Result<(), SearchError> {
        if records.is_empty() {
            return Ok(());
        }
        self.bulk(bulk_index_payload(&self.index_name, records)?).await
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<(), SearchError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.bulk(bulk_delete_payload(&self.index_name, ids)?).await
    }

    async fn scan_all(&self) -> Result<Vec<IndexEntry>, SearchError> {
        let mut entries = Vec::new();
        let mut search_after: Option<Value> = None;

        loop {
            let mut body = json!({
                "size": SCAN_PAGE_SIZE,
                "_source": ["id", "organization", "file"],
                "query": {"match_all": {}},
                "sort": [{"id": "asc"}]
            });
            if let Some(after) = &search_after {
                body["search_after"] = after.clone();
            }

            let response = self
                .client
                .post(format!("{}/{}/_search", self.endpoint, self.index_name))
                .json(&body)
                .send()
                .await?;

            if response.status() == StatusCode::NOT_FOUND {
                return Ok(entries);
            }
            if !response.status().is_success() {
                return Err(backend_error(response.status().to_string()));
            }

            let page: Value = response.json().await?;
            let (hits, next) = parse_scan_page(&page);
            debug!(hits = hits.len(), "index scan page");
            let exhausted = hits.len() < SCAN_PAGE_SIZE;
            entries.extend(hits);

            match next {
                Some(next) if !exhausted => search_after = Some(next),
                _ => return Ok(entries),
            }
        }
    }
}

fn backend_error(details: String) -> SearchError {
    SearchError::BackendResponse {
        backend: BACKEND.to_string(),
        details,
    }
}

fn index_definition(dimensions: usize) -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "index": {"knn": true}
        },
        "mappings": {
            "properties": {
                "id": {"type": "keyword"},
                "organization": {"type": "keyword"},
                "file": {"type": "keyword"},
                "title": {"type": "text"},
                "content": {"type": "text"},
                "page": {"type": "integer"},
                "total_pages": {"type": "integer"},
                "keywords": {"type": "keyword"},
                "contentVector": {"type": "knn_vector", "dimension": dimensions}
            }
        }
    })
}

fn to_ndjson(operations: Vec<Value>) -> Result<String, SearchError> {
    Ok(operations
        .into_iter()
        .map(|value| serde_json::to_string(&value))
        .collect::<Result<Vec<_>, serde_json::Error>>()?
        .join("\n")
        + "\n")
}

fn bulk_index_payload(index_name: &str, records: &[IngestRecord]) -> Result<String, SearchError> {
    let mut operations = Vec::with_capacity(records.len() * 2);
    for record in records {
        operations.push(json!({
            "index": {
                "_index": index_name,
                "_id": record.id,
            }
        }));
        operations.push(serde_json::to_value(record)?);
    }
    to_ndjson(operations)
}

fn bulk_delete_payload(index_name: &str, ids: &[String]) -> Result<String, SearchError> {
    let operations = ids
        .iter()
        .map(|id| json!({"delete": {"_index": index_name, "_id": id}}))
        .collect();
    to_ndjson(operations)
}

/// `_bulk` answers 200 even when items fail; per-item errors other than a missing document
/// on delete are reported.
fn check_bulk_response(body: &Value) -> Result<(), SearchError> {
    if !body.get("errors").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(());
    }

    let failures = body
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|item| item.as_object()?.values().next())
        .filter(|outcome| outcome.get("error").is_some())
        .filter(|outcome| outcome.get("status").and_then(Value::as_u64) != Some(404))
        .count();

    if failures == 0 {
        return Ok(());
    }
    Err(backend_error(format!("{failures} bulk items failed")))
}

fn parse_scan_page(page: &Value) -> (Vec<IndexEntry>, Option<Value>) {
    let hits = page
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let entries = hits
        .iter()
        .map(|raw| {
            let source = raw.get("_source").unwrap_or(&Value::Null);
            let text = |key: &str| {
                source
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let id = source
                .get("id")
                .or_else(|| raw.get("_id"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            IndexEntry {
                id,
                organization: text("organization"),
                file: text("file"),
            }
        })
        .collect();

    let next = hits.last().and_then(|raw| raw.get("sort")).cloned();
    (entries, next)
}
