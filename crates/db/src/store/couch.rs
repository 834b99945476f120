//! CouchDB HTTP implementation of [`DocumentStore`].
//!
//! Talks to the CouchDB REST API with [`reqwest`]. Document and attachment
//! paths are built segment by segment so ids and attachment names are
//! percent-encoded.

use std::time::Duration;

use reqwest::{header, Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    strip_meta, AttachmentData, DocumentStore, IndexQuery, IndexResult, IndexRow, MultiDocRow,
    Reduce, StoreError,
};
use crate::config::StoreConfig;
use crate::indexes::{design_documents, WikiIndex};

/// HTTP client for a single CouchDB server.
#[derive(Debug, Clone)]
pub struct CouchStore {
    client: reqwest::Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

/// Body of a successful document write.
#[derive(Debug, Deserialize)]
struct WriteResponse {
    rev: String,
}

/// Body of a CouchDB error response.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
    #[serde(default)]
    total_rows: Option<usize>,
    #[serde(default)]
    rows: Vec<ViewRow>,
}

#[derive(Debug, Deserialize)]
struct ViewRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    key: Value,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct AllDocsResponse {
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    key: String,
    #[serde(default)]
    value: Option<AllDocsValue>,
    #[serde(default)]
    doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AllDocsValue {
    rev: String,
    #[serde(default)]
    deleted: Option<bool>,
}

impl CouchStore {
    /// Build a store client from configuration.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| StoreError::Configuration(format!("invalid COUCHDB_URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Configuration(format!(
                "COUCHDB_URL {} cannot be used as a base URL",
                config.url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    // ---- private helpers ----

    /// `{base}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Configuration("base URL cannot hold a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    /// Map a non-2xx response onto [`StoreError`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let reason = if body.reason.is_empty() {
            body.error
        } else {
            body.reason
        };
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::NotFound(reason),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => StoreError::Conflict(reason),
            _ => StoreError::Backend {
                status: status.as_u16(),
                reason,
            },
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn write_rev(response: reqwest::Response) -> Result<String, StoreError> {
        Ok(Self::parse_response::<WriteResponse>(response).await?.rev)
    }

    /// Current revision of a design document, if it exists.
    async fn design_doc_rev(&self, db: &str, ddoc: &str) -> Result<Option<String>, StoreError> {
        let url = self.url(&[db, "_design", ddoc])?;
        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = Self::parse_response(response).await?;
        Ok(body.get("_rev").and_then(Value::as_str).map(str::to_string))
    }
}

/// Query-string parameters for a view request.
fn view_params(query: &IndexQuery) -> Result<Vec<(&'static str, String)>, StoreError> {
    let mut params = Vec::new();
    if let Some(key) = &query.key {
        params.push(("key", serde_json::to_string(key)?));
    }
    if let Some(start) = &query.start_key {
        params.push(("startkey", serde_json::to_string(start)?));
    }
    if let Some(end) = &query.end_key {
        params.push(("endkey", serde_json::to_string(end)?));
    }
    if query.descending {
        params.push(("descending", "true".into()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    if query.skip > 0 {
        params.push(("skip", query.skip.to_string()));
    }
    match query.reduce {
        Reduce::None => params.push(("reduce", "false".into())),
        Reduce::Count => params.push(("reduce", "true".into())),
        Reduce::Grouped { level: None } => {
            params.push(("reduce", "true".into()));
            params.push(("group", "true".into()));
        }
        Reduce::Grouped { level: Some(level) } => {
            params.push(("reduce", "true".into()));
            params.push(("group_level", level.to_string()));
        }
    }
    Ok(params)
}

impl DocumentStore for CouchStore {
    async fn put(
        &self,
        db: &str,
        id: &str,
        doc: &Value,
        rev: Option<&str>,
    ) -> Result<String, StoreError> {
        let mut body = strip_meta(doc.clone());
        if let (Some(rev), Some(obj)) = (rev, body.as_object_mut()) {
            obj.insert("_rev".into(), json!(rev));
        }
        let url = self.url(&[db, id])?;
        let response = self.request(Method::PUT, url).json(&body).send().await?;
        Self::write_rev(response).await
    }

    async fn get(&self, db: &str, id: &str) -> Result<(Value, String), StoreError> {
        let url = self.url(&[db, id])?;
        let response = self.request(Method::GET, url).send().await?;
        let body: Value = Self::parse_response(response).await?;
        let rev = body
            .get("_rev")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Backend {
                status: 200,
                reason: format!("document {id} has no _rev"),
            })?;
        Ok((strip_meta(body), rev))
    }

    async fn delete(&self, db: &str, id: &str, rev: &str) -> Result<String, StoreError> {
        let url = self.url(&[db, id])?;
        let response = self
            .request(Method::DELETE, url)
            .query(&[("rev", rev)])
            .send()
            .await?;
        Self::write_rev(response).await
    }

    async fn copy(
        &self,
        db: &str,
        from_id: &str,
        from_rev: &str,
        to_id: &str,
    ) -> Result<String, StoreError> {
        let method = Method::from_bytes(b"COPY")
            .map_err(|e| StoreError::Configuration(format!("COPY method: {e}")))?;
        let url = self.url(&[db, from_id])?;
        let response = self
            .request(method, url)
            .query(&[("rev", from_rev)])
            .header("Destination", to_id)
            .send()
            .await?;
        Self::write_rev(response).await
    }

    async fn query_index(
        &self,
        db: &str,
        index: WikiIndex,
        query: &IndexQuery,
    ) -> Result<IndexResult, StoreError> {
        let url = self.url(&[db, "_design", index.design_doc(), "_view", index.view_name()])?;
        let response = self
            .request(Method::GET, url)
            .query(&view_params(query)?)
            .send()
            .await?;
        let body: ViewResponse = Self::parse_response(response).await?;

        let rows: Vec<IndexRow> = body
            .rows
            .into_iter()
            .map(|row| IndexRow {
                id: row.id,
                key: row.key,
                value: row.value,
            })
            .collect();
        let total_rows = body.total_rows.unwrap_or(rows.len());
        Ok(IndexResult { total_rows, rows })
    }

    async fn put_attachment(
        &self,
        db: &str,
        id: &str,
        rev: &str,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, StoreError> {
        let url = self.url(&[db, id, name])?;
        let response = self
            .request(Method::PUT, url)
            .query(&[("rev", rev)])
            .header(header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;
        Self::write_rev(response).await
    }

    async fn get_attachment(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
        name: &str,
    ) -> Result<AttachmentData, StoreError> {
        let url = self.url(&[db, id, name])?;
        let mut builder = self.request(Method::GET, url);
        if let Some(rev) = rev {
            builder = builder.query(&[("rev", rev)]);
        }
        let response = Self::ensure_success(builder.send().await?).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = response.bytes().await?.to_vec();
        Ok(AttachmentData { content_type, data })
    }

    async fn delete_attachment(
        &self,
        db: &str,
        id: &str,
        rev: &str,
        name: &str,
    ) -> Result<String, StoreError> {
        let url = self.url(&[db, id, name])?;
        let response = self
            .request(Method::DELETE, url)
            .query(&[("rev", rev)])
            .send()
            .await?;
        Self::write_rev(response).await
    }

    async fn get_multiple(&self, db: &str, ids: &[String]) -> Result<Vec<MultiDocRow>, StoreError> {
        let url = self.url(&[db, "_all_docs"])?;
        let response = self
            .request(Method::POST, url)
            .query(&[("include_docs", "true")])
            .json(&json!({ "keys": ids }))
            .send()
            .await?;
        let body: AllDocsResponse = Self::parse_response(response).await?;

        Ok(body
            .rows
            .into_iter()
            .map(|row| {
                let live = row.value.filter(|v| !v.deleted.unwrap_or(false));
                match (live, row.doc) {
                    (Some(value), Some(doc)) if !doc.is_null() => MultiDocRow {
                        id: row.key,
                        rev: Some(value.rev),
                        doc: Some(strip_meta(doc)),
                    },
                    _ => MultiDocRow {
                        id: row.key,
                        rev: None,
                        doc: None,
                    },
                }
            })
            .collect())
    }

    async fn create_database(&self, db: &str) -> Result<(), StoreError> {
        let url = self.url(&[db])?;
        let response = self.request(Method::PUT, url).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn delete_database(&self, db: &str) -> Result<(), StoreError> {
        let url = self.url(&[db])?;
        let response = self.request(Method::DELETE, url).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn install_indexes(&self, db: &str) -> Result<(), StoreError> {
        for (ddoc, mut body) in design_documents() {
            if let (Some(rev), Some(obj)) =
                (self.design_doc_rev(db, ddoc).await?, body.as_object_mut())
            {
                obj.insert("_rev".into(), json!(rev));
            }
            let url = self.url(&[db, "_design", ddoc])?;
            let response = self.request(Method::PUT, url).json(&body).send().await?;
            Self::ensure_success(response).await?;
            tracing::debug!(db, design_doc = ddoc, "Installed index design document");
        }
        Ok(())
    }
}
