//! HTTP gateway to the remote chunk store.
//!
//! The [`RemoteStore`] trait is the seam between the [`DocumentManager`]
//! and the network; [`HttpGateway`] is the production implementation on top
//! of `reqwest`. Tests substitute a `wiremock` server behind the real
//! gateway.
//!
//! # Endpoints
//!
//! | Operation | Request | Path |
//! |-----------|---------|------|
//! | list | `GET` `?limit=&filter=` | `{base}{prefix}/documents` |
//! | remove | `POST {"source"}` | `{base}{prefix}/remove` |
//! | clear | `POST` | `{base}{prefix}/clear` |
//! | stats | `GET` | `{base}{prefix}/stats` |
//! | upload | `POST` multipart | `{base}/rabbithole/batch` |
//!
//! Every path below the prefix is configurable (see
//! [`EndpointsConfig`](crate::config::EndpointsConfig)).
//!
//! # Errors
//!
//! HTTP 401 and 403 map to [`ApiError::AccessDenied`]; other non-2xx
//! statuses to [`ApiError::Status`]. A 2xx body that is not JSON is
//! [`ApiError::Decode`]. Individual list items are decoded leniently: a
//! missing or mistyped field takes its default instead of failing the list.
//!
//! [`DocumentManager`]: crate::manager::DocumentManager

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rabbit_docs_core::models::{ChunkRecord, UNKNOWN_SOURCE};
use rabbit_docs_core::stats::SizeDistribution;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;

/// Message shown when the backend refuses the caller's credentials.
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied: administrator permissions are required";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach the document service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Access denied: administrator permissions are required (HTTP {status})")]
    AccessDenied { status: u16 },
    #[error("document service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response from document service: {0}")]
    Decode(String),
    #[error("{message}")]
    Rejected { message: String },
    #[error("failed to read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, ApiError::AccessDenied { .. })
    }

    /// Text for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::AccessDenied { .. } => ACCESS_DENIED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════════════════

/// Decoded `GET documents` response.
///
/// The endpoint's own `stats` summary is not decoded; every figure it
/// carries is recomputed from `documents` by
/// [`LibraryStats`](rabbit_docs_core::stats::LibraryStats).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListResponse {
    pub success: bool,
    pub documents: Vec<ChunkRecord>,
    /// Error text on a non-success read.
    pub message: Option<String>,
}

/// Decoded `remove` / `clear` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MutationResponse {
    pub success: bool,
    pub message: Option<String>,
    pub deleted_chunks: Option<u64>,
}

/// Per-source figures inside the `GET stats` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceStats {
    pub chunks: u64,
    pub characters: u64,
    /// Unix timestamp of the newest chunk.
    pub upload_date: f64,
}

/// Decoded `GET stats` response.
///
/// `last_update` and `first_update` are display strings formatted by the
/// server (`"%d/%m/%Y %H:%M"`). Its `"Never"` placeholder decodes as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerStats {
    pub total_documents: u64,
    pub total_chunks: u64,
    pub total_characters: u64,
    pub sources: BTreeMap<String, SourceStats>,
    pub chunk_size_distribution: SizeDistribution,
    pub estimated_memory_mb: f64,
    #[serde(deserialize_with = "update_label")]
    pub last_update: Option<String>,
    #[serde(deserialize_with = "update_label")]
    pub first_update: Option<String>,
}

/// Accept the server's date label, a raw Unix timestamp, `null`, or
/// `"Never"`.
fn update_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let label = match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => n
            .as_f64()
            .filter(|t| *t > 0.0)
            .and_then(|t| chrono::DateTime::from_timestamp(t as i64, 0))
            .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string()),
        _ => None,
    };
    Ok(label.filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("never")))
}

#[derive(Debug, Deserialize)]
struct StatsEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    stats: ServerStats,
}

/// A batch upload: files plus the chunking parameters the ingester uses.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub files: Vec<PathBuf>,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub metadata: Value,
}

/// Per-file acknowledgement from the batch upload endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResponse {
    pub accepted: Vec<String>,
}

/// Decode one list item, defaulting any malformed field.
pub fn decode_chunk(item: &Value) -> ChunkRecord {
    let source = item
        .get("source")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_SOURCE)
        .to_string();

    let size_bytes = item
        .get("page_content_length")
        .and_then(as_u64_lenient)
        .or_else(|| {
            item.get("page_content")
                .and_then(Value::as_str)
                .map(|s| s.chars().count() as u64)
        })
        .unwrap_or(0);

    let preview = ["preview", "content_preview"]
        .iter()
        .filter_map(|k| item.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string);

    ChunkRecord {
        id: item.get("id").and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }),
        source,
        chunk_index: item.get("chunk_index").and_then(as_i64_lenient),
        total_chunks: item.get("total_chunks").and_then(as_i64_lenient),
        size_bytes,
        preview,
        observed_at: item.get("when").and_then(as_f64_lenient).unwrap_or(0.0),
    }
}

fn as_i64_lenient(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64_lenient(v: &Value) -> Option<u64> {
    as_i64_lenient(v).and_then(|n| u64::try_from(n).ok())
}

fn as_f64_lenient(v: &Value) -> Option<f64> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Decode a full list response body.
pub fn decode_list(body: &Value) -> ListResponse {
    let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
    let documents = body
        .get("documents")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(decode_chunk).collect())
        .unwrap_or_default();
    let message = ["error", "message"]
        .iter()
        .filter_map(|k| body.get(*k).and_then(Value::as_str))
        .next()
        .map(str::to_string);

    ListResponse {
        success,
        documents,
        message,
    }
}

/// Decode a `GET stats` body, turning `success: false` into
/// [`ApiError::Rejected`].
pub fn decode_stats(body: Value) -> Result<ServerStats, ApiError> {
    let envelope: StatsEnvelope =
        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    if !envelope.success {
        return Err(ApiError::Rejected {
            message: envelope
                .error
                .unwrap_or_else(|| "stats request was not successful".to_string()),
        });
    }
    Ok(envelope.stats)
}

// ═══════════════════════════════════════════════════════════════════════
// RemoteStore trait
// ═══════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_documents(&self, filter: Option<&str>) -> Result<ListResponse, ApiError>;
    async fn remove(&self, source: &str) -> Result<MutationResponse, ApiError>;
    async fn clear(&self) -> Result<MutationResponse, ApiError>;
    async fn stats(&self) -> Result<ServerStats, ApiError>;
    async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, ApiError>;
}

// ═══════════════════════════════════════════════════════════════════════
// HttpGateway
// ═══════════════════════════════════════════════════════════════════════

pub struct HttpGateway {
    client: reqwest::Client,
    api_root: String,
    base: String,
    documents_path: String,
    remove_path: String,
    clear_path: String,
    stats_path: String,
    upload_path: String,
    list_limit: u32,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.server.timeout_secs))
            .build()?;

        let base = config.server.base_url.trim_end_matches('/').to_string();
        let prefix = config.server.api_prefix.trim_matches('/');
        let api_root = if prefix.is_empty() {
            base.clone()
        } else {
            format!("{}/{}", base, prefix)
        };
        let endpoints = &config.server.endpoints;

        Ok(Self {
            client,
            api_root,
            base,
            documents_path: endpoints.documents.trim_matches('/').to_string(),
            remove_path: endpoints.remove.trim_matches('/').to_string(),
            clear_path: endpoints.clear.trim_matches('/').to_string(),
            stats_path: endpoints.stats.trim_matches('/').to_string(),
            upload_path: config.upload.endpoint.trim_matches('/').to_string(),
            list_limit: config.server.list_limit,
            token: config.token(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = self.authorize(builder).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(status = status.as_u16(), "document service denied access");
            return Err(ApiError::AccessDenied {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "document service returned an error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteStore for HttpGateway {
    async fn list_documents(&self, filter: Option<&str>) -> Result<ListResponse, ApiError> {
        let url = self.endpoint(&self.documents_path);
        tracing::debug!(%url, ?filter, "listing documents");

        let mut query = vec![("limit", self.list_limit.to_string())];
        if let Some(f) = filter.filter(|f| !f.is_empty()) {
            query.push(("filter", f.to_string()));
        }

        let body = self.send(self.client.get(&url).query(&query)).await?;
        let list = decode_list(&body);
        tracing::debug!(chunks = list.documents.len(), success = list.success, "list response");
        Ok(list)
    }

    async fn remove(&self, source: &str) -> Result<MutationResponse, ApiError> {
        let url = self.endpoint(&self.remove_path);
        tracing::debug!(%url, source, "removing document");

        let body = serde_json::json!({ "source": source });
        let value = self.send(self.client.post(&url).json(&body)).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn clear(&self) -> Result<MutationResponse, ApiError> {
        let url = self.endpoint(&self.clear_path);
        tracing::debug!(%url, "clearing all documents");

        let value = self.send(self.client.post(&url)).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn stats(&self) -> Result<ServerStats, ApiError> {
        let url = self.endpoint(&self.stats_path);
        tracing::debug!(%url, "fetching server stats");

        let value = self.send(self.client.get(&url)).await?;
        decode_stats(value)
    }

    async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, ApiError> {
        let url = format!("{}/{}", self.base, self.upload_path);
        tracing::debug!(%url, files = request.files.len(), "uploading batch");

        let mut form = reqwest::multipart::Form::new()
            .text("chunk_size", request.chunk_size.to_string())
            .text("chunk_overlap", request.chunk_overlap.to_string())
            .text("metadata", request.metadata.to_string());

        for path in &request.files {
            let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::File {
                path: path.display().to_string(),
                source,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            form = form.part("files", reqwest::multipart::Part::bytes(bytes).file_name(name));
        }

        let value = self.send(self.client.post(&url).multipart(form)).await?;
        let accepted = match &value {
            Value::Object(map) => map.keys().cloned().collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(|i| i.get("filename").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        Ok(UploadResponse { accepted })
    }
}
