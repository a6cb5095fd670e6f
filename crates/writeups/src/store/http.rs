//! Hosted table store over the PostgREST HTTP interface.
//!
//! Talks to `{base_url}/rest/v1/{table}` using the anon/service key as both
//! the `apikey` header and a bearer token. Error bodies of the form
//! `{"code": ..., "message": ...}` are classified into [`FailureKind`]s.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{sort_newest_first, FailureKind, RemoteStore, StoreError, StoredWriteup};
use crate::error::{Error, Result};
use crate::record::{Difficulty, NewWriteup, Writeup, WriteupPatch};

/// Connection settings for [`HttpStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStoreConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub base_url: String,
    /// API key sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    /// Table name.
    pub table: String,
    /// Request timeout.
    pub timeout: Duration,
}

/// A write-up table behind a PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    endpoint: String,
}

/// A row as PostgREST returns it. Nullable columns are optional here.
///
/// `created_at` is required: it is the sort key of the collection.
#[derive(Debug, Deserialize)]
struct Row {
    id: String,
    title: String,
    description: Option<String>,
    category: String,
    difficulty: Difficulty,
    platform: String,
    date: NaiveDate,
    tags: Option<Vec<String>>,
    content: String,
    published: bool,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<Row> for StoredWriteup {
    fn from(row: Row) -> Self {
        Self {
            writeup: Writeup {
                id: row.id,
                title: row.title,
                description: row.description.unwrap_or_default(),
                category: row.category,
                difficulty: row.difficulty,
                platform: row.platform,
                date: row.date,
                tags: row.tags.unwrap_or_default(),
                content: row.content,
                published: row.published,
                slug: row.slug,
            },
            created_at: row.created_at,
            updated_at: row.updated_at.unwrap_or(row.created_at),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct PatchBody<'a> {
    #[serde(flatten)]
    patch: &'a WriteupPatch,
    updated_at: DateTime<Utc>,
}

impl HttpStore {
    /// Create a client for the configured table.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: &HttpStoreConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let invalid = |_| Error::ConfigValidation {
                message: "store.api_key contains characters not allowed in a header".to_string(),
            };
            headers.insert("apikey", HeaderValue::from_str(api_key).map_err(invalid)?);
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(invalid)?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::ConfigValidation {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let endpoint = format!(
            "{}/rest/v1/{}",
            config.base_url.trim_end_matches('/'),
            config.table
        );

        Ok(Self { client, endpoint })
    }

    /// The table endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn rows(response: reqwest::Result<Response>) -> std::result::Result<Vec<Row>, StoreError> {
        let response = check(response.map_err(transport_error)?).await?;
        response.json().await.map_err(transport_error)
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn list(&self) -> std::result::Result<Vec<StoredWriteup>, StoreError> {
        debug!(endpoint = %self.endpoint, "Listing writeups");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await;

        let mut rows: Vec<StoredWriteup> = Self::rows(response)
            .await?
            .into_iter()
            .map(StoredWriteup::from)
            .collect();
        sort_newest_first(&mut rows);
        trace!(count = rows.len(), "Listed writeups");
        Ok(rows)
    }

    async fn insert(&self, record: &NewWriteup) -> std::result::Result<StoredWriteup, StoreError> {
        debug!(title = %record.title, "Inserting writeup");
        let response = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "return=representation")
            .json(&[record])
            .send()
            .await;

        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .map(StoredWriteup::from)
            .ok_or_else(|| StoreError::other("insert returned no rows"))
    }

    async fn update_partial(
        &self,
        id: &str,
        patch: &WriteupPatch,
    ) -> std::result::Result<StoredWriteup, StoreError> {
        debug!(id, "Updating writeup");
        let body = PatchBody {
            patch,
            updated_at: Utc::now(),
        };
        let response = self
            .client
            .patch(&self.endpoint)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await;

        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .map(StoredWriteup::from)
            .ok_or_else(|| StoreError::other(format!("no writeup with id {id}")))
    }

    async fn delete(&self, id: &str) -> std::result::Result<(), StoreError> {
        debug!(id, "Deleting writeup");
        let response = self
            .client
            .delete(&self.endpoint)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await
            .map_err(transport_error)?;
        check(response).await?;
        Ok(())
    }
}

async fn check(response: Response) -> std::result::Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

fn api_error(status: StatusCode, body: &str) -> StoreError {
    let (code, message) = match serde_json::from_str::<ApiError>(body) {
        Ok(ApiError { code, message }) => (code, message.unwrap_or_default()),
        Err(_) => (None, body.trim().to_string()),
    };

    let mut kind = FailureKind::classify(code.as_deref(), &message);
    if kind == FailureKind::Other
        && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
    {
        kind = FailureKind::AccessDenied;
    }

    let message = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        message
    };
    StoreError::new(kind, message)
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::other(err.to_string())
}
