//! Supabase (PostgREST) remote store implementation.
//!
//! Speaks the PostgREST row API: filtered `GET`s, bulk `POST` upserts with
//! `resolution=merge-duplicates`, filtered `DELETE`s. The table schema is
//! owned by the backend; this client only knows the four envelope columns.

use crate::error::{RemoteError, RemoteResult};
use crate::store::RemoteStore;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use classdesk_types::{OwnerId, SyncEnvelope};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Supabase connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project base URL (e.g. `https://abc.supabase.co`).
    pub base_url: String,
    /// The project's anon/service API key.
    pub api_key: String,
    /// Table holding the record-set rows.
    pub table: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            table: "record_sets".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Remote store backed by a Supabase project.
pub struct SupabaseStore {
    config: SupabaseConfig,
    client: Client,
    /// Per-session user JWT; the API key is used as bearer until one is set.
    access_token: Arc<RwLock<Option<String>>>,
}

impl SupabaseStore {
    /// Creates a new store from the given configuration.
    pub fn new(config: SupabaseConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config,
            client,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Sets (or clears) the signed-in user's access token.
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    fn rows_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table
        )
    }

    async fn auth_headers(&self) -> RemoteResult<HeaderMap> {
        let token = self.access_token.read().await;
        let bearer = token.as_deref().unwrap_or(&self.config.api_key);

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|e| RemoteError::Network(format!("invalid api key: {e}")))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {bearer}"))
                .map_err(|e| RemoteError::Network(format!("invalid access token: {e}")))?,
        );
        Ok(headers)
    }

    /// Maps a non-success response to the error taxonomy.
    async fn check(response: Response) -> RemoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::NotAuthenticated);
        }
        let message = response.text().await.unwrap_or_default();
        Err(RemoteError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    fn owner_filter(owner: OwnerId) -> (&'static str, String) {
        ("owner_id", format!("eq.{owner}"))
    }
}

#[async_trait]
impl RemoteStore for SupabaseStore {
    async fn upsert(&self, envelope: &SyncEnvelope) -> RemoteResult<()> {
        debug!("upserting {} for owner {}", envelope.data_key, envelope.owner_id);

        let response = self
            .client
            .post(self.rows_url())
            .headers(self.auth_headers().await?)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", "owner_id,data_key")])
            .json(&[envelope])
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_all(&self, owner: OwnerId) -> RemoteResult<Vec<SyncEnvelope>> {
        let response = self
            .client
            .get(self.rows_url())
            .headers(self.auth_headers().await?)
            .query(&[
                Self::owner_filter(owner),
                ("select", "owner_id,data_key,payload,updated_at".to_string()),
            ])
            .send()
            .await?;

        let rows = Self::check(response).await?.json().await?;
        Ok(rows)
    }

    async fn fetch_one(
        &self,
        owner: OwnerId,
        data_key: &str,
    ) -> RemoteResult<Option<SyncEnvelope>> {
        let response = self
            .client
            .get(self.rows_url())
            .headers(self.auth_headers().await?)
            .query(&[
                Self::owner_filter(owner),
                ("data_key", format!("eq.{data_key}")),
                ("select", "owner_id,data_key,payload,updated_at".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let mut rows: Vec<SyncEnvelope> = Self::check(response).await?.json().await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn delete_all(&self, owner: OwnerId) -> RemoteResult<()> {
        debug!("deleting all record sets for owner {}", owner);

        let response = self
            .client
            .delete(self.rows_url())
            .headers(self.auth_headers().await?)
            .query(&[Self::owner_filter(owner)])
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn changes_since(
        &self,
        owner: OwnerId,
        cursor: Option<DateTime<Utc>>,
    ) -> RemoteResult<Vec<SyncEnvelope>> {
        let mut query = vec![
            Self::owner_filter(owner),
            ("select", "owner_id,data_key,payload,updated_at".to_string()),
            ("order", "updated_at.asc".to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push((
                "updated_at",
                format!("gt.{}", cursor.to_rfc3339_opts(SecondsFormat::Micros, true)),
            ));
        }

        let response = self
            .client
            .get(self.rows_url())
            .headers(self.auth_headers().await?)
            .query(&query)
            .send()
            .await?;

        let rows = Self::check(response).await?.json().await?;
        Ok(rows)
    }
}
