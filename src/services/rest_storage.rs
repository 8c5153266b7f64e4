//! Remote system of record speaking the PostgREST dialect.
//!
//! Row-level security on the server is expected to enforce ownership; the
//! owner filter is still sent so the query plan matches the local backend.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::services::storage::BookmarkRepository;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::StorageError;
use crate::types::session::Session;

/// Bookmark repository backed by a PostgREST-compatible HTTP API.
pub struct RestBookmarkRepository {
    client: Client,
    base_url: Url,
    api_key: String,
    table: String,
}

impl RestBookmarkRepository {
    /// `base_url` is the project root, e.g. `https://xyz.example.co`.
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self, StorageError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StorageError::InvalidResponse(format!("invalid base url {}: {}", base_url, e)))?;
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: api_key.to_string(),
            table: table.to_string(),
        })
    }

    fn table_url(&self) -> Result<Url, StorageError> {
        self.base_url
            .join(&format!("rest/v1/{}", self.table))
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))
    }

    pub(crate) fn select_url(&self, owner: &str) -> Result<Url, StorageError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("user_id", &format!("eq.{}", owner))
            .append_pair("order", "created_at.desc");
        Ok(url)
    }

    pub(crate) fn insert_url(&self) -> Result<Url, StorageError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut().append_pair("select", "*");
        Ok(url)
    }

    pub(crate) fn delete_url(&self, owner: &str, id: &str) -> Result<Url, StorageError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", id))
            .append_pair("user_id", &format!("eq.{}", owner));
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(session.access_token.expose())
    }

    async fn rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, StorageError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::InvalidResponse(format!("HTTP {}: {}", status, body)));
        }
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::NetworkError(e.to_string()))?;
        parse_rows(&body)
    }
}

pub(crate) fn parse_rows<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, StorageError> {
    serde_json::from_str(body).map_err(|e| StorageError::InvalidResponse(e.to_string()))
}

fn network_err(e: reqwest::Error) -> StorageError {
    StorageError::NetworkError(e.to_string())
}

#[async_trait]
impl BookmarkRepository for RestBookmarkRepository {
    async fn select(&self, session: &Session) -> Result<Vec<Bookmark>, StorageError> {
        let url = self.select_url(session.owner_id())?;
        let response = self
            .authorized(self.client.get(url), session)
            .send()
            .await
            .map_err(network_err)?;
        Self::rows(response).await
    }

    async fn insert(&self, session: &Session, record: NewBookmark) -> Result<Bookmark, StorageError> {
        let url = self.insert_url()?;
        let response = self
            .authorized(self.client.post(url), session)
            .header("Prefer", "return=representation")
            .json(&[record])
            .send()
            .await
            .map_err(network_err)?;

        Self::rows::<Bookmark>(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::InvalidResponse("insert returned no rows".to_string()))
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<(), StorageError> {
        let url = self.delete_url(session.owner_id(), id)?;
        let response = self
            .authorized(self.client.delete(url), session)
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(network_err)?;

        let deleted = Self::rows::<Bookmark>(response).await?;
        if deleted.is_empty() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
