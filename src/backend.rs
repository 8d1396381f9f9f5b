//! Indexing backend abstraction and its HTTP implementation.
//!
//! The orchestrator only talks to the [`IndexBackend`] trait. [`HttpBackend`]
//! is the production implementation; tests substitute scripted in-memory
//! backends through the same seam.
//!
//! # Endpoints
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | `POST` | `/api/createIndex` | none | `{ "indexName": "..." }` |
//! | `POST` | `/api/updateIndex` | multipart `file` + `indexName` | empty |
//! | `POST` | `/api/queryIndex` | `{ "indexName", "question" }` | `{ "answer": "..." }` |
//!
//! Any non-2xx status is a failure of that call. Requests are never retried
//! here: none of the three calls is idempotent, and a failed index creation is
//! retried by the next upload instead.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::models::{CreateIndexResponse, QueryIndexRequest, QueryIndexResponse, SelectedFile};

/// The three operations the chat front end needs from an indexing service.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Create a fresh, empty index and return its identifier.
    async fn create_index(&self) -> Result<String, BackendError>;

    /// Add a document to an existing index.
    async fn update_index(&self, index_name: &str, file: &SelectedFile) -> Result<(), BackendError>;

    /// Answer a question from the contents of an index.
    async fn query_index(&self, index_name: &str, question: &str) -> Result<String, BackendError>;
}

/// [`IndexBackend`] over HTTP with `reqwest`.
pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn send(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BackendError> {
        let response = request.send().await.map_err(|e| BackendError::Transport {
            endpoint: path.to_string(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                endpoint = path,
                status = status.as_u16(),
                body = %body,
                "backend rejected request"
            );
            return Err(BackendError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let bytes = response.bytes().await.map_err(|e| BackendError::Transport {
            endpoint: path.to_string(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl IndexBackend for HttpBackend {
    async fn create_index(&self) -> Result<String, BackendError> {
        let path = &self.config.create_index_path;
        let request = self
            .client
            .post(self.config.endpoint(path))
            .header("Content-Type", "application/json");

        let response = self.send(path, request).await?;
        let body: CreateIndexResponse = Self::decode(path, response).await?;
        Ok(body.index_name)
    }

    async fn update_index(
        &self,
        index_name: &str,
        file: &SelectedFile,
    ) -> Result<(), BackendError> {
        let path = &self.config.update_index_path;
        let form = Form::new()
            .part(
                "file",
                Part::bytes(file.bytes.clone()).file_name(file.name.clone()),
            )
            .text("indexName", index_name.to_string());

        let request = self
            .client
            .post(self.config.endpoint(path))
            .multipart(form);

        // The body of a successful ingestion is ignored, whatever it holds.
        self.send(path, request).await?;
        Ok(())
    }

    async fn query_index(&self, index_name: &str, question: &str) -> Result<String, BackendError> {
        let path = &self.config.query_index_path;
        let body = QueryIndexRequest {
            index_name: index_name.to_string(),
            question: question.to_string(),
        };
        let request = self.client.post(self.config.endpoint(path)).json(&body);

        let response = self.send(path, request).await?;
        let body: QueryIndexResponse = Self::decode(path, response).await?;
        Ok(body.answer)
    }
}
