//! HTTP client for the dummyapi.io-style user endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::model::{NewRecord, Record, RecordUpdate};
use crate::remote::{RecordStore, StoreError};

const APP_ID_HEADER: &str = "app-id";

/// Envelope for `GET /user`.
#[derive(Debug, Deserialize)]
struct Page {
    data: Vec<Record>,
}

/// Error body returned with non-2xx responses, e.g. `{"error":"RESOURCE_NOT_FOUND"}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct DummyApiStore {
    client: Client,
    base_url: String,
}

impl DummyApiStore {
    /// Build a client carrying the application id on every request
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            APP_ID_HEADER,
            HeaderValue::from_str(&config.app_id)
                .with_context(|| format!("invalid app_id: {}", config.app_id))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(format!("rolo/{}", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl RecordStore for DummyApiStore {
    async fn list(&self, limit: usize) -> Result<Vec<Record>, StoreError> {
        debug!(limit, "GET /user");
        let response = self
            .client
            .get(self.url("/user"))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(transport)?;
        let page: Page = decode(response).await?;
        Ok(page.data)
    }

    async fn get(&self, id: &str) -> Result<Record, StoreError> {
        debug!(id, "GET /user/{{id}}");
        let response = self
            .client
            .get(self.url(&format!("/user/{id}")))
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn create(&self, record: &NewRecord) -> Result<Record, StoreError> {
        debug!(email = %record.email, "POST /user/create");
        let response = self
            .client
            .post(self.url("/user/create"))
            .json(record)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn update(&self, id: &str, update: &RecordUpdate) -> Result<Record, StoreError> {
        debug!(id, "PUT /user/{{id}}");
        let response = self
            .client
            .put(self.url(&format!("/user/{id}")))
            .json(update)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        debug!(id, "DELETE /user/{{id}}");
        let response = self
            .client
            .delete(self.url(&format!("/user/{id}")))
            .send()
            .await
            .map_err(transport)?;
        check_status(response).await.map(|_| ())
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(remote_error(status, &body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let response = check_status(response).await?;
    let body = response.text().await.map_err(transport)?;
    serde_json::from_str(&body).map_err(|err| StoreError::Decode(err.to_string()))
}

/// Prefer the server's `error` field; fall back to the status line.
fn remote_error(status: StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
    StoreError::Remote {
        status: status.as_u16(),
        message,
    }
}
