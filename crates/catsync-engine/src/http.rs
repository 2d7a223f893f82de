//! HTTP implementation of [`PlatformClient`].
//!
//! Speaks a JSON REST dialect: resource collections under
//! `{api_url}/{resource_type}`, key lookups under `.../key/{key}`, and the
//! durable key-value store under `{api_url}/custom-objects`. Every call
//! carries a bearer token and a per-request timeout, so each remote
//! operation is independently retryable by the engine.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use catsync_types::action::UpdateAction;
use catsync_types::error::ClientError;
use catsync_types::resource::{
    PageCursor, Resource, ResourceDraft, ResourceKey, ResourceType, Version,
};

use crate::client::{CustomObject, PlatformClient, QueryFilter, ResourcePage};

const ERROR_BODY_LIMIT: usize = 512;

/// One platform instance reached over HTTP.
pub struct HttpPlatformClient {
    http: reqwest::Client,
    api_url: String,
    auth_token: String,
}

impl HttpPlatformClient {
    /// Build a client for one instance.
    ///
    /// # Errors
    ///
    /// Returns a `Config` [`ClientError`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(
        api_url: impl Into<String>,
        auth_token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::config("HTTP_CLIENT", e.to_string()))?;
        let api_url = api_url.into();
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_owned(),
            auth_token: auth_token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.api_url)
    }

    async fn read_body<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::internal("DECODE_BODY", e.to_string()))
    }
}

fn transport_error(err: &reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::transient_network("TIMEOUT", err.to_string())
    } else if err.is_connect() {
        ClientError::transient_network("CONNECT", err.to_string())
    } else {
        ClientError::internal("TRANSPORT", err.to_string())
    }
}

fn classify_status(
    status: StatusCode,
    message: String,
    retry_after_ms: Option<u64>,
) -> ClientError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ClientError::auth("UNAUTHORIZED", message)
        }
        StatusCode::CONFLICT => ClientError::version_conflict("CONCURRENT_MODIFICATION", message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ClientError::validation("INVALID_REQUEST", message)
        }
        StatusCode::TOO_MANY_REQUESTS => {
            ClientError::rate_limit("RATE_LIMITED", message, retry_after_ms)
        }
        status if status.is_server_error() => {
            ClientError::transient_network("SERVER_ERROR", message)
        }
        status => ClientError::internal("UNEXPECTED_STATUS", format!("{status}: {message}")),
    }
}

async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let retry_after_ms = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(|seconds| seconds * 1_000);
    let mut message = response.text().await.unwrap_or_default();
    if message.is_empty() {
        message = status.to_string();
    }
    if message.len() > ERROR_BODY_LIMIT {
        let mut end = ERROR_BODY_LIMIT;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    classify_status(status, message, retry_after_ms)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageBody {
    items: Vec<Resource>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    version: u64,
    actions: &'a [UpdateAction],
}

#[derive(Debug, Deserialize)]
struct CustomObjectBody {
    value: serde_json::Value,
    version: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetCustomObjectBody<'a> {
    value: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VersionBody {
    version: u64,
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn fetch_page(
        &self,
        resource_type: &ResourceType,
        filter: &QueryFilter,
        cursor: Option<&PageCursor>,
    ) -> Result<ResourcePage, ClientError> {
        let mut query: Vec<(&str, String)> = vec![
            ("limit", filter.page_size.to_string()),
            ("sort", "lastModified asc".to_owned()),
        ];
        if let Some(since) = filter.modified_since {
            query.push(("modifiedSince", since.to_rfc3339()));
        }
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.as_str().to_owned()));
        }

        let response = self
            .http
            .get(self.url(resource_type.as_str()))
            .bearer_auth(&self.auth_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let body: PageBody = Self::read_body(response).await?;
        Ok(ResourcePage {
            items: body.items,
            next_cursor: body.next_cursor.map(PageCursor::new),
        })
    }

    async fn fetch_by_key(
        &self,
        resource_type: &ResourceType,
        key: &ResourceKey,
    ) -> Result<Option<Resource>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("{resource_type}/key/{key}")))
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::read_body(response).await?))
    }

    async fn apply_update(
        &self,
        resource_type: &ResourceType,
        key: &ResourceKey,
        expected_version: Version,
        actions: &[UpdateAction],
    ) -> Result<Resource, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("{resource_type}/key/{key}")))
            .bearer_auth(&self.auth_token)
            .json(&UpdateBody {
                version: expected_version.value(),
                actions,
            })
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        Self::read_body(response).await
    }

    async fn create(
        &self,
        resource_type: &ResourceType,
        draft: &ResourceDraft,
    ) -> Result<Resource, ClientError> {
        let response = self
            .http
            .post(self.url(resource_type.as_str()))
            .bearer_auth(&self.auth_token)
            .json(draft)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        Self::read_body(response).await
    }

    async fn get_custom_object(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Option<CustomObject>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("custom-objects/{container}/{key}")))
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: CustomObjectBody = Self::read_body(response).await?;
        Ok(Some(CustomObject {
            container: container.to_owned(),
            key: key.to_owned(),
            value: body.value,
            version: body.version,
        }))
    }

    async fn set_custom_object(
        &self,
        container: &str,
        key: &str,
        value: &serde_json::Value,
        expected_version: Option<u64>,
    ) -> Result<u64, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("custom-objects/{container}/{key}")))
            .bearer_auth(&self.auth_token)
            .json(&SetCustomObjectBody {
                value,
                expected_version,
            })
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let body: VersionBody = Self::read_body(response).await?;
        Ok(body.version)
    }
}
