//! Authenticated HTTP request helper
//!
//! Every request first makes sure the stored access token is usable (refreshing
//! it if needed), attaches it as a bearer token, and normalizes failures into
//! [`ClientError::Api`] / [`ClientError::Unauthorized`] carrying the server's
//! message. Nothing is retried.

use crate::error::ClientError;
use crate::refresher::TokenRefresher;
use crate::tokens::TokenStore;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Parsed response body
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ApiBody {
    /// Body as JSON; text bodies are parsed when they happen to be JSON
    pub fn into_value(self) -> Value {
        match self {
            ApiBody::Json(value) => value,
            ApiBody::Text(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            ApiBody::Empty => Value::Null,
        }
    }

    /// Deserialize the body, unwrapping `{data: ...}` or `{<key>: ...}`
    /// envelopes when present
    pub fn into_json<T: DeserializeOwned>(self, key: Option<&str>) -> Result<T, ClientError> {
        let value = unwrap_envelope(self.into_value(), key);
        serde_json::from_value(value).map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }
}

/// Strip a response envelope. Bare payloads pass through untouched.
pub fn unwrap_envelope(value: Value, key: Option<&str>) -> Value {
    match value {
        Value::Object(mut map) => {
            if let Some(key) = key {
                if let Some(inner) = map.remove(key) {
                    return inner;
                }
            }
            if let Some(inner) = map.remove("data") {
                return match (inner, key) {
                    (Value::Object(mut nested), Some(key)) if nested.contains_key(key) => {
                        nested.remove(key).unwrap_or(Value::Null)
                    }
                    (inner, _) => inner,
                };
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Path of a single resource, with `id` percent-encoded as one segment
pub fn resource_path(collection: &str, id: &str) -> Result<String, ClientError> {
    if id.trim().is_empty() || id == "." || id == ".." {
        return Err(ClientError::Validation(format!("invalid {collection} id: {id:?}")));
    }

    let mut url = Url::parse("http://localhost/")?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Validation(format!("invalid {collection} id: {id:?}")))?
        .clear()
        .push(collection)
        .push(id);
    Ok(url.path().to_string())
}

/// Extract a human-readable message from an error response
fn error_message(status: StatusCode, body: &ApiBody) -> String {
    let from_json = |value: &Value| {
        ["message", "error", "detail"]
            .iter()
            .find_map(|field| value.get(field).and_then(Value::as_str))
            .map(str::to_string)
    };

    match body {
        ApiBody::Json(value) => from_json(value),
        ApiBody::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    }
    .unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
    })
}

/// Thin REST client; clones share the HTTP pool and token state
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
    refresher: TokenRefresher,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        refresher: TokenRefresher,
    ) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            tokens: refresher.tokens().clone(),
            refresher,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Issue a request against `endpoint` (relative to the base URL)
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<ApiBody, ClientError> {
        if !self.refresher.ensure_valid_token().await {
            debug!(endpoint, "no valid token, sending request without refresh");
        }

        let url = self.url_for(endpoint);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json");

        match self.tokens.access_token() {
            Ok(Some(token)) => {
                request = request.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read access token"),
        }

        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!(%method, endpoint, "api request");
        let response = request.send().await?;
        let status = response.status();
        let body = read_body(response).await?;

        if status == StatusCode::UNAUTHORIZED {
            let message = error_message(status, &body);
            warn!(endpoint, %message, "request unauthorized");
            return Err(ClientError::Unauthorized(message));
        }

        if !status.is_success() {
            let message = error_message(status, &body);
            warn!(endpoint, status = status.as_u16(), %message, "request failed");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        key: Option<&str>,
    ) -> Result<T, ClientError> {
        self.request(Method::GET, endpoint, None)
            .await?
            .into_json(key)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
        key: Option<&str>,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, endpoint, Some(body))
            .await?
            .into_json(key)
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
        key: Option<&str>,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, endpoint, Some(body))
            .await?
            .into_json(key)
    }

    pub async fn delete(&self, endpoint: &str) -> Result<(), ClientError> {
        self.request(Method::DELETE, endpoint, None).await?;
        Ok(())
    }
}

async fn read_body(response: reqwest::Response) -> Result<ApiBody, ClientError> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"));

    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(ApiBody::Empty);
    }

    if is_json {
        match serde_json::from_str(&text) {
            Ok(value) => return Ok(ApiBody::Json(value)),
            Err(e) => warn!(error = %e, "response declared JSON but did not parse"),
        }
    }

    Ok(ApiBody::Text(text))
}
