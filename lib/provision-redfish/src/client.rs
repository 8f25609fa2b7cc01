//! HTTP client for the BMC Redfish API

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const SYSTEM_PATH: &str = "/redfish/v1/Systems/1";
pub const RESET_PATH: &str = "/redfish/v1/Systems/1/Actions/ComputerSystem.Reset";

/// Virtual media resource of a slot
pub fn virtual_media_path(slot: &str) -> String {
    format!("/redfish/v1/Managers/1/VirtualMedia/{}", slot)
}

/// InsertMedia action of a slot
pub fn insert_media_path(slot: &str) -> String {
    format!("{}/Actions/VirtualMedia.InsertMedia", virtual_media_path(slot))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("{method} {url} failed: {message}")]
    Request {
        method: String,
        url: String,
        message: String,
    },

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("invalid BMC client configuration: {0}")]
    Config(String),
}

/// A single Redfish call, relative to the BMC endpoint
#[derive(Clone, Debug, PartialEq)]
pub struct RedfishRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RedfishRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PATCH,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Sends Redfish calls to one BMC
#[async_trait]
pub trait RedfishTransport: Send + Sync {
    /// Send a request and return the JSON body (`Null` when empty)
    async fn send(&self, request: RedfishRequest) -> Result<Value, TransportError>;
}

/// BMC login, sent with every request
#[derive(Clone)]
pub struct BmcCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BmcCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BmcCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Redfish transport over HTTP(S) with Basic authentication.
///
/// No session is opened: the Authorization header is rebuilt from the
/// credentials on every request.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    credentials: BmcCredentials,
}

impl HttpTransport {
    /// Create a transport for `endpoint`, optionally accepting self-signed certificates
    pub fn new(
        endpoint: &str,
        credentials: BmcCredentials,
        insecure: bool,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

#[async_trait]
impl RedfishTransport for HttpTransport {
    async fn send(&self, request: RedfishRequest) -> Result<Value, TransportError> {
        let url = self.url(&request.path);
        let method = request.method.to_string();
        debug!("{} {}", method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| TransportError::Request {
            method: method.clone(),
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| TransportError::Request {
            method: method.clone(),
            url: url.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                method,
                url,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        debug!("{} {} -> {}", method, url, status);

        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            // Actions frequently answer with an empty or non-JSON body
            Err(_) if request.method != Method::GET => Ok(Value::Null),
            Err(e) => Err(TransportError::InvalidResponse {
                url,
                message: e.to_string(),
            }),
        }
    }
}
