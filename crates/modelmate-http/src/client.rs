//! HTTP client and replayable request/response types.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use modelmate_core::error::{ApiError, Error, InvalidInputError, TransportError};
use modelmate_core::{AccessToken, ApiUrl, Result};

use crate::config::ClientConfig;

pub use reqwest::Method;

/// A request description that can be sent any number of times.
///
/// The gateway replays a request after refreshing the access token, so the
/// request is kept as data rather than as a consumed builder.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize and attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| InvalidInputError::Other {
            message: format!("request body is not JSON-serializable: {}", e),
        })?;
        Ok(self.with_body(value))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: u16,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw response body.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(bytes).map_err(|e| {
            TransportError::Decode {
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    api_url: ApiUrl,
    request_timeout: Option<Duration>,
}

impl HttpClient {
    /// Create a new client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| TransportError::Http {
            message: format!("failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            request_timeout: config.request_timeout,
        })
    }

    /// Returns the API base URL this client is configured for.
    pub fn api_url(&self) -> &ApiUrl {
        &self.api_url
    }

    /// Send a request, attaching `token` as a bearer credential when given.
    ///
    /// Non-2xx responses become [`Error::Api`] with the decoded error body.
    #[instrument(skip(self, request, token), fields(method = %request.method, path = %request.path))]
    pub async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<ApiResponse> {
        let url = self.api_url.endpoint(&request.path);
        debug!(authenticated = token.is_some(), "HTTP request");

        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token.as_str());
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;

        self.handle_response(response).await
    }

    /// Handle a response, reading the body or the error.
    async fn handle_response(&self, response: reqwest::Response) -> Result<ApiResponse> {
        let status = response.status();
        trace!(status = %status, "HTTP response");

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?
            .to_vec();

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            let error_body = serde_json::from_slice::<Value>(&body).ok();
            Err(Error::Api(ApiError::new(status.as_u16(), error_body)))
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        let err = if err.is_timeout() {
            TransportError::Timeout {
                duration_ms: self
                    .request_timeout
                    .map(|t| t.as_millis() as u64)
                    .unwrap_or_default(),
            }
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            TransportError::Decode {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        };
        Error::Transport(err)
    }
}
