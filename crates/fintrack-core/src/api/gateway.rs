//! The single path through which backend calls are made.
//!
//! Every request reads the active credential from a [`CredentialSource`] at send
//! time. A 401/403 for a request that carried the session credential asks the
//! source to drop that credential before the error is returned.

use std::sync::Arc;

use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};

use crate::auth::{AuthScheme, Credential};
use crate::config::Config;

use super::{ApiError, ErrorKind};

/// Supplies the active credential and hears about its rejection.
pub trait CredentialSource: Send + Sync {
    fn credential(&self) -> Option<Credential>;

    /// The backend refused `credential`. Implementations must ignore a
    /// credential that is no longer the active one.
    fn reject(&self, credential: &Credential);
}

/// Which credential, if any, a request carries.
#[derive(Debug, Clone, Default)]
pub enum RequestAuth {
    /// Whatever the session holds at send time.
    #[default]
    Session,
    /// No Authorization header (login, registration).
    Anonymous,
    /// A specific credential that is not (yet) the session's. Rejection does not
    /// touch the session.
    Explicit(Credential),
}

/// An outbound request, relative to the configured API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    query: Vec<(String, String)>,
    auth: RequestAuth,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
            auth: RequestAuth::Session,
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

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Validation(format!("Request body could not be encoded: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = RequestAuth::Anonymous;
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.auth = RequestAuth::Explicit(credential);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Authenticated request gateway.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    base_url: String,
    scheme: AuthScheme,
    credentials: Arc<dyn CredentialSource>,
}

impl Gateway {
    pub fn new(config: &Config, credentials: Arc<dyn CredentialSource>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            scheme: config.auth_scheme,
            credentials,
        })
    }

    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and decode a 2xx body as `T`. An empty body decodes as `null`.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let url = self.url(&request.path);
        let credential = match &request.auth {
            RequestAuth::Session => self.credentials.credential(),
            RequestAuth::Anonymous => None,
            RequestAuth::Explicit(credential) => Some(credential.clone()),
        };
        let session_credential = matches!(request.auth, RequestAuth::Session);

        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(ref credential) = credential {
            let value = match header::HeaderValue::from_str(&self.scheme.header_value(credential)) {
                Ok(value) => value,
                Err(_) => {
                    warn!(url = %url, "Credential cannot be sent as a header, discarding it");
                    if session_credential {
                        self.credentials.reject(credential);
                    }
                    return Err(ApiError::Authentication(
                        super::error::SESSION_REJECTED_MESSAGE.to_string(),
                    ));
                }
            };
            builder = builder.header(header::AUTHORIZATION, value);
        }

        debug!(
            method = %request.method,
            url = %url,
            authenticated = credential.is_some(),
            "Sending request"
        );

        let response = builder.send().await.map_err(|e| {
            warn!(method = %request.method, url = %url, error = %e, "Request failed without a response");
            ApiError::Network(e)
        })?;

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                // A status arrived, so this is not a connectivity failure
                warn!(url = %url, status = status.as_u16(), error = %e, "Failed to read response body");
                if status.is_success() {
                    return Err(ApiError::malformed_response());
                }
                String::new()
            }
        };

        if !status.is_success() {
            let err = ApiError::from_status(status, &text);
            match err.kind() {
                ErrorKind::Authentication => {
                    warn!(method = %request.method, url = %url, status = status.as_u16(), "Credential rejected");
                    if session_credential {
                        if let Some(ref credential) = credential {
                            self.credentials.reject(credential);
                        }
                    }
                }
                _ => {
                    error!(
                        method = %request.method,
                        url = %url,
                        status = status.as_u16(),
                        body = %ApiError::truncate_body(&text),
                        "Request failed"
                    );
                }
            }
            return Err(err);
        }

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| {
            error!(
                url = %url,
                error = %e,
                body = %ApiError::truncate_body(&text),
                "Failed to parse JSON response"
            );
            ApiError::malformed_response()
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }
}
