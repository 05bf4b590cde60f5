#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::middleware::{BearerAuth, Middleware, RequestTrace, ResponseMeta, SessionExpiry};
use super::ClientError;
use crate::config::ClientConfig;
use crate::router::History;
use crate::schemas::ApiErrorBody;
use crate::session::SessionContext;

/// Pre-configured request dispatcher. Cheap to clone.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl HttpClient {
    /// Bare client with no middleware.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpClientBuild`] when the TLS backend cannot
    /// be initialized.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), middleware: Vec::new() })
    }

    /// Client with the standard chain: tracing, bearer token, 401 handling.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::new`].
    pub fn for_session(config: &ClientConfig, session: &SessionContext, history: &History) -> Result<Self, ClientError> {
        Ok(Self::new(config)?
            .with_middleware(RequestTrace)
            .with_middleware(BearerAuth::new(session.clone()))
            .with_middleware(SessionExpiry::new(session.clone(), history.clone())))
    }

    #[must_use]
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Dispatch through the middleware chain and classify the status.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Unauthorized`] on 401, after middleware ran
    /// - [`ClientError::Status`] on any other non-success status
    /// - [`ClientError::Http`] on transport failure or timeout
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let mut request = builder.build()?;
        for middleware in &self.middleware {
            middleware.on_request(&mut request)?;
        }

        let method = request.method().clone();
        let url = request.url().clone();
        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%method, %url, error = %e, "api transport failure");
                return Err(ClientError::Http(e));
            }
        };

        let meta = ResponseMeta { method, url, status: response.status() };
        for middleware in &self.middleware {
            middleware.on_response(&meta);
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = read_detail(response).await;
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized { detail });
        }
        Err(ClientError::Status { status: status.as_u16(), detail })
    }

    /// Send and decode a JSON body.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`]; additionally [`ClientError::Decode`] when
    /// the body does not match `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let text = self.send(builder).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send_json(self.request(Method::GET, path)).await
    }

    pub async fn get_json_with_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::GET, path).query(query)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::POST, path).json(body)).await
    }

    /// POST as `application/x-www-form-urlencoded`.
    pub async fn post_form<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::POST, path).form(body)).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send_json(self.request(Method::DELETE, path)).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Best-effort `detail` extraction from an error response.
async fn read_detail(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => Some(body.message()),
        Err(_) => Some(text),
    }
}
