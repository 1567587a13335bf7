//! A thin `reqwest` adapter that produces operations for the orchestrators.
//!
//! [`ApiClient`] does not retry. Its job is the boundary translation: every
//! transport failure and every non-2xx response becomes a [`TransportError`]
//! right where it is caught, and every success becomes a [`Response`] whose
//! payload has been taken out of a `{"data": ...}` envelope when present.

use crate::response::Envelope;
use crate::{Error, Response, Result, TransportError};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use reqwest::multipart::{Form, Part};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// HTTP client whose methods fit the operation contract directly.
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Examples
///
/// ```no_run
/// use steadycall::ApiClient;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), steadycall::Error> {
/// let client = ApiClient::builder()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .default_header("X-Client", "dashboard")?
///     .build()?;
///
/// match client.get::<serde_json::Value>("/orgs/7").await {
///     Ok(response) => println!("{}", response.data),
///     Err(err) => eprintln!("{err}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

/// A file to send as one part of a multipart upload.
///
/// The MIME type is checked on construction, so a malformed part fails
/// before any request is made instead of inside a retried operation.
#[derive(Debug, Clone)]
pub struct UploadFile {
    field: String,
    file_name: String,
    mime: String,
    bytes: Vec<u8>,
}

impl UploadFile {
    /// Creates a file part for the form field `field`.
    ///
    /// # Errors
    ///
    /// Returns an error if `mime` is not a valid MIME type.
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let mime = mime.into();
        Part::bytes(Vec::new())
            .mime_str(&mime)
            .map_err(|e| Error::ConfigurationError(format!("Invalid MIME type {mime:?}: {e}")))?;

        Ok(Self {
            field: field.into(),
            file_name: file_name.into(),
            mime,
            bytes: bytes.into(),
        })
    }

    /// Form field name, e.g. `"logo"`.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// File name reported to the server.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// MIME type, e.g. `"image/png"`.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// File contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl ApiClient {
    /// Creates a new [`ApiClientBuilder`].
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Sends one request and translates the outcome.
    pub async fn call<Req, Res>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Req>,
    ) -> std::result::Result<Response<Res>, TransportError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let mut request = self.request(method, path)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request).await
    }

    /// `GET path`. The path may carry a query string.
    pub async fn get<Res>(
        &self,
        path: impl AsRef<str>,
    ) -> std::result::Result<Response<Res>, TransportError>
    where
        Res: DeserializeOwned,
    {
        self.call::<(), Res>(Method::GET, path.as_ref(), None).await
    }

    /// `POST path` with a JSON body.
    pub async fn post<Req, Res>(
        &self,
        path: impl AsRef<str>,
        body: &Req,
    ) -> std::result::Result<Response<Res>, TransportError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.call(Method::POST, path.as_ref(), Some(body)).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put<Req, Res>(
        &self,
        path: impl AsRef<str>,
        body: &Req,
    ) -> std::result::Result<Response<Res>, TransportError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.call(Method::PUT, path.as_ref(), Some(body)).await
    }

    /// `PATCH path` with a JSON body.
    pub async fn patch<Req, Res>(
        &self,
        path: impl AsRef<str>,
        body: &Req,
    ) -> std::result::Result<Response<Res>, TransportError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.call(Method::PATCH, path.as_ref(), Some(body)).await
    }

    /// `DELETE path`.
    pub async fn delete<Res>(
        &self,
        path: impl AsRef<str>,
    ) -> std::result::Result<Response<Res>, TransportError>
    where
        Res: DeserializeOwned,
    {
        self.call::<(), Res>(Method::DELETE, path.as_ref(), None).await
    }

    /// `POST path` as `multipart/form-data` with one file part.
    pub async fn upload<Res>(
        &self,
        path: impl AsRef<str>,
        file: UploadFile,
    ) -> std::result::Result<Response<Res>, TransportError>
    where
        Res: DeserializeOwned,
    {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime)?;
        let form = Form::new().part(file.field, part);

        let request = self.request(Method::POST, path.as_ref())?.multipart(form);
        self.send(request).await
    }

    /// Resolves `path` below the base URL, keeping the base path prefix and
    /// any query string in `path`.
    fn resolve(&self, path: &str) -> std::result::Result<Url, url::ParseError> {
        self.inner.base_url.join(path.trim_start_matches('/'))
    }

    fn request(
        &self,
        method: Method,
        path: &str,
    ) -> std::result::Result<reqwest::RequestBuilder, TransportError> {
        let url = self.resolve(path).map_err(|e| {
            TransportError::default().with_message(format!("Invalid request path {path:?}: {e}"))
        })?;

        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        let mut request = self
            .inner
            .http_client
            .request(method, url)
            .headers(self.inner.default_headers.clone());
        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }
        Ok(request)
    }

    async fn send<Res>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<Response<Res>, TransportError>
    where
        Res: DeserializeOwned,
    {
        let start = Instant::now();
        let response = request.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let raw_body = response.text().await?;
        let latency = start.elapsed();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "Received HTTP response"
        );

        if !status.is_success() {
            if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    response = %raw_body,
                    "Server error (5xx)"
                );
            } else {
                tracing::debug!(
                    status = status.as_u16(),
                    response = %raw_body,
                    "Request rejected"
                );
            }
            return Err(TransportError::from_response(status, &headers, raw_body));
        }

        // 204 and friends: decode an empty body as JSON null.
        let decoded = if raw_body.trim().is_empty() {
            serde_json::from_str::<Envelope<Res>>("null")
        } else {
            serde_json::from_str::<Envelope<Res>>(&raw_body)
        };

        match decoded {
            Ok(envelope) => Ok(Response::new(
                envelope.into_inner(),
                raw_body,
                status,
                headers,
                latency,
            )),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %raw_body,
                    "Failed to deserialize response"
                );
                Err(TransportError::http(status)
                    .with_message(format!("Failed to deserialize response: {}", e)))
            }
        }
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl ApiClientBuilder {
    /// Creates a builder with no base URL, no default headers and no timeout.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Sets the base URL all paths are resolved against. A path prefix such
    /// as `/api/v1` is kept in front of every request path.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(url.as_ref())?;
        if url.cannot_be_a_base() {
            return Err(Error::ConfigurationError(format!(
                "Base URL cannot have paths joined to it: {url}"
            )));
        }
        // Without the trailing slash, `join` would replace the last segment.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        self.base_url = Some(url);
        Ok(self)
    }

    /// Adds a header sent with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets a per-request timeout. Timed out requests fail without a status
    /// and classify as network failures.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or the HTTP client could
    /// not be created.
    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;

        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                default_headers: self.default_headers,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
