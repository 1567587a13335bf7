//! Error types.
//!
//! [`TransportError`] is the one shape every failed network call is translated
//! into before it reaches the retry executors, the classifier or the call
//! orchestrators. [`Error`] covers the remaining failures of this crate, which
//! are all configuration problems detected before any request is sent.

use crate::rate_limit::RateLimitInfo;
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Server-supplied validation messages, keyed by field name.
pub type FieldErrorList = BTreeMap<String, Vec<String>>;

/// The failure value produced by a network call.
///
/// A missing [`status`](TransportError::status) means the request never got an
/// HTTP answer (connection refused, DNS failure, timeout). Everything else is
/// the translation of a non-2xx response.
///
/// # Examples
///
/// ```
/// use steadycall::TransportError;
/// use http::StatusCode;
///
/// let err = TransportError::http(StatusCode::UNPROCESSABLE_ENTITY)
///     .with_message("Invalid input")
///     .with_field_error("email", "invalid");
///
/// assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
/// assert_eq!(err.field_errors()["email"], vec!["invalid".to_string()]);
/// ```
#[derive(thiserror::Error, Debug, Clone, Default)]
#[error("{}", summarize(.status, .message))]
pub struct TransportError {
    status: Option<StatusCode>,
    message: Option<String>,
    field_errors: FieldErrorList,
    raw_body: Option<String>,
    rate_limit: Option<RateLimitInfo>,
    #[source]
    source: Option<Arc<reqwest::Error>>,
}

fn summarize(status: &Option<StatusCode>, message: &Option<String>) -> String {
    match (status, message) {
        (Some(status), Some(message)) => format!("HTTP error {}: {}", status, message),
        (Some(status), None) => format!("HTTP error {}", status),
        (None, Some(message)) => format!("Network error: {}", message),
        (None, None) => "Network error".to_string(),
    }
}

impl TransportError {
    /// A failure without an HTTP status: the request never got an answer.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// A failure carrying the given HTTP status and nothing else.
    pub fn http(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Translates a non-2xx response into a `TransportError`.
    ///
    /// The body is inspected for the usual JSON error shapes: a message under
    /// `message`, `error` or `detail`, and field errors under `errors` or
    /// `fieldErrors`, where each field maps to either a string or a list of
    /// strings. Bodies that are not JSON are kept only as the raw body.
    pub fn from_response(status: StatusCode, headers: &HeaderMap, body: impl Into<String>) -> Self {
        let raw_body = body.into();

        let mut err = Self::http(status);
        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(&raw_body) {
            err.message = ["message", "error", "detail"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_str))
                .map(str::to_string);

            if let Some(Value::Object(fields)) =
                object.get("errors").or_else(|| object.get("fieldErrors"))
            {
                for (field, messages) in fields {
                    let messages = match messages {
                        Value::String(message) => vec![message.clone()],
                        Value::Array(items) => items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect(),
                        _ => continue,
                    };
                    if !messages.is_empty() {
                        err.field_errors.insert(field.clone(), messages);
                    }
                }
            }
        }

        let info = RateLimitInfo::from_headers(headers);
        if info.is_rate_limited() {
            err.rate_limit = Some(info);
        }

        if !raw_body.is_empty() {
            err.raw_body = Some(raw_body);
        }
        err
    }

    /// Sets the human-readable message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Appends one validation message for `field`.
    pub fn with_field_error(
        mut self,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Attaches parsed rate limit headers.
    pub fn with_rate_limit(mut self, info: RateLimitInfo) -> Self {
        self.rate_limit = Some(info);
        self
    }

    /// The HTTP status, if the request got an answer at all.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// The server or transport supplied message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Validation messages keyed by field name. Empty for most errors.
    pub fn field_errors(&self) -> &FieldErrorList {
        &self.field_errors
    }

    /// The raw response body, kept for debugging.
    pub fn raw_body(&self) -> Option<&str> {
        self.raw_body.as_deref()
    }

    /// Rate limit information parsed from the response headers.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        self.rate_limit.as_ref()
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            status: err.status(),
            message: Some(err.to_string()),
            source: Some(Arc::new(err)),
            ..Default::default()
        }
    }
}

/// Errors raised while configuring this crate's types.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid configuration was provided, such as a bad header value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A specialized `Result` type for configuration steps.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn parses_message_and_field_lists() {
        let body = concat!(
            r#"{"message":"Invalid input","#,
            r#""errors":{"email":["invalid","taken"],"name":"required"}}"#
        );
        let err = TransportError::from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &HeaderMap::new(),
            body,
        );

        assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
        assert_eq!(err.message(), Some("Invalid input"));
        assert_eq!(err.field_errors()["email"], vec!["invalid", "taken"]);
        assert_eq!(err.field_errors()["name"], vec!["required"]);
        assert_eq!(err.raw_body(), Some(body));
    }

    #[test]
    fn accepts_field_errors_key_and_detail() {
        let body = r#"{"detail":"nope","fieldErrors":{"logo":["too large"]}}"#;
        let err = TransportError::from_response(StatusCode::BAD_REQUEST, &HeaderMap::new(), body);

        assert_eq!(err.message(), Some("nope"));
        assert_eq!(err.field_errors()["logo"], vec!["too large"]);
    }

    #[test]
    fn plain_text_body_is_kept_raw() {
        let err = TransportError::from_response(
            StatusCode::BAD_GATEWAY,
            &HeaderMap::new(),
            "upstream down",
        );

        assert!(err.message().is_none());
        assert!(err.field_errors().is_empty());
        assert_eq!(err.raw_body(), Some("upstream down"));
    }

    #[test]
    fn rate_limit_headers_are_attached() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("7"));
        let err = TransportError::from_response(StatusCode::TOO_MANY_REQUESTS, &headers, "");

        let info = err.rate_limit().expect("rate limit info");
        assert_eq!(info.retry_after, Some(std::time::Duration::from_secs(7)));
        assert!(err.raw_body().is_none());
    }

    #[test]
    fn display_covers_both_shapes() {
        assert_eq!(
            TransportError::network("connection reset").to_string(),
            "Network error: connection reset"
        );
        assert_eq!(
            TransportError::http(StatusCode::NOT_FOUND).to_string(),
            "HTTP error 404 Not Found"
        );
    }
}
