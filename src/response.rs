//! Successful operation results.

use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// What an operation resolves to on success.
///
/// Operations handed to [`ApiCall`](crate::ApiCall) return
/// `Result<Response<T>, TransportError>`; the orchestrator keeps only
/// [`data`](Response::data).
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The payload.
    pub data: T,

    /// The HTTP status code.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The raw body, when the response came over the wire.
    pub raw_body: String,

    /// Time from sending the request to reading the body.
    pub latency: Duration,
}

impl<T> Response<T> {
    /// Creates a `Response` with every field given.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
    ) -> Self {
        Self {
            data,
            status,
            headers,
            raw_body,
            latency,
        }
    }

    /// A bare `200 OK` carrying `data`, for operations that do not talk HTTP
    /// directly.
    ///
    /// ```
    /// # use steadycall::Response;
    /// let response = Response::ok(42);
    /// assert_eq!(response.status.as_u16(), 200);
    /// assert_eq!(*response, 42);
    /// ```
    pub fn ok(data: T) -> Self {
        Self::new(data, String::new(), StatusCode::OK, HeaderMap::new(), Duration::ZERO)
    }

    /// Maps the payload, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
            raw_body: self.raw_body,
            latency: self.latency,
        }
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// A body that is either `{"data": T}` or a bare `T`.
///
/// The wrapped form is tried first, so an API that wraps payloads in a
/// `data` envelope and one that does not both decode to `T`.
///
/// ```
/// use steadycall::response::Envelope;
///
/// let wrapped: Envelope<Vec<u32>> = serde_json::from_str(r#"{"data":[1,2]}"#).unwrap();
/// let bare: Envelope<Vec<u32>> = serde_json::from_str("[1,2]").unwrap();
/// assert_eq!(wrapped.into_inner(), bare.into_inner());
/// ```
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    /// `{"data": ...}`.
    Wrapped {
        /// The payload inside the envelope.
        data: T,
    },
    /// Anything else that decodes as `T`.
    Bare(T),
}

impl<T> Envelope<T> {
    /// The payload, whichever form it arrived in.
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Logo {
        logo_url: String,
    }

    #[test]
    fn envelope_prefers_data_key() {
        let wrapped: Envelope<Logo> =
            serde_json::from_str(r#"{"data":{"logo_url":"https://cdn/x.png"}}"#).unwrap();
        assert_eq!(
            wrapped.into_inner(),
            Logo {
                logo_url: "https://cdn/x.png".into()
            }
        );
    }

    #[test]
    fn envelope_falls_back_to_bare() {
        let bare: Envelope<Logo> = serde_json::from_str(r#"{"logo_url":"a"}"#).unwrap();
        assert!(matches!(bare, Envelope::Bare(_)));
    }

    #[test]
    fn map_keeps_metadata() {
        let mut response = Response::ok(2);
        response.status = StatusCode::CREATED;

        let mapped = response.map(|n| n * 10);
        assert_eq!(mapped.data, 20);
        assert_eq!(mapped.status, StatusCode::CREATED);
    }
}
