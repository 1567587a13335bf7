//! Failure taxonomy.

use crate::TransportError;
use std::fmt;

/// The fixed set of failure classes every [`TransportError`] maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClassification {
    /// No HTTP status: connection failure, DNS failure or timeout.
    Network,
    /// `400` or `422`: the server rejected the input.
    Validation,
    /// `401`.
    Unauthorized,
    /// `403`.
    Forbidden,
    /// `404`.
    NotFound,
    /// `429`.
    RateLimited,
    /// Any `5xx`.
    ServerError,
    /// Everything else.
    Unknown,
}

/// Maps a transport error onto its classification. First match wins.
///
/// ```
/// use steadycall::{classify, ErrorClassification, TransportError};
/// use http::StatusCode;
///
/// assert_eq!(classify(&TransportError::network("reset")), ErrorClassification::Network);
/// assert_eq!(
///     classify(&TransportError::http(StatusCode::UNPROCESSABLE_ENTITY)),
///     ErrorClassification::Validation
/// );
/// ```
pub fn classify(error: &TransportError) -> ErrorClassification {
    let Some(status) = error.status() else {
        return ErrorClassification::Network;
    };

    match status.as_u16() {
        400 | 422 => ErrorClassification::Validation,
        401 => ErrorClassification::Unauthorized,
        403 => ErrorClassification::Forbidden,
        404 => ErrorClassification::NotFound,
        429 => ErrorClassification::RateLimited,
        code if code >= 500 => ErrorClassification::ServerError,
        _ => ErrorClassification::Unknown,
    }
}

impl ErrorClassification {
    /// `true` for failures expected to succeed on an unchanged retry.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorClassification::Network
                | ErrorClassification::RateLimited
                | ErrorClassification::ServerError
        )
    }

    /// User-facing copy for this class, when there is something better to
    /// say than the caller's fallback message.
    pub fn user_message(self) -> Option<&'static str> {
        match self {
            ErrorClassification::Network => {
                Some("Network error. Check your connection and try again.")
            }
            ErrorClassification::Unauthorized => {
                Some("Your session has expired. Please sign in again.")
            }
            ErrorClassification::Forbidden => {
                Some("You do not have permission to perform this action.")
            }
            ErrorClassification::RateLimited => {
                Some("Too many requests. Please wait a moment and try again.")
            }
            ErrorClassification::ServerError => {
                Some("Something went wrong on our side. Please try again later.")
            }
            ErrorClassification::Validation
            | ErrorClassification::NotFound
            | ErrorClassification::Unknown => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorClassification::Network => "network",
            ErrorClassification::Validation => "validation",
            ErrorClassification::Unauthorized => "unauthorized",
            ErrorClassification::Forbidden => "forbidden",
            ErrorClassification::NotFound => "not_found",
            ErrorClassification::RateLimited => "rate_limited",
            ErrorClassification::ServerError => "server_error",
            ErrorClassification::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn class_of(code: u16) -> ErrorClassification {
        classify(&TransportError::http(StatusCode::from_u16(code).unwrap()))
    }

    #[test]
    fn status_rules() {
        assert_eq!(class_of(400), ErrorClassification::Validation);
        assert_eq!(class_of(422), ErrorClassification::Validation);
        assert_eq!(class_of(401), ErrorClassification::Unauthorized);
        assert_eq!(class_of(403), ErrorClassification::Forbidden);
        assert_eq!(class_of(404), ErrorClassification::NotFound);
        assert_eq!(class_of(429), ErrorClassification::RateLimited);
        assert_eq!(class_of(500), ErrorClassification::ServerError);
        assert_eq!(class_of(503), ErrorClassification::ServerError);
        assert_eq!(class_of(409), ErrorClassification::Unknown);
        assert_eq!(class_of(413), ErrorClassification::Unknown);
        assert_eq!(class_of(302), ErrorClassification::Unknown);
    }

    #[test]
    fn missing_status_is_network() {
        let err = TransportError::network("timed out").with_field_error("email", "ignored");
        assert_eq!(classify(&err), ErrorClassification::Network);
    }

    #[test]
    fn only_transient_classes_retry() {
        let retryable: Vec<_> = [
            ErrorClassification::Network,
            ErrorClassification::Validation,
            ErrorClassification::Unauthorized,
            ErrorClassification::Forbidden,
            ErrorClassification::NotFound,
            ErrorClassification::RateLimited,
            ErrorClassification::ServerError,
            ErrorClassification::Unknown,
        ]
        .into_iter()
        .filter(|c| c.is_retryable())
        .collect();

        assert_eq!(
            retryable,
            vec![
                ErrorClassification::Network,
                ErrorClassification::RateLimited,
                ErrorClassification::ServerError
            ]
        );
    }

    #[test]
    fn fallback_classes_have_no_copy() {
        assert!(ErrorClassification::NotFound.user_message().is_none());
        assert!(ErrorClassification::Unknown.user_message().is_none());
        assert!(ErrorClassification::ServerError.user_message().is_some());
        assert_eq!(ErrorClassification::RateLimited.to_string(), "rate_limited");
    }
}
