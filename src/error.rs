use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PageliftError>;

/// What the remote service (or the path to it) reported when a job failed.
///
/// The split matters to wrapping layers that retry: some kinds are worth
/// another attempt, some never are. This crate itself performs exactly one
/// attempt per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// The service throttled the request.
    RateLimited,
    /// The credential was rejected.
    AuthRejected,
    /// The service could not fetch or render the target page.
    Unrenderable,
    /// The service itself is failing (5xx).
    Outage,
    /// The exchange never completed: connection, TLS, or timeout trouble.
    Transport,
    /// The service answered with something this client cannot interpret.
    Protocol,
}

impl ServiceErrorKind {
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ServiceErrorKind::RateLimited | ServiceErrorKind::Outage | ServiceErrorKind::Transport
        )
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceErrorKind::RateLimited => "rate limited",
            ServiceErrorKind::AuthRejected => "auth rejected",
            ServiceErrorKind::Unrenderable => "unrenderable",
            ServiceErrorKind::Outage => "service outage",
            ServiceErrorKind::Transport => "transport failure",
            ServiceErrorKind::Protocol => "protocol violation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PageliftError {
    /// No usable credential/endpoint at construction time. The client is
    /// never created.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A caller-supplied argument broke a stated constraint. Raised before
    /// any remote exchange, so no side effect has occurred.
    #[error("validation error: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The remote collaborator (or the transport to it) failed the job.
    #[error("service error ({kind}): {message}")]
    Service {
        kind: ServiceErrorKind,
        status: Option<u16>,
        message: String,
    },

    /// The calling context was cancelled while the exchange was in flight.
    #[error("operation cancelled")]
    Cancelled,
}

/* Constructors so call sites stay short */
impl PageliftError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        PageliftError::Configuration(msg.into())
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PageliftError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn service(kind: ServiceErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        PageliftError::Service {
            kind,
            status,
            message: message.into(),
        }
    }

    /// True for service errors a wrapping layer could reasonably retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PageliftError::Service { kind, .. } if kind.retryable())
    }
}

/* Conversions so `?` works smoothly at the transport */
impl From<reqwest::Error> for PageliftError {
    fn from(e: reqwest::Error) -> Self {
        PageliftError::Service {
            kind: ServiceErrorKind::Transport,
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(ServiceErrorKind::RateLimited.retryable());
        assert!(ServiceErrorKind::Outage.retryable());
        assert!(ServiceErrorKind::Transport.retryable());
        assert!(!ServiceErrorKind::AuthRejected.retryable());
        assert!(!ServiceErrorKind::Unrenderable.retryable());
        assert!(!ServiceErrorKind::Protocol.retryable());
    }

    #[test]
    fn only_service_errors_are_retryable() {
        let rate = PageliftError::service(ServiceErrorKind::RateLimited, Some(429), "slow down");
        assert!(rate.is_retryable());

        let auth = PageliftError::service(ServiceErrorKind::AuthRejected, Some(401), "bad key");
        assert!(!auth.is_retryable());

        assert!(!PageliftError::validation("url", "must not be empty").is_retryable());
        assert!(!PageliftError::Cancelled.is_retryable());
    }

    #[test]
    fn display_carries_detail() {
        let e = PageliftError::validation("formats", "unrecognized content format tag: bogus");
        assert_eq!(
            e.to_string(),
            "validation error: formats: unrecognized content format tag: bogus"
        );

        let e = PageliftError::service(ServiceErrorKind::RateLimited, Some(429), "try later");
        assert!(e.to_string().contains("rate limited"));
        assert!(e.to_string().contains("try later"));
    }
}
