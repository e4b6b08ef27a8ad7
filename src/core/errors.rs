use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification tag carried by every [`ExchangeError`].
///
/// Retry policies match on this tag rather than on the error variant, so a
/// policy can be described as plain data (a set of kinds). `UnknownHost`,
/// `Socket` and `Timeout` refine `Io`: a policy listing `Io` also covers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureKind {
    Io,
    UnknownHost,
    Socket,
    Timeout,
    ServiceUnavailable,
    InternalServerError,
    ServerError,
    TooManyRequests,
    RateLimitExceeded,
    Authentication,
    Validation,
    Deserialization,
    Configuration,
    DeadlineExceeded,
    Other,
}

impl FailureKind {
    /// The broader kind this one refines, if any.
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::UnknownHost | Self::Socket | Self::Timeout => Some(Self::Io),
            _ => None,
        }
    }

    /// Whether `self` is `other` or one of its refinements.
    pub fn is_a(self, other: Self) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Io => "io",
            Self::UnknownHost => "unknown_host",
            Self::Socket => "socket",
            Self::Timeout => "timeout",
            Self::ServiceUnavailable => "service_unavailable",
            Self::InternalServerError => "internal_server_error",
            Self::ServerError => "server_error",
            Self::TooManyRequests => "too_many_requests",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::Authentication => "authentication",
            Self::Validation => "validation",
            Self::Deserialization => "deserialization",
            Self::Configuration => "configuration",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Network error ({kind}): {message}")]
    NetworkError { kind: FailureKind, message: String },

    #[error("Server error: HTTP {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("API error: {code} - {message}")]
    ApiError { code: i32, message: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Rate limit wait exceeded on '{limiter}' (max wait {max_wait:?})")]
    RateLimitExceeded { limiter: String, max_wait: Duration },

    #[error("Call deadline exceeded")]
    DeadlineExceeded,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ExchangeError {
    pub fn network(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::NetworkError {
            kind,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            500..=599 => Self::ServerError { status, message },
            401 | 403 => Self::AuthError(message),
            _ => Self::ApiError {
                code: i32::from(status),
                message,
            },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NetworkError { kind, .. } => *kind,
            Self::ServerError { status, .. } => match status {
                503 => FailureKind::ServiceUnavailable,
                500 => FailureKind::InternalServerError,
                _ => FailureKind::ServerError,
            },
            Self::ApiError { code, .. } => match code {
                429 | 418 => FailureKind::TooManyRequests,
                401 | 403 => FailureKind::Authentication,
                400..=499 => FailureKind::Validation,
                _ => FailureKind::Other,
            },
            Self::AuthError(_) => FailureKind::Authentication,
            Self::InvalidParameters(_) => FailureKind::Validation,
            Self::RateLimitExceeded { .. } => FailureKind::RateLimitExceeded,
            Self::DeadlineExceeded => FailureKind::DeadlineExceeded,
            Self::ConfigurationError(_) | Self::ConfigError(_) => FailureKind::Configuration,
            Self::SerializationError(_) | Self::DeserializationError(_) | Self::JsonError(_) => {
                FailureKind::Deserialization
            }
            Self::Other(_) => FailureKind::Other,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_connect() {
            if is_dns_failure(&err) {
                FailureKind::UnknownHost
            } else {
                FailureKind::Socket
            }
        } else if err.is_decode() {
            return Self::DeserializationError(err.to_string());
        } else if err.is_builder() {
            return Self::ConfigurationError(err.to_string());
        } else {
            FailureKind::Io
        };
        Self::network(kind, err.to_string())
    }
}

// reqwest does not expose resolver failures as a distinct flag, so walk the
// source chain looking for the resolver's wording.
fn is_dns_failure(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(err);
    while let Some(inner) = source {
        let text = inner.to_string().to_lowercase();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
        {
            return true;
        }
        source = inner.source();
    }
    false
}
