//! Error taxonomy shared by the translation and speech capabilities.

use thiserror::Error;

/// Coarse failure category, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Unauthorized,
    RateLimited,
    BadRequest,
    NotFound,
    Unknown,
}

/// Failure of a translation or speech-synthesis call.
///
/// Every variant carries the human-readable message that ends up on the
/// affected sentence pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Missing or rejected API key (HTTP 401).
    #[error("{0}")]
    Unauthorized(String),

    /// Too many requests (HTTP 429).
    #[error("{0}")]
    RateLimited(String),

    /// The request was rejected as malformed (HTTP 400).  Translation only.
    #[error("{0}")]
    BadRequest(String),

    /// The model or endpoint does not exist (HTTP 404).  Translation only.
    #[error("{0}")]
    NotFound(String),

    /// Transport failure, unexpected status or unusable response body.
    #[error("{0}")]
    Unknown(String),
}

impl ServiceError {
    pub fn kind(&self) -> ServiceErrorKind {
        match self {
            ServiceError::Unauthorized(_) => ServiceErrorKind::Unauthorized,
            ServiceError::RateLimited(_) => ServiceErrorKind::RateLimited,
            ServiceError::BadRequest(_) => ServiceErrorKind::BadRequest,
            ServiceError::NotFound(_) => ServiceErrorKind::NotFound,
            ServiceError::Unknown(_) => ServiceErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ServiceError::Unauthorized(msg)
            | ServiceError::RateLimited(msg)
            | ServiceError::BadRequest(msg)
            | ServiceError::NotFound(msg)
            | ServiceError::Unknown(msg) => msg,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServiceError::Unknown("Request timed out".into())
        } else {
            ServiceError::Unknown(format!("HTTP request failed: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        let err = ServiceError::RateLimited("slow down".into());
        assert_eq!(err.to_string(), "slow down");
        assert_eq!(err.message(), "slow down");
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            ServiceError::Unauthorized(String::new()).kind(),
            ServiceErrorKind::Unauthorized
        );
        assert_eq!(
            ServiceError::NotFound(String::new()).kind(),
            ServiceErrorKind::NotFound
        );
        assert_eq!(
            ServiceError::Unknown(String::new()).kind(),
            ServiceErrorKind::Unknown
        );
    }
}
