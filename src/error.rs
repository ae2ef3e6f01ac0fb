use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Error taxonomy per the federation engine's error handling design: each
/// variant maps to a class of recoverable or fatal failure, and callers are
/// expected to match on it rather than stringly-typed messages.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate activity id, already-followed, etc. Treated as success by
    /// callers per the propagation rule.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Network, 5xx, resolver timeout. Retried by the inbox/outbox backoff
    /// policy, never surfaced as a hard failure to a local caller.
    #[error("transient error: {0}")]
    Transient(String),

    #[error("delivery queue full")]
    DeliveryQueueFull,

    /// Store corruption, migration failure, listener bind failure. Logged
    /// and the process exits; never caught and retried.
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn too_deep() -> Self {
        Error::Validation("resolver recursion depth exceeded".into())
    }

    pub fn blocked(host: &str) -> Self {
        Error::Forbidden(format!("host is blocked: {host}"))
    }

    pub fn bad_signature() -> Self {
        Error::Unauthorized("signature verification failed".into())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Error::Conflict(db_err.message().to_string());
            }
        }
        Error::Fatal(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transient(err.to_string())
    }
}

impl From<activitypub_federation::error::Error> for Error {
    fn from(err: activitypub_federation::error::Error) -> Self {
        use activitypub_federation::error::Error as FedError;
        match err {
            FedError::NotFound | FedError::ObjectDeleted => {
                Error::NotFound("activitypub object".into())
            }
            FedError::UrlVerificationError(reason) if reason.contains("blocked") => {
                Error::Forbidden(err.to_string())
            }
            FedError::UrlVerificationError(_) => Error::Validation(err.to_string()),
            FedError::ActivitySignatureInvalid
            | FedError::ActivityBodyDigestInvalid
            | FedError::WebfingerResolveFailed => Error::Unauthorized(err.to_string()),
            FedError::RequestLimit | FedError::ResponseBodyLimit => {
                Error::Transient(err.to_string())
            }
            FedError::Other(source) => Error::Other(source),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::OK,
            Error::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::DeliveryQueueFull => StatusCode::TOO_MANY_REQUESTS,
            Error::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
