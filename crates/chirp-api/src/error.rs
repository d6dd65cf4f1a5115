use chirp_db::StoreError;
use chirp_types::api::Reply;
use thiserror::Error;
use tracing::error;

/// Request-level failures, each with its envelope code. Business
/// failures stay values all the way to the envelope; only `Internal`
/// carries detail, and that detail is logged, never sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or empty required field. 400.
    #[error("{0}")]
    Validation(String),
    /// Referenced user/post/edge does not exist. 404.
    #[error("{0}")]
    NotFound(String),
    /// Bad token or insufficient rights. 403.
    #[error("{0}")]
    Forbidden(String),
    /// Anything unexpected, storage failures included. 500.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Map an expected absence to a specific 404 message; any other
    /// store failure stays internal.
    pub fn or_not_found(e: StoreError, message: &str) -> Self {
        if e.is_not_found() {
            Self::NotFound(message.into())
        } else {
            Self::Internal(e.into())
        }
    }

    pub fn into_reply(self) -> Reply {
        match self {
            Self::Validation(message) => Reply::error(400, message),
            Self::NotFound(message) => Reply::error(404, message),
            Self::Forbidden(message) => Reply::error(403, message),
            Self::Internal(e) => {
                error!("internal error: {e:#}");
                Reply::error(500, "Internal error")
            }
        }
    }
}

/// A store error that reaches a handler unmapped is by definition
/// unexpected; expected absences are translated at the call site via
/// [`ApiError::or_not_found`].
impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.into())
    }
}
