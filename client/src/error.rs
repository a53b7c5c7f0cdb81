use vrl_common::validation::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// the request never produced a response
    #[error("request failed: {0}")]
    Transport(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {errors:?}")]
    Validation { errors: Vec<FieldError> },
    /// missing or rejected credentials, or a role that is not allowed
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Transport(_) => "transport",
            ClientError::NotFound(_) => "not found",
            ClientError::Validation { .. } => "validation",
            ClientError::Unauthorized(_) => "unauthorized",
            ClientError::Conflict(_) => "conflict",
            ClientError::UnexpectedStatus { .. } => "unexpected status",
            ClientError::Decode(_) => "decode",
        }
    }
}

/// For callers that prefer an empty value over an error, e.g. a page that
/// renders an empty list when the API is down.
pub trait ClientResultExt<T> {
    fn or_empty(self) -> T;
}

impl<T: Default> ClientResultExt<T> for Result<T, ClientError> {
    fn or_empty(self) -> T {
        self.unwrap_or_default()
    }
}
