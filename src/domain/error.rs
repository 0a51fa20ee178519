use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Human readable detail without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Validation { message } => message,
        }
    }
}
