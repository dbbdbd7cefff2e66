use thiserror::Error;

/// Rule violations raised by the domain layer itself, independent of any
/// transport. Story body bounds are the only domain-level validation today;
/// identifier shape failures carry their own typed error
/// ([`crate::domain::assets::IdentifierError`]).
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
}
