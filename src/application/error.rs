//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Failure reported by a contributor from one of its async sources or hooks.
#[derive(Error, Debug)]
pub enum ContributorError {
    #[error("source failed: {message}")]
    Source { message: String },

    #[error("rejected: {message}")]
    Rejected { message: String },

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ContributorError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Result type for contributor operations.
pub type ContributorResult<T> = Result<T, ContributorError>;

/// Application errors wrap domain errors and add contributor context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("contributor '{name}' failed: {source}")]
    Contributor {
        name: String,
        #[source]
        source: ContributorError,
    },

    #[error("dialog failed: {message}")]
    Dialog { message: String },

    #[error("config error: {message}")]
    Config { message: String },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
