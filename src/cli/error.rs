//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Manifest { .. } => crate::exitcode::DATAERR,
                InfraError::Application(ApplicationError::Config { .. }) => {
                    crate::exitcode::CONFIG
                }
                InfraError::Application(_) => crate::exitcode::SOFTWARE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CliError::Usage("no manifest".into()), crate::exitcode::USAGE)]
    #[case(
        CliError::Infra(InfraError::manifest("nav.toml", "bad")),
        crate::exitcode::DATAERR
    )]
    #[case(
        CliError::from(ApplicationError::Config { message: "bad".into() }),
        crate::exitcode::CONFIG
    )]
    #[case(
        CliError::from(ApplicationError::Dialog { message: "closed".into() }),
        crate::exitcode::SOFTWARE
    )]
    fn given_error_when_mapping_then_sysexits_code(#[case] error: CliError, #[case] code: i32) {
        assert_eq!(error.exit_code(), code);
    }
}
