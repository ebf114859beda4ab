use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] strikepin_core::ValidationError),

    #[error("invalid input: {0}")]
    Input(String),

    #[error(transparent)]
    RateLimited(#[from] strikepin_core::ResolveError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<strikepin_core::FetchError> for CliError {
    fn from(error: strikepin_core::FetchError) -> Self {
        Self::Input(error.to_string())
    }
}

impl From<strikepin_core::CalculationError> for CliError {
    fn from(error: strikepin_core::CalculationError) -> Self {
        Self::Input(error.to_string())
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Input(_) => 2,
            Self::RateLimited(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
