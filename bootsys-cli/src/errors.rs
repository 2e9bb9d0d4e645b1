use bootsys_core::PlatformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Usage(#[from] clap::Error),
}

impl CliError {
    /// Process exit status; help and version requests are not failures
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(e) if !e.use_stderr() => 0,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
