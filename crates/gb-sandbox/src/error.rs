use gb_core::GameBoxError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SandboxError {
    #[error("container \"{0}\" is not available")]
    ContainerMissing(String),
    #[error("frame {0} does not exist")]
    UnknownFrame(u64),
    #[error("listener {0} does not exist")]
    UnknownListener(u64),
    #[error("no document is mounted")]
    NotMounted,
    #[error("document environment failure: {0}")]
    Environment(String),
}

impl SandboxError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ContainerMissing(_) => "SANDBOX_CONTAINER_MISSING",
            Self::UnknownFrame(_) => "SANDBOX_UNKNOWN_FRAME",
            Self::UnknownListener(_) => "SANDBOX_UNKNOWN_LISTENER",
            Self::NotMounted => "SANDBOX_NOT_MOUNTED",
            Self::Environment(_) => "SANDBOX_ENVIRONMENT",
        }
    }
}

impl From<SandboxError> for GameBoxError {
    fn from(error: SandboxError) -> Self {
        GameBoxError::new(error.code(), error.to_string())
    }
}
