use thiserror::Error;

/// Errors raised while provisioning test infrastructure.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("mysql not ready after {attempts} attempts: {reason}")]
    NotReady { attempts: u32, reason: String },
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
