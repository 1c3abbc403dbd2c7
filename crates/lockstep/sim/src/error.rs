use lockstep_master::MasterError;
use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Master(#[from] MasterError),

    #[error("client {0} is not registered with the environment")]
    UnknownClient(String),
}
