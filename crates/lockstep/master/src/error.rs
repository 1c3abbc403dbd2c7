use lockstep_store::StoreError;
use thiserror::Error;

pub type MasterResult<T> = Result<T, MasterError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MasterError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("private patch error: {0}")]
    Patch(String),
}

impl MasterError {
    pub fn kind(&self) -> &'static str {
        match self {
            MasterError::Store(err) => err.kind(),
            MasterError::Patch(_) => "STORE_BACKEND_FAILURE",
        }
    }
}

impl From<serde_json::Error> for MasterError {
    fn from(err: serde_json::Error) -> Self {
        MasterError::Patch(err.to_string())
    }
}
