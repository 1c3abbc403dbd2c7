use lockstep_types::Checksum;
use thiserror::Error;

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Why a forwarded action could not be reconciled. Local state is left as it
/// was in both cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("checksum mismatch after '{action}': master expects {expected}, local state hashes to {actual}")]
    Mismatch {
        action: String,
        expected: Checksum,
        actual: Checksum,
    },

    #[error("'{action}' cannot be applied on top of local state, resync required")]
    ResyncRequired { action: String },
}

impl ReconcileError {
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::Mismatch { .. } => "RECONCILIATION_MISMATCH",
            ReconcileError::ResyncRequired { .. } => "RESYNC_REQUIRED",
        }
    }
}
