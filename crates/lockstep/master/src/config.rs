use serde::{Deserialize, Serialize};

/// Master orchestration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Fold private patches into canonical state when the reducer asks for it.
    #[serde(default = "default_true")]
    pub fold_private_patches: bool,

    /// After a fold, also forward the triggering action to its sender, whose
    /// optimistic state cannot contain the other groups' private data.
    #[serde(default = "default_true")]
    pub forward_on_fold_to_sender: bool,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            fold_private_patches: true,
            forward_on_fold_to_sender: true,
        }
    }
}

fn default_true() -> bool {
    true
}
