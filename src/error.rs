// Error taxonomy for the two cores.
// - ConvertError covers every way a conversion can end without output.
// - RenameError covers history navigation on an empty stack.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Process busy: a conversion is already running")]
    ProcessBusy,

    #[error("No max_volume: measured peak is {0} dB, nothing to normalize")]
    NoMaxVolume(String),

    #[error("Failed to read media metadata: {0}")]
    ProbeFailure(String),

    #[error("{program} failed: {detail}")]
    ProcessFailure { program: String, detail: String },

    #[error("Conversion cancelled")]
    Cancelled,
}

impl ConvertError {
    pub(crate) fn process(program: &str, detail: impl Into<String>) -> Self {
        Self::ProcessFailure {
            program: program.to_string(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenameError {
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}
