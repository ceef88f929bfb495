use thiserror::Error;

use crate::events::Stage;
use crate::stage::StageError;

/// Fatal outcomes of a generation request. None of them carries a partial
/// artifact.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error("all {attempted} theme candidates failed")]
    AllCandidatesFailed { attempted: usize, failures: Vec<String> },
}

impl PipelineError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::InvalidRequest(_) => None,
            PipelineError::Stage(err) => Some(err.stage()),
            PipelineError::AllCandidatesFailed { .. } => Some(Stage::Theme),
        }
    }

    /// The last known violation list, for the caller-facing error body.
    pub fn violations(&self) -> Vec<String> {
        match self {
            PipelineError::InvalidRequest(reason) => vec![reason.clone()],
            PipelineError::Stage(err) => err.violations().to_vec(),
            PipelineError::AllCandidatesFailed { failures, .. } => failures.clone(),
        }
    }
}
