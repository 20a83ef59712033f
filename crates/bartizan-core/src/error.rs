use thiserror::Error;

/// Errors that can occur while resolving or assembling a launch plan.
#[derive(Debug, Error)]
pub enum BartizanError {
    /// The task name is not one of the known modeling task variants.
    #[error("unknown task {name:?}, expected one of: {known}", known = crate::task::KNOWN_TASKS.join(", "))]
    UnknownTask {
        /// The name that failed to resolve.
        name: String,
    },

    /// A hyperparameter value is outside its valid range.
    #[error("invalid hyperparameter: {0}")]
    InvalidHyperparam(String),

    /// sbatch produced output we could not extract a job id from.
    #[error("could not parse job id from sbatch output: {output:?}")]
    JobIdParse {
        /// The raw stdout sbatch produced.
        output: String,
    },

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    RegexError(#[from] regex::Error),
}

/// Result type alias for bartizan operations.
pub type Result<T> = std::result::Result<T, BartizanError>;
