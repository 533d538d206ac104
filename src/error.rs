use thiserror::Error;

/// Crate-wide error type.
///
/// Numeric instability (a NaN loss during a training step) is deliberately
/// not represented here: the training loop recovers from it locally and
/// reports the skipped step with a NaN sentinel instead of failing the run.
#[derive(Debug, Error)]
pub enum EqError {
    /// Bad or inconsistent settings, detected at setup time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A capability was invoked on a strategy that does not provide it.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Augmentation needs statistics for a channel state that was never
    /// observed in the base pilot.
    #[error("no noise statistics for channel state {state}")]
    UninitializedState { state: usize },

    /// Caller violated a precondition on word shapes or contents.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type EqResult<T> = Result<T, EqError>;
