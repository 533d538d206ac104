pub mod loss;
pub mod optim;
pub mod statenet;

pub use loss::*;
pub use optim::*;
pub use statenet::*;

use crate::error::{EqError, EqResult};

/// Which side of the pilot/data split the detector is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Online adaptation on pilots: soft per-symbol state scores
    Train,
    /// Detection on the data part: hard symbol decisions
    Val,
}

/// What a forward pass produced, depending on the phase.
#[derive(Debug, Clone)]
pub enum DetectorOutput {
    /// Per-symbol probability rows over the channel states
    Soft(Vec<Vec<f32>>),
    /// Hard detected bits
    Hard(Vec<u8>),
}

impl DetectorOutput {
    pub fn into_soft(self) -> EqResult<Vec<Vec<f32>>> {
        match self {
            DetectorOutput::Soft(soft) => Ok(soft),
            DetectorOutput::Hard(_) => Err(EqError::InvalidInput(
                "expected soft state estimates, got hard decisions".into(),
            )),
        }
    }

    pub fn into_hard(self) -> EqResult<Vec<u8>> {
        match self {
            DetectorOutput::Hard(bits) => Ok(bits),
            DetectorOutput::Soft(_) => Err(EqError::InvalidInput(
                "expected hard decisions, got soft state estimates".into(),
            )),
        }
    }
}

/// A trainable sequence detector.
///
/// The model scores every received sample against all channel states; the
/// training phase exposes those scores (and caches activations for a later
/// `backward`), the validation phase returns hard bit decisions.
pub trait Detector {
    fn n_states(&self) -> usize;

    fn num_params(&self) -> usize;

    fn forward(&mut self, received_word: &[f32], phase: Phase) -> EqResult<DetectorOutput>;

    /// Clear accumulated gradients before a backward pass.
    fn zero_grad(&mut self);

    /// Accumulate gradients for the activations cached by the last
    /// `Phase::Train` forward. `dlogits` rows align with that input.
    fn backward(&mut self, dlogits: &[Vec<f32>]) -> EqResult<()>;

    /// Parameter vector and matching gradient vector, for an optimizer step.
    fn params_and_grads(&mut self) -> (&mut [f32], &[f32]);
}
