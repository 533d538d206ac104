pub mod noise_estimation;

use crate::error::EqResult;
use crate::settings::AugmentationKind;
use noise_estimation::NoiseEstimationAugmenter;
use tracing::debug;

/// One pilot augmentation strategy.
pub trait Augmenter {
    fn name(&self) -> &'static str;

    /// Produce a synthetic (received, transmitted) pair from a real one.
    /// `update_hyper_params` asks the strategy to refresh whatever cached
    /// statistics it derives from the base pilot.
    fn augment(
        &mut self,
        received_word: &[f32],
        transmitted_word: &[u8],
        update_hyper_params: bool,
    ) -> EqResult<(Vec<f32>, Vec<u8>)>;
}

impl AugmentationKind {
    /// Resolve the configured strategy once, at construction time.
    pub fn create(&self, memory_length: usize, seed: u64) -> Box<dyn Augmenter> {
        match self {
            AugmentationKind::NoiseEstimation => {
                Box::new(NoiseEstimationAugmenter::new(memory_length, seed))
            }
        }
    }
}

/// Uniform front door over the augmentation strategies. The kind is fixed
/// when the wrapper is built; calls just dispatch.
pub struct AugmenterWrapper {
    kind: AugmentationKind,
    inner: Box<dyn Augmenter>,
}

impl AugmenterWrapper {
    pub fn new(kind: AugmentationKind, memory_length: usize, seed: u64) -> Self {
        let inner = kind.create(memory_length, seed);
        debug!("augmenter strategy: {}", inner.name());
        Self { kind, inner }
    }

    pub fn kind(&self) -> AugmentationKind {
        self.kind
    }

    /// Augment one pilot pair. The channel estimate and SNR are part of the
    /// uniform contract; the noise-estimation strategy derives everything
    /// from the received word itself and ignores them.
    pub fn augment(
        &mut self,
        received_word: &[f32],
        transmitted_word: &[u8],
        _channel_estimate: &[f32],
        _snr: f32,
        update_hyper_params: bool,
    ) -> EqResult<(Vec<f32>, Vec<u8>)> {
        self.inner
            .augment(received_word, transmitted_word, update_hyper_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_dispatch() {
        let mut wrapper = AugmenterWrapper::new(AugmentationKind::NoiseEstimation, 1, 9);
        assert_eq!(wrapper.kind(), AugmentationKind::NoiseEstimation);

        let transmitted = vec![0, 1, 0, 1, 1, 0];
        let received = vec![1.0, -1.0, 0.9, -1.1, -0.95, 1.05];
        let taps = vec![1.0];
        let (new_rx, new_tx) = wrapper
            .augment(&received, &transmitted, &taps, 9.0, true)
            .unwrap();
        assert_eq!(new_rx.len(), received.len());
        assert_eq!(new_tx.len(), transmitted.len());
    }
}
