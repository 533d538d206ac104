pub mod evaluator;

pub use evaluator::*;

use crate::augmentation::AugmenterWrapper;
use crate::channel::state::calculate_states;
use crate::detection::{Criterion, Detector, LossOutput, Optimizer, Phase, StateNetDetector};
use crate::error::{EqError, EqResult};
use crate::settings::Settings;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

/// Capability surface of one equalization strategy.
///
/// Detection is mandatory. Loss computation and online training are
/// capabilities a strategy may not have; the defaults fail loudly instead
/// of silently doing nothing, so a run configured for online training
/// against a detection-only strategy surfaces the mismatch immediately.
pub trait EqualizerStrategy {
    fn name(&self) -> &'static str;

    /// Hard-detect the data part of a block.
    fn detect(&mut self, received_data: &[f32]) -> EqResult<Vec<u8>>;

    /// Loss of a batch of soft state estimates against ground-truth states.
    fn calc_loss(&self, soft: &[Vec<f32>], target_states: &[usize]) -> EqResult<LossOutput> {
        let _ = (soft, target_states);
        Err(EqError::UnsupportedOperation("loss calculation"))
    }

    /// Adapt the detector on one pilot pair. Returns the per-step training
    /// losses; a skipped (NaN-loss) step contributes a NaN sentinel.
    fn online_training(
        &mut self,
        transmitted_pilot: &[u8],
        received_pilot: &[f32],
        channel_estimate: &[f32],
        snr: f32,
    ) -> EqResult<Vec<f32>> {
        let _ = (transmitted_pilot, received_pilot, channel_estimate, snr);
        Err(EqError::UnsupportedOperation("online training"))
    }
}

/// Self-supervised equalizer: a state-posterior network adapted online on
/// augmented pilots.
pub struct StateNetEqualizer {
    detector: Box<dyn Detector>,
    optimizer: Optimizer,
    criterion: Criterion,
    augmenter: AugmenterWrapper,
    memory_length: usize,
    minibatch_size: usize,
    online_epochs: usize,
    aug_total_size: usize,
    aug_n_repeats: usize,
    rng: StdRng,
}

impl StateNetEqualizer {
    /// Build the full training stack from the settings. Everything that can
    /// be rejected (optimizer, loss, augmentation identifiers, scalar
    /// ranges) already was, at settings load time.
    pub fn new(settings: &Settings) -> EqResult<Self> {
        settings.validate()?;
        let detector = StateNetDetector::new(settings);
        let optimizer = Optimizer::new(settings.optimizer_type, settings.lr, detector.num_params());
        let criterion = Criterion::new(settings.loss_type);
        let augmenter = AugmenterWrapper::new(
            settings.aug_type,
            settings.memory_length,
            settings.seed.wrapping_add(1),
        );
        Ok(Self {
            detector: Box::new(detector),
            optimizer,
            criterion,
            augmenter,
            memory_length: settings.memory_length,
            minibatch_size: settings.train_minibatch_size,
            online_epochs: settings.online_epochs,
            aug_total_size: settings.aug_total_size,
            aug_n_repeats: settings.aug_n_repeats,
            rng: StdRng::seed_from_u64(settings.seed.wrapping_add(2)),
        })
    }

    /// Expand one pilot pair into `total_size` training rows.
    ///
    /// Rows below `n_repeats` are augmented, with the noise statistics
    /// recomputed only on the first row and reused after that. Remaining
    /// rows are verbatim copies of the pre-augmentation row `i % n_repeats`.
    /// An augmentation that hits a channel state the pilot never visited is
    /// logged and falls back to the plain pilot for that row, so a sparse
    /// pilot degrades to repetition instead of aborting the block.
    pub fn augment_words_wrapper(
        &mut self,
        channel_estimate: &[f32],
        received_words: &[f32],
        transmitted_words: &[u8],
        total_size: usize,
        n_repeats: usize,
        snr: f32,
        _phase: Phase,
    ) -> EqResult<(Vec<Vec<f32>>, Vec<Vec<u8>>)> {
        let originals_rx = vec![received_words.to_vec(); n_repeats];
        let originals_tx = vec![transmitted_words.to_vec(); n_repeats];

        let mut rx_rows = Vec::with_capacity(total_size);
        let mut tx_rows = Vec::with_capacity(total_size);
        for i in 0..total_size {
            let upd_idx = i % n_repeats;
            if i < n_repeats {
                let update_hyper_params = i == 0;
                match self.augmenter.augment(
                    &originals_rx[upd_idx],
                    &originals_tx[upd_idx],
                    channel_estimate,
                    snr,
                    update_hyper_params,
                ) {
                    Ok((rx, tx)) => {
                        rx_rows.push(rx);
                        tx_rows.push(tx);
                    }
                    Err(EqError::UninitializedState { state }) => {
                        debug!("row {i}: state {state} unseen in pilot, reusing pilot");
                        rx_rows.push(originals_rx[upd_idx].clone());
                        tx_rows.push(originals_tx[upd_idx].clone());
                    }
                    Err(other) => return Err(other),
                }
            } else {
                rx_rows.push(originals_rx[upd_idx].clone());
                tx_rows.push(originals_tx[upd_idx].clone());
            }
        }
        Ok((rx_rows, tx_rows))
    }

    /// One gradient step on the selected minibatch.
    ///
    /// A non-finite loss is reported and skipped: no gradient is applied,
    /// the optimizer state stays untouched, and the NaN sentinel is
    /// returned so the caller can see the hole in the loss curve.
    pub fn run_train_loop(
        &mut self,
        soft: &[Vec<f32>],
        target_states: &[usize],
        batch: &[usize],
    ) -> EqResult<f32> {
        let batch_soft: Vec<Vec<f32>> = batch.iter().map(|&i| soft[i].clone()).collect();
        let batch_targets: Vec<usize> = batch.iter().map(|&i| target_states[i]).collect();
        let LossOutput { loss, dlogits } = self.criterion.evaluate(&batch_soft, &batch_targets)?;

        if !loss.is_finite() {
            warn!("non-finite loss, skipping step");
            return Ok(f32::NAN);
        }

        // scatter the minibatch gradient back onto the cached forward
        let n_states = self.detector.n_states();
        let mut full = vec![vec![0.0f32; n_states]; soft.len()];
        for (&i, row) in batch.iter().zip(dlogits.into_iter()) {
            full[i] = row;
        }

        self.detector.zero_grad();
        self.detector.backward(&full)?;
        let (params, grads) = self.detector.params_and_grads();
        self.optimizer.step(params, grads);
        Ok(loss)
    }

    /// Uniformly sample a training minibatch (without replacement).
    fn select_batch(&mut self, population: usize) -> Vec<usize> {
        let amount = self.minibatch_size.min(population);
        rand::seq::index::sample(&mut self.rng, population, amount).into_vec()
    }
}

impl EqualizerStrategy for StateNetEqualizer {
    fn name(&self) -> &'static str {
        "statenet"
    }

    fn detect(&mut self, received_data: &[f32]) -> EqResult<Vec<u8>> {
        self.detector.forward(received_data, Phase::Val)?.into_hard()
    }

    fn calc_loss(&self, soft: &[Vec<f32>], target_states: &[usize]) -> EqResult<LossOutput> {
        self.criterion.evaluate(soft, target_states)
    }

    fn online_training(
        &mut self,
        transmitted_pilot: &[u8],
        received_pilot: &[f32],
        channel_estimate: &[f32],
        snr: f32,
    ) -> EqResult<Vec<f32>> {
        let (rx_rows, tx_rows) = self.augment_words_wrapper(
            channel_estimate,
            received_pilot,
            transmitted_pilot,
            self.aug_total_size,
            self.aug_n_repeats,
            snr,
            Phase::Train,
        )?;

        // flatten the expanded pilot into one sample stream; state windows
        // never cross row boundaries
        let mut samples = Vec::with_capacity(rx_rows.len() * received_pilot.len());
        let mut states = Vec::with_capacity(samples.capacity());
        for (rx, tx) in rx_rows.iter().zip(tx_rows.iter()) {
            states.extend(calculate_states(self.memory_length, tx)?);
            samples.extend_from_slice(rx);
        }

        let mut losses = Vec::with_capacity(self.online_epochs);
        for epoch in 0..self.online_epochs {
            let soft = self
                .detector
                .forward(&samples, Phase::Train)?
                .into_soft()?;
            let batch = self.select_batch(states.len());
            let loss = self.run_train_loop(&soft, &states, &batch)?;
            debug!("epoch {epoch}: loss {loss:.5}");
            losses.push(loss);
        }
        Ok(losses)
    }
}
