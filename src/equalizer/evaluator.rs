use crate::channel::dataset::ChannelModelDataset;
use crate::equalizer::{EqualizerStrategy, StateNetEqualizer};
use crate::error::EqResult;
use crate::metrics::calculate_error_rates;
use crate::settings::Settings;
use crate::utils::consts::PRINT_FREQ;
use tracing::{debug, info};

/// Outcome of one evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Symbol error rate of every block, in block order
    pub ser_per_block: Vec<f32>,
    /// Frame error indicator of every block
    pub fer_per_block: Vec<f32>,
    /// Arithmetic mean of `ser_per_block`
    pub mean_ser: f32,
}

/// Runs the sequential pilot/data transmission experiment: per block, adapt
/// on the pilot prefix (when online training is enabled), detect the data
/// suffix, and score it against the ground truth.
pub struct Evaluator {
    settings: Settings,
    dataset: ChannelModelDataset,
    strategy: Box<dyn EqualizerStrategy>,
}

impl Evaluator {
    /// Standard setup: the state-posterior network strategy over the
    /// simulated channel dataset.
    pub fn new(settings: &Settings) -> EqResult<Self> {
        let strategy = Box::new(StateNetEqualizer::new(settings)?);
        Ok(Self::with_strategy(settings, strategy))
    }

    /// Plug in a custom strategy (mainly for baselines and tests).
    pub fn with_strategy(settings: &Settings, strategy: Box<dyn EqualizerStrategy>) -> Self {
        Self {
            settings: settings.clone(),
            dataset: ChannelModelDataset::new(settings),
            strategy,
        }
    }

    pub fn num_blocks(&self) -> usize {
        self.settings.val_frames
    }

    pub fn evaluate(&mut self) -> EqResult<EvaluationReport> {
        self.evaluate_with(|_| {})
    }

    /// Full evaluation run; `on_block` fires after every scored block.
    pub fn evaluate_with(
        &mut self,
        mut on_block: impl FnMut(usize),
    ) -> EqResult<EvaluationReport> {
        self.settings.validate()?;
        let snr = self.settings.val_snr;
        let pilot_size = self.settings.pilot_size;
        info!(
            "evaluating {} at {:.1} dB, gamma {:.2}, {} blocks of {} ({} pilot)",
            self.strategy.name(),
            snr,
            self.settings.gamma,
            self.settings.val_frames,
            self.settings.val_block_length,
            pilot_size,
        );

        let (transmitted_words, received_words, coefficients) =
            self.dataset.get_item(&[snr], self.settings.gamma)?;

        let mut total_ser = 0.0f32;
        let mut ser_per_block = Vec::with_capacity(transmitted_words.len());
        let mut fer_per_block = Vec::with_capacity(transmitted_words.len());

        // strictly sequential: training on block i shapes detection on i+1
        for (count, ((transmitted, received), taps)) in transmitted_words
            .iter()
            .zip(received_words.iter())
            .zip(coefficients.iter())
            .enumerate()
        {
            let (tx_pilot, tx_data) = transmitted.split_at(pilot_size);
            let (rx_pilot, rx_data) = received.split_at(pilot_size);

            if self.settings.is_online_training {
                let losses = self.strategy.online_training(tx_pilot, rx_pilot, taps, snr)?;
                let skipped = losses.iter().filter(|l| l.is_nan()).count();
                if skipped > 0 {
                    debug!("block {count}: {skipped} training steps skipped");
                }
            }

            let detected = self.strategy.detect(rx_data)?;
            let rates = calculate_error_rates(&detected, tx_data)?;
            debug!(
                "block {count}: SER {:.5}, FER {}, {} errors",
                rates.ser,
                rates.fer,
                rates.error_indices.len()
            );

            total_ser += rates.ser;
            ser_per_block.push(rates.ser);
            fer_per_block.push(rates.fer);
            if (count + 1) % PRINT_FREQ == 0 {
                info!(
                    "self-supervised: {}/{}, SER {:.6}",
                    count + 1,
                    transmitted_words.len(),
                    total_ser / (count + 1) as f32
                );
            }
            on_block(count);
        }

        let mean_ser = total_ser / ser_per_block.len() as f32;
        info!("final SER: {mean_ser:.6}");
        Ok(EvaluationReport {
            ser_per_block,
            fer_per_block,
            mean_ser,
        })
    }
}
