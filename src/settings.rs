use crate::error::{EqError, EqResult};
use crate::utils::consts::{
    DEFAULT_AUG_N_REPEATS, DEFAULT_AUG_TOTAL_SIZE, DEFAULT_HIDDEN_SIZE,
    DEFAULT_ONLINE_EPOCHS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optimization algorithm for the detector parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerType {
    Adam,
    Rmsprop,
    Sgd,
}

/// Training criterion applied to the soft state estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossType {
    CrossEntropy,
    Bce,
    Mse,
}

/// Pilot augmentation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AugmentationKind {
    NoiseEstimation,
}

impl AugmentationKind {
    pub fn name(&self) -> &'static str {
        match self {
            AugmentationKind::NoiseEstimation => "noise-estimation",
        }
    }
}

/// Channel tap law used by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelType {
    /// Static exponentially decaying taps + AWGN
    IsiAwgn,
    /// Same taps, cosine-faded over the block index
    TimeVarying,
}

/// Run settings. One instance is built at startup and passed by reference
/// into every component constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub memory_length: usize,
    pub aug_type: AugmentationKind,
    pub seed: u64,
    pub optimizer_type: OptimizerType,
    pub lr: f32,
    pub loss_type: LossType,
    pub val_block_length: usize,
    pub val_frames: usize,
    pub val_snr: f32,
    pub gamma: f32,
    pub pilot_size: usize,
    pub is_online_training: bool,
    pub train_minibatch_size: usize,
    pub channel_type: ChannelType,
    pub hidden_size: usize,
    pub online_epochs: usize,
    pub aug_total_size: usize,
    pub aug_n_repeats: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            memory_length: 4,
            aug_type: AugmentationKind::NoiseEstimation,
            seed: 3407,
            optimizer_type: OptimizerType::Adam,
            lr: 1e-3,
            loss_type: LossType::CrossEntropy,
            val_block_length: 120,
            val_frames: 50,
            val_snr: 9.0,
            gamma: 0.2,
            pilot_size: 30,
            is_online_training: true,
            train_minibatch_size: 32,
            channel_type: ChannelType::IsiAwgn,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            online_epochs: DEFAULT_ONLINE_EPOCHS,
            aug_total_size: DEFAULT_AUG_TOTAL_SIZE,
            aug_n_repeats: DEFAULT_AUG_N_REPEATS,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Unknown enum identifiers (optimizer,
    /// loss, augmentation, channel) fail here, before anything is built.
    pub fn load(path: &Path) -> EqResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EqError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let settings: Settings = serde_json::from_str(&raw).map_err(|e| {
            EqError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject inconsistent scalar combinations eagerly, at setup time.
    pub fn validate(&self) -> EqResult<()> {
        if self.memory_length == 0 {
            return Err(EqError::Configuration(
                "memory_length must be at least 1".into(),
            ));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(EqError::Configuration(format!(
                "lr must be positive and finite, got {}",
                self.lr
            )));
        }
        if self.pilot_size == 0 || self.pilot_size >= self.val_block_length {
            return Err(EqError::Configuration(format!(
                "pilot_size {} must be in (0, val_block_length = {})",
                self.pilot_size, self.val_block_length
            )));
        }
        if self.val_block_length < self.memory_length {
            return Err(EqError::Configuration(format!(
                "val_block_length {} shorter than memory_length {}",
                self.val_block_length, self.memory_length
            )));
        }
        if self.val_frames == 0 {
            return Err(EqError::Configuration("val_frames must be non-zero".into()));
        }
        if self.train_minibatch_size == 0 {
            return Err(EqError::Configuration(
                "train_minibatch_size must be non-zero".into(),
            ));
        }
        if self.aug_n_repeats == 0 || self.aug_n_repeats > self.aug_total_size {
            return Err(EqError::Configuration(format!(
                "aug_n_repeats {} must be in [1, aug_total_size = {}]",
                self.aug_n_repeats, self.aug_total_size
            )));
        }
        Ok(())
    }

    /// Number of trellis states of the modeled channel
    pub fn n_states(&self) -> usize {
        1 << self.memory_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
        assert_eq!(Settings::default().n_states(), 16);
    }

    #[test]
    fn unknown_optimizer_fails_at_parse_time() {
        let raw = r#"{ "optimizer_type": "Adagrad" }"#;
        let parsed: Result<Settings, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn unknown_augmentation_fails_at_parse_time() {
        let raw = r#"{ "aug_type": "flipping" }"#;
        let parsed: Result<Settings, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn pilot_must_fit_in_block() {
        let settings = Settings {
            pilot_size: 200,
            val_block_length: 120,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
