use crate::channel::isi::IsiAwgnChannel;
use crate::error::EqResult;
use crate::settings::Settings;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// One batch of simulated transmissions: parallel per-block collections of
/// transmitted words, received words, and channel coefficient vectors.
pub type ChannelBlocks = (Vec<Vec<u8>>, Vec<Vec<f32>>, Vec<Vec<f32>>);

/// Draws blocks of (transmitted, received, taps) triples from the simulated
/// channel. The RNG is re-seeded per draw so the same settings always yield
/// the same data.
pub struct ChannelModelDataset {
    channel: IsiAwgnChannel,
    block_length: usize,
    words: usize,
    seed: u64,
}

impl ChannelModelDataset {
    pub fn new(settings: &Settings) -> Self {
        Self {
            channel: IsiAwgnChannel::new(settings.memory_length, settings.channel_type),
            block_length: settings.val_block_length,
            words: settings.val_frames,
            seed: settings.seed,
        }
    }

    pub fn num_blocks(&self, snr_count: usize) -> usize {
        self.words * snr_count
    }

    /// Draw `words` blocks per SNR in `snr_list`, all with the given channel
    /// variation parameter.
    pub fn get_item(&self, snr_list: &[f32], gamma: f32) -> EqResult<ChannelBlocks> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let total = self.num_blocks(snr_list.len());
        let mut transmitted_words = Vec::with_capacity(total);
        let mut received_words = Vec::with_capacity(total);
        let mut coefficients = Vec::with_capacity(total);

        for &snr in snr_list {
            for block in 0..self.words {
                let word: Vec<u8> = (0..self.block_length)
                    .map(|_| rng.random_range(0..=1u8))
                    .collect();
                let taps = self.channel.taps(gamma, block);
                let received = self.channel.transmit(&word, &taps, snr, &mut rng)?;
                transmitted_words.push(word);
                received_words.push(received);
                coefficients.push(taps);
            }
            debug!("drew {} blocks at {:.1} dB", self.words, snr);
        }
        Ok((transmitted_words, received_words, coefficients))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> ChannelModelDataset {
        let settings = Settings {
            val_frames: 5,
            val_block_length: 40,
            ..Settings::default()
        };
        ChannelModelDataset::new(&settings)
    }

    #[test]
    fn test_shapes() {
        let (tx, rx, hs) = dataset().get_item(&[9.0], 0.2).unwrap();
        assert_eq!(tx.len(), 5);
        assert_eq!(rx.len(), 5);
        assert_eq!(hs.len(), 5);
        assert!(tx.iter().all(|w| w.len() == 40));
        assert!(rx.iter().all(|w| w.len() == 40));
        assert!(hs.iter().all(|h| h.len() == 4));
        assert!(tx.iter().flatten().all(|&b| b <= 1));
    }

    #[test]
    fn test_same_seed_same_draw() {
        let (tx_a, rx_a, _) = dataset().get_item(&[9.0], 0.2).unwrap();
        let (tx_b, rx_b, _) = dataset().get_item(&[9.0], 0.2).unwrap();
        assert_eq!(tx_a, tx_b);
        assert_eq!(rx_a, rx_b);
    }

    #[test]
    fn test_multiple_snrs_stack() {
        let (tx, _, _) = dataset().get_item(&[6.0, 9.0], 0.2).unwrap();
        assert_eq!(tx.len(), 10);
    }
}
