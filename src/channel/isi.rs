use crate::error::{EqError, EqResult};
use crate::settings::ChannelType;
use crate::utils::consts::{FADING_DEPTH, FADING_PERIOD_BLOCKS};
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use std::f32::consts::PI;

/// Intersymbol-interference channel with additive white Gaussian noise.
///
/// Taps decay exponentially with the delay, `h[j] = exp(-gamma * j)`, so the
/// channel has `memory_length` resolvable echoes and `gamma` controls how
/// fast they die out. The time-varying flavor scales the taps by a slow
/// cosine in the block index.
pub struct IsiAwgnChannel {
    memory_length: usize,
    channel_type: ChannelType,
}

impl IsiAwgnChannel {
    pub fn new(memory_length: usize, channel_type: ChannelType) -> Self {
        Self {
            memory_length,
            channel_type,
        }
    }

    /// Channel coefficients for one block.
    pub fn taps(&self, gamma: f32, block_index: usize) -> Vec<f32> {
        let fading = match self.channel_type {
            ChannelType::IsiAwgn => 1.0,
            ChannelType::TimeVarying => {
                let phase = 2.0 * PI * block_index as f32 / FADING_PERIOD_BLOCKS as f32;
                1.0 + FADING_DEPTH * phase.cos()
            }
        };
        (0..self.memory_length)
            .map(|j| fading * (-gamma * j as f32).exp())
            .collect()
    }

    /// Pass a binary word through the channel: BPSK map, convolve with the
    /// taps (zero history before the word), add AWGN for the given SNR.
    pub fn transmit(
        &self,
        transmitted_word: &[u8],
        taps: &[f32],
        snr_db: f32,
        rng: &mut StdRng,
    ) -> EqResult<Vec<f32>> {
        if taps.len() != self.memory_length {
            return Err(EqError::InvalidInput(format!(
                "expected {} taps, got {}",
                self.memory_length,
                taps.len()
            )));
        }
        let symbols: Vec<f32> = transmitted_word
            .iter()
            .map(|&b| if b == 0 { 1.0 } else { -1.0 })
            .collect();

        let sigma = 10f32.powf(-snr_db / 20.0);
        let mut received = Vec::with_capacity(symbols.len());
        for t in 0..symbols.len() {
            let mut sample = 0.0;
            for (j, &h) in taps.iter().enumerate() {
                if t >= j {
                    sample += h * symbols[t - j];
                }
            }
            let noise: f32 = StandardNormal.sample(rng);
            received.push(sample + sigma * noise);
        }
        Ok(received)
    }
}
