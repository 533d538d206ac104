use crate::detection::{Detector, DetectorOutput, Phase};
use crate::error::{EqError, EqResult};
use crate::settings::Settings;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Floor under probabilities entering the Viterbi branch metric
const METRIC_EPS: f32 = 1e-12;

/// Neural state-posterior detector.
///
/// A one-hidden-layer network maps each received sample to scores over the
/// `2^memory_length` channel states. Training fits those per-symbol
/// posteriors; validation runs a Viterbi pass over the state trellis
/// (`next = ((state << 1) & mask) | bit`) with `-ln p` branch metrics and
/// reads the detected bit off the LSB of each surviving state.
pub struct StateNetDetector {
    n_states: usize,
    hidden: usize,
    params: Vec<f32>,
    grads: Vec<f32>,
    // activation cache from the last train-phase forward
    cached_input: Vec<f32>,
    cached_hidden: Vec<f32>,
}

impl StateNetDetector {
    pub fn new(settings: &Settings) -> Self {
        let n_states = settings.n_states();
        let hidden = settings.hidden_size;
        let num_params = Self::param_count(hidden, n_states);
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let w2_bound = 1.0 / (hidden as f32).sqrt();

        let mut params = Vec::with_capacity(num_params);
        // w1, b1: scalar input fans out to the hidden layer
        for _ in 0..hidden {
            params.push(rng.random_range(-0.5..0.5));
        }
        params.extend(std::iter::repeat_n(0.0, hidden));
        // w2: hidden to state logits
        for _ in 0..hidden * n_states {
            params.push(rng.random_range(-w2_bound..w2_bound));
        }
        params.extend(std::iter::repeat_n(0.0, n_states));

        Self {
            n_states,
            hidden,
            grads: vec![0.0; num_params],
            params,
            cached_input: Vec::new(),
            cached_hidden: Vec::new(),
        }
    }

    fn param_count(hidden: usize, n_states: usize) -> usize {
        hidden + hidden + hidden * n_states + n_states
    }

    // flat layout: [w1 | b1 | w2 | b2]
    fn b1_off(&self) -> usize {
        self.hidden
    }
    fn w2_off(&self) -> usize {
        2 * self.hidden
    }
    fn b2_off(&self) -> usize {
        2 * self.hidden + self.hidden * self.n_states
    }

    /// Softmax state probabilities for every sample. Hidden activations are
    /// returned alongside for the backward pass.
    fn soft_rows(&self, received_word: &[f32]) -> (Vec<Vec<f32>>, Vec<f32>) {
        let (h, s) = (self.hidden, self.n_states);
        let (b1, w2, b2) = (self.b1_off(), self.w2_off(), self.b2_off());
        let mut probs = Vec::with_capacity(received_word.len());
        let mut hidden_acts = Vec::with_capacity(received_word.len() * h);

        for &y in received_word {
            let mut acts = Vec::with_capacity(h);
            for j in 0..h {
                let a = self.params[j] * y + self.params[b1 + j];
                acts.push(1.0 / (1.0 + (-a).exp()));
            }
            let mut logits = Vec::with_capacity(s);
            for k in 0..s {
                let mut z = self.params[b2 + k];
                let row = &self.params[w2 + k * h..w2 + (k + 1) * h];
                for (w, act) in row.iter().zip(acts.iter()) {
                    z += w * act;
                }
                logits.push(z);
            }
            probs.push(softmax(&logits));
            hidden_acts.extend(acts);
        }
        (probs, hidden_acts)
    }

    /// Viterbi pass over the state trellis with -ln p branch metrics.
    fn viterbi(&self, probs: &[Vec<f32>]) -> Vec<u8> {
        let s = self.n_states;
        let half = s / 2;
        let len = probs.len();
        if len == 0 {
            return Vec::new();
        }

        let mut acc = vec![f32::INFINITY; s];
        // the word starts from all-zero history: only the first bit is free
        for state in 0..2.min(s) {
            acc[state] = -(probs[0][state] + METRIC_EPS).ln();
        }
        let mut parents = vec![vec![0usize; s]; len];

        for t in 1..len {
            let mut next_acc = vec![f32::INFINITY; s];
            for next in 0..s {
                // predecessors share the same shifted-out history
                let p1 = next >> 1;
                let p2 = p1 + half;
                let (best_prev, best_cost) = if acc[p1] <= acc[p2] {
                    (p1, acc[p1])
                } else {
                    (p2, acc[p2])
                };
                if best_cost.is_finite() {
                    next_acc[next] = best_cost - (probs[t][next] + METRIC_EPS).ln();
                    parents[t][next] = best_prev;
                }
            }
            acc = next_acc;
        }

        let mut state = acc
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let mut bits = vec![0u8; len];
        for t in (0..len).rev() {
            bits[t] = (state & 1) as u8;
            state = parents[t][state];
        }
        bits
    }
}

impl Detector for StateNetDetector {
    fn n_states(&self) -> usize {
        self.n_states
    }

    fn num_params(&self) -> usize {
        self.params.len()
    }

    fn forward(&mut self, received_word: &[f32], phase: Phase) -> EqResult<DetectorOutput> {
        if received_word.is_empty() {
            return Err(EqError::InvalidInput(
                "detector called on an empty word".into(),
            ));
        }
        let (probs, hidden_acts) = self.soft_rows(received_word);
        match phase {
            Phase::Train => {
                self.cached_input = received_word.to_vec();
                self.cached_hidden = hidden_acts;
                Ok(DetectorOutput::Soft(probs))
            }
            Phase::Val => Ok(DetectorOutput::Hard(self.viterbi(&probs))),
        }
    }

    fn zero_grad(&mut self) {
        self.grads.fill(0.0);
    }

    fn backward(&mut self, dlogits: &[Vec<f32>]) -> EqResult<()> {
        if dlogits.len() != self.cached_input.len() {
            return Err(EqError::InvalidInput(format!(
                "{} gradient rows for {} cached samples",
                dlogits.len(),
                self.cached_input.len()
            )));
        }
        let h = self.hidden;
        let (b1, w2, b2) = (self.b1_off(), self.w2_off(), self.b2_off());

        for (i, row) in dlogits.iter().enumerate() {
            if row.len() != self.n_states {
                return Err(EqError::InvalidInput(format!(
                    "gradient row of width {} for {} states",
                    row.len(),
                    self.n_states
                )));
            }
            let y = self.cached_input[i];
            let acts = &self.cached_hidden[i * h..(i + 1) * h];
            let mut dact = vec![0.0f32; h];
            for (k, &g) in row.iter().enumerate() {
                if g == 0.0 {
                    continue;
                }
                self.grads[b2 + k] += g;
                for j in 0..h {
                    self.grads[w2 + k * h + j] += g * acts[j];
                    dact[j] += g * self.params[w2 + k * h + j];
                }
            }
            for j in 0..h {
                let da = dact[j] * acts[j] * (1.0 - acts[j]);
                self.grads[j] += da * y;
                self.grads[b1 + j] += da;
            }
        }
        Ok(())
    }

    fn params_and_grads(&mut self) -> (&mut [f32], &[f32]) {
        (&mut self.params, &self.grads)
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exps: Vec<f32> = logits.iter().map(|&z| (z - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(memory_length: usize) -> StateNetDetector {
        let settings = Settings {
            memory_length,
            hidden_size: 16,
            ..Settings::default()
        };
        StateNetDetector::new(&settings)
    }

    #[test]
    fn test_soft_rows_are_distributions() {
        let mut det = detector(2);
        let out = det
            .forward(&[0.3, -1.2, 0.8], Phase::Train)
            .unwrap()
            .into_soft()
            .unwrap();
        assert_eq!(out.len(), 3);
        for row in &out {
            assert_eq!(row.len(), 4);
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn test_viterbi_follows_peaked_posteriors() {
        // hand-built posteriors, memory 2: states 01 -> 11 -> 10 -> 01
        // encode the bit path 1, 1, 0, 1
        let det = detector(2);
        let one_hot = |s: usize| {
            let mut row = vec![0.001f32; 4];
            row[s] = 1.0;
            row
        };
        let probs = vec![one_hot(0b01), one_hot(0b11), one_hot(0b10), one_hot(0b01)];
        assert_eq!(det.viterbi(&probs), vec![1, 1, 0, 1]);
    }

    #[test]
    fn test_backward_matches_numeric_gradient() {
        let mut det = detector(1);
        let input = vec![0.4, -0.7];
        let targets = [1usize, 0usize];

        // analytic gradient through a cross-entropy head
        let soft = det
            .forward(&input, Phase::Train)
            .unwrap()
            .into_soft()
            .unwrap();
        let batch = soft.len() as f32;
        let dlogits: Vec<Vec<f32>> = soft
            .iter()
            .zip(targets.iter())
            .map(|(row, &t)| {
                row.iter()
                    .enumerate()
                    .map(|(k, &p)| (p - if k == t { 1.0 } else { 0.0 }) / batch)
                    .collect()
            })
            .collect();
        det.zero_grad();
        det.backward(&dlogits).unwrap();

        let loss_at = |det: &mut StateNetDetector| {
            let soft = det
                .forward(&input, Phase::Train)
                .unwrap()
                .into_soft()
                .unwrap();
            -soft
                .iter()
                .zip(targets.iter())
                .map(|(row, &t)| row[t].ln())
                .sum::<f32>()
                / batch
        };

        // perturb a handful of parameters and compare
        let eps = 5e-3;
        for idx in [0usize, 5, 20, det.num_params() - 1] {
            let analytic = det.grads[idx];
            det.params[idx] += eps;
            let plus = loss_at(&mut det);
            det.params[idx] -= 2.0 * eps;
            let minus = loss_at(&mut det);
            det.params[idx] += eps;
            let numeric = (plus - minus) / (2.0 * eps);
            assert!(
                (analytic - numeric).abs() < 1e-2,
                "param {idx}: analytic {analytic} vs numeric {numeric}"
            );
        }
    }

    #[test]
    fn test_backward_requires_matching_forward() {
        let mut det = detector(1);
        assert!(det.backward(&[vec![0.0, 0.0]]).is_err());
    }
}
