use crate::error::{EqError, EqResult};
use crate::settings::LossType;

/// Clamp for probabilities inside logs and divisions
const PROB_EPS: f32 = 1e-7;

/// Scalar loss plus its gradient w.r.t. the detector logits.
#[derive(Debug, Clone)]
pub struct LossOutput {
    pub loss: f32,
    pub dlogits: Vec<Vec<f32>>,
}

/// Training criterion over softmax state probabilities.
///
/// Every variant consumes probability rows (one per symbol) and a
/// ground-truth state per row, and returns the gradient already chained
/// through the softmax, so the detector backward only sees logits.
pub struct Criterion {
    kind: LossType,
}

impl Criterion {
    pub fn new(kind: LossType) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> LossType {
        self.kind
    }

    pub fn evaluate(&self, soft: &[Vec<f32>], target_states: &[usize]) -> EqResult<LossOutput> {
        if soft.len() != target_states.len() {
            return Err(EqError::InvalidInput(format!(
                "{} probability rows for {} targets",
                soft.len(),
                target_states.len()
            )));
        }
        if soft.is_empty() {
            return Err(EqError::InvalidInput("empty training batch".into()));
        }
        let n_states = soft[0].len();
        if let Some(&bad) = target_states.iter().find(|&&s| s >= n_states) {
            return Err(EqError::InvalidInput(format!(
                "target state {bad} out of range for {n_states} states"
            )));
        }

        match self.kind {
            LossType::CrossEntropy => self.cross_entropy(soft, target_states),
            LossType::Bce => self.elementwise(soft, target_states, bce_value, bce_grad),
            LossType::Mse => self.elementwise(soft, target_states, mse_value, mse_grad),
        }
    }

    fn cross_entropy(&self, soft: &[Vec<f32>], targets: &[usize]) -> EqResult<LossOutput> {
        let batch = soft.len() as f32;
        let mut loss = 0.0;
        let mut dlogits = Vec::with_capacity(soft.len());
        for (probs, &target) in soft.iter().zip(targets.iter()) {
            // clamp (not max) so a NaN probability propagates to the loss
            loss -= probs[target].clamp(PROB_EPS, 1.0).ln();
            let row: Vec<f32> = probs
                .iter()
                .enumerate()
                .map(|(k, &p)| {
                    let y = if k == target { 1.0 } else { 0.0 };
                    (p - y) / batch
                })
                .collect();
            dlogits.push(row);
        }
        Ok(LossOutput {
            loss: loss / batch,
            dlogits,
        })
    }

    /// BCE and MSE act element-wise on the probabilities against one-hot
    /// targets; the probability-space gradient is chained through the
    /// softmax Jacobian: dlogit_k = p_k * (g_k - sum_j g_j p_j).
    fn elementwise(
        &self,
        soft: &[Vec<f32>],
        targets: &[usize],
        value: fn(f32, f32) -> f32,
        grad: fn(f32, f32) -> f32,
    ) -> EqResult<LossOutput> {
        let n_states = soft[0].len();
        let count = (soft.len() * n_states) as f32;
        let mut loss = 0.0;
        let mut dlogits = Vec::with_capacity(soft.len());
        for (probs, &target) in soft.iter().zip(targets.iter()) {
            let mut g_row = Vec::with_capacity(n_states);
            for (k, &p) in probs.iter().enumerate() {
                let y = if k == target { 1.0 } else { 0.0 };
                let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
                loss += value(p, y);
                g_row.push(grad(p, y) / count);
            }
            let dot: f32 = g_row.iter().zip(probs.iter()).map(|(g, p)| g * p).sum();
            let row: Vec<f32> = probs
                .iter()
                .zip(g_row.iter())
                .map(|(&p, &g)| p * (g - dot))
                .collect();
            dlogits.push(row);
        }
        Ok(LossOutput {
            loss: loss / count,
            dlogits,
        })
    }
}

fn bce_value(p: f32, y: f32) -> f32 {
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}

fn bce_grad(p: f32, y: f32) -> f32 {
    (p - y) / (p * (1.0 - p))
}

fn mse_value(p: f32, y: f32) -> f32 {
    (p - y) * (p - y)
}

fn mse_grad(p: f32, y: f32) -> f32 {
    2.0 * (p - y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soft_rows() -> Vec<Vec<f32>> {
        vec![vec![0.7, 0.2, 0.05, 0.05], vec![0.1, 0.6, 0.2, 0.1]]
    }

    #[test]
    fn test_cross_entropy_value() {
        let criterion = Criterion::new(LossType::CrossEntropy);
        let out = criterion.evaluate(&soft_rows(), &[0, 1]).unwrap();
        let expected = -(0.7f32.ln() + 0.6f32.ln()) / 2.0;
        assert!((out.loss - expected).abs() < 1e-6);
        assert_eq!(out.dlogits.len(), 2);
        // gradient pushes the target logit up, the rest down
        assert!(out.dlogits[0][0] < 0.0);
        assert!(out.dlogits[0][1] > 0.0);
    }

    #[test]
    fn test_gradient_rows_sum_to_zero() {
        // softmax-chained gradients live on the simplex tangent
        for kind in [LossType::CrossEntropy, LossType::Bce, LossType::Mse] {
            let criterion = Criterion::new(kind);
            let out = criterion.evaluate(&soft_rows(), &[2, 0]).unwrap();
            for row in &out.dlogits {
                let sum: f32 = row.iter().sum();
                assert!(sum.abs() < 1e-5, "{kind:?} gradient row sums to {sum}");
            }
        }
    }

    #[test]
    fn test_target_out_of_range() {
        let criterion = Criterion::new(LossType::Mse);
        assert!(criterion.evaluate(&soft_rows(), &[0, 7]).is_err());
    }

    #[test]
    fn test_batch_shape_mismatch() {
        let criterion = Criterion::new(LossType::Bce);
        assert!(criterion.evaluate(&soft_rows(), &[0]).is_err());
    }
}
