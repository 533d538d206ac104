use crate::settings::OptimizerType;

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const RMSPROP_ALPHA: f32 = 0.99;
const EPS: f32 = 1e-8;

/// First-order optimizer over the detector's flat parameter vector.
///
/// The moment buffers are sized once at construction; a step with a
/// mismatched parameter count is a programming error upstream.
pub struct Optimizer {
    kind: OptimizerType,
    lr: f32,
    step_count: u32,
    m: Vec<f32>,
    v: Vec<f32>,
}

impl Optimizer {
    pub fn new(kind: OptimizerType, lr: f32, num_params: usize) -> Self {
        Self {
            kind,
            lr,
            step_count: 0,
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
        }
    }

    pub fn kind(&self) -> OptimizerType {
        self.kind
    }

    /// Apply one update in place.
    pub fn step(&mut self, params: &mut [f32], grads: &[f32]) {
        debug_assert_eq!(params.len(), grads.len());
        debug_assert_eq!(params.len(), self.m.len());
        self.step_count += 1;
        match self.kind {
            OptimizerType::Sgd => {
                for (p, &g) in params.iter_mut().zip(grads.iter()) {
                    *p -= self.lr * g;
                }
            }
            OptimizerType::Rmsprop => {
                for ((p, &g), v) in params.iter_mut().zip(grads.iter()).zip(self.v.iter_mut()) {
                    *v = RMSPROP_ALPHA * *v + (1.0 - RMSPROP_ALPHA) * g * g;
                    *p -= self.lr * g / (v.sqrt() + EPS);
                }
            }
            OptimizerType::Adam => {
                let bias1 = 1.0 - ADAM_BETA1.powi(self.step_count as i32);
                let bias2 = 1.0 - ADAM_BETA2.powi(self.step_count as i32);
                for (((p, &g), m), v) in params
                    .iter_mut()
                    .zip(grads.iter())
                    .zip(self.m.iter_mut())
                    .zip(self.v.iter_mut())
                {
                    *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
                    *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
                    let m_hat = *m / bias1;
                    let v_hat = *v / bias2;
                    *p -= self.lr * m_hat / (v_hat.sqrt() + EPS);
                }
            }
        }
    }
}
