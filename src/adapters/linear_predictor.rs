//! Reference predictor: per-action linear softmax over the atoms
//!
//! For every action `a` and atom `j` the logit is `b[a,j] + w[a,j] · x`; each
//! action's logits pass through a softmax to give its probability mass. The
//! fit step is one full-batch gradient descent step on the categorical
//! cross-entropy `-Σ_j m_j log p_j`, whose logit gradient is `p - m`.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{
    Error, Result,
    categorical::ValueDistribution,
    ports::{Predictor, Tensor, Weights},
    types::FeatureVector,
};

const KERNEL: &str = "kernel";
const BIAS: &str = "bias";
const INIT_STD_DEV: f64 = 0.01;
const LOG_FLOOR: f64 = 1e-12;

/// Linear softmax predictor.
#[derive(Debug, Clone)]
pub struct LinearPredictor {
    features: usize,
    actions: usize,
    atoms: usize,
    learning_rate: f64,
    /// `[actions * atoms, features]`, row-major
    kernel: Vec<f64>,
    /// `[actions * atoms]`
    bias: Vec<f64>,
}

impl LinearPredictor {
    /// Create a predictor with small random kernel weights and zero biases.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for zero dimensions or a
    /// non-positive learning rate.
    pub fn new<R: Rng + ?Sized>(
        features: usize,
        actions: usize,
        atoms: usize,
        learning_rate: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if features == 0 || actions == 0 || atoms == 0 {
            return Err(Error::config(format!(
                "predictor dimensions must be positive (features={features}, actions={actions}, atoms={atoms})"
            )));
        }
        if !(learning_rate > 0.0 && learning_rate.is_finite()) {
            return Err(Error::config(format!(
                "learning rate {learning_rate} must be positive"
            )));
        }

        let normal = Normal::new(0.0, INIT_STD_DEV)
            .map_err(|e| Error::config(format!("weight initializer: {e}")))?;
        let outputs = actions * atoms;
        let kernel = (0..outputs * features).map(|_| normal.sample(rng)).collect();

        Ok(Self {
            features,
            actions,
            atoms,
            learning_rate,
            kernel,
            bias: vec![0.0; outputs],
        })
    }

    pub fn features(&self) -> usize {
        self.features
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn check_input(&self, state: &FeatureVector) -> Result<()> {
        if state.len() != self.features {
            return Err(Error::ShapeMismatch {
                context: "predictor input".to_string(),
                expected: self.features,
                got: state.len(),
            });
        }
        Ok(())
    }

    /// Row-major `[actions * atoms]` probabilities.
    fn forward(&self, x: &[f64]) -> Vec<f64> {
        let mut out: Vec<f64> = self
            .kernel
            .chunks(self.features)
            .zip(&self.bias)
            .map(|(row, b)| b + row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>())
            .collect();

        for logits in out.chunks_mut(self.atoms) {
            let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut total = 0.0;
            for logit in logits.iter_mut() {
                *logit = (*logit - max).exp();
                total += *logit;
            }
            for p in logits.iter_mut() {
                *p /= total;
            }
        }
        out
    }
}

impl Predictor for LinearPredictor {
    fn num_actions(&self) -> usize {
        self.actions
    }

    fn atoms(&self) -> usize {
        self.atoms
    }

    fn predict(&self, state: &FeatureVector) -> Result<ValueDistribution> {
        self.check_input(state)?;
        ValueDistribution::from_rows(self.actions, self.atoms, self.forward(state.as_slice()))
    }

    fn fit(&mut self, states: &[FeatureVector], targets: &[ValueDistribution]) -> Result<f64> {
        if states.len() != targets.len() {
            return Err(Error::LengthMismatch {
                context: "fit states and targets",
                left: states.len(),
                right: targets.len(),
            });
        }
        if states.is_empty() {
            return Ok(0.0);
        }

        let outputs = self.actions * self.atoms;
        let mut kernel_grad = vec![0.0; self.kernel.len()];
        let mut bias_grad = vec![0.0; outputs];
        let mut loss = 0.0;

        for (state, target) in states.iter().zip(targets) {
            self.check_input(state)?;
            if target.as_slice().len() != outputs {
                return Err(Error::ShapeMismatch {
                    context: "fit target".to_string(),
                    expected: outputs,
                    got: target.as_slice().len(),
                });
            }

            let x = state.as_slice();
            let predicted = self.forward(x);
            for (o, (&p, &m)) in predicted.iter().zip(target.as_slice()).enumerate() {
                loss -= m * p.max(LOG_FLOOR).ln();
                let delta = p - m;
                bias_grad[o] += delta;
                let row = &mut kernel_grad[o * self.features..(o + 1) * self.features];
                for (g, v) in row.iter_mut().zip(x) {
                    *g += delta * v;
                }
            }
        }

        let scale = self.learning_rate / states.len() as f64;
        for (w, g) in self.kernel.iter_mut().zip(&kernel_grad) {
            *w -= scale * g;
        }
        for (b, g) in self.bias.iter_mut().zip(&bias_grad) {
            *b -= scale * g;
        }

        Ok(loss / states.len() as f64)
    }

    fn weights(&self) -> Weights {
        let outputs = self.actions * self.atoms;
        let mut weights = Weights::new();
        weights.insert(
            KERNEL,
            Tensor {
                shape: vec![outputs, self.features],
                values: self.kernel.clone(),
            },
        );
        weights.insert(
            BIAS,
            Tensor {
                shape: vec![outputs],
                values: self.bias.clone(),
            },
        );
        weights
    }

    fn set_weights(&mut self, weights: &Weights) -> Result<()> {
        let outputs = self.actions * self.atoms;
        let kernel = weights.expect(KERNEL, &[outputs, self.features])?;
        let bias = weights.expect(BIAS, &[outputs])?;
        self.kernel.copy_from_slice(&kernel.values);
        self.bias.copy_from_slice(&bias.values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{ports::sync_weights, types::FEATURE_LEN};

    fn predictor(seed: u64) -> LinearPredictor {
        let mut rng = StdRng::seed_from_u64(seed);
        LinearPredictor::new(FEATURE_LEN, 3, 5, 0.5, &mut rng).unwrap()
    }

    fn state(values: [f64; 4]) -> FeatureVector {
        let mut features = vec![0.0; FEATURE_LEN];
        features[..4].copy_from_slice(&values);
        FeatureVector::from_values(features).unwrap()
    }

    #[test]
    fn test_rows_are_distributions() {
        let p = predictor(1);
        let dist = p.predict(&state([1.0, 0.0, 0.5, -1.0])).unwrap();
        assert_eq!(dist.num_actions(), 3);
        for row in dist.rows() {
            assert_eq!(row.len(), 5);
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|&v| v > 0.0));
        }
    }

    #[test]
    fn test_fit_reduces_loss() {
        let mut p = predictor(2);
        let states = vec![state([1.0, 0.0, 0.0, 1.0]), state([0.0, 1.0, 1.0, 0.0])];
        let mut target = ValueDistribution::uniform(3, 5);
        target.set_action(0, &[0.0, 0.0, 0.0, 0.0, 1.0]).unwrap();
        let targets = vec![target.clone(), target];

        let first = p.fit(&states, &targets).unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = p.fit(&states, &targets).unwrap();
        }
        assert!(last < first, "loss {last} did not drop below {first}");
    }

    #[test]
    fn test_sync_makes_predictors_identical() {
        let source = predictor(3);
        let mut dest = predictor(4);
        let x = state([0.3, -0.2, 1.0, 0.0]);
        assert_ne!(source.predict(&x).unwrap(), dest.predict(&x).unwrap());

        sync_weights(&source, &mut dest).unwrap();
        assert_eq!(source.predict(&x).unwrap(), dest.predict(&x).unwrap());
    }

    #[test]
    fn test_shape_errors() {
        let mut p = predictor(5);
        let narrow = LinearPredictor::new(2, 3, 5, 0.1, &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(narrow.predict(&FeatureVector::zeros()).is_err());
        assert!(matches!(
            p.fit(&[state([0.0; 4])], &[]),
            Err(Error::LengthMismatch { .. })
        ));
        assert!(p.set_weights(&narrow.weights()).is_err());
    }
}
