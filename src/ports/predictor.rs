//! Predictor port - abstraction over the value-distribution approximator
//!
//! The agent only needs a function from feature vectors to per-action
//! categorical distributions that can be fitted towards target distributions
//! and whose parameters can be copied between instances. Any architecture
//! satisfying this contract can back the online and target networks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, categorical::ValueDistribution, types::FeatureVector};

/// One named parameter tensor, stored flat in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl Tensor {
    /// Build a tensor, checking that `values` matches `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] when the element count differs from
    /// the product of `shape`.
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(Error::ShapeMismatch {
                context: format!("tensor of shape {shape:?}"),
                expected,
                got: values.len(),
            });
        }
        Ok(Self { shape, values })
    }
}

/// Named parameter tensors of a predictor; opaque to the learning core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    tensors: BTreeMap<String, Tensor>,
}

impl Weights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.tensors.insert(name.into(), tensor);
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Look up a tensor and check its shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the tensor is missing, shaped
    /// differently, or holds a different number of values than its shape
    /// (a truncated or stale file).
    pub fn expect(&self, name: &str, shape: &[usize]) -> Result<&Tensor> {
        let expected: usize = shape.iter().product();
        match self.tensors.get(name) {
            Some(tensor) if tensor.shape == shape && tensor.values.len() == expected => {
                Ok(tensor)
            }
            Some(tensor) => Err(Error::ShapeMismatch {
                context: format!("weight tensor '{name}'"),
                expected,
                got: tensor.values.len(),
            }),
            None => Err(Error::ShapeMismatch {
                context: format!("missing weight tensor '{name}'"),
                expected,
                got: 0,
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.tensors.iter().map(|(name, tensor)| (name.as_str(), tensor))
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

/// Predictor trait - maps states to per-action value distributions
///
/// # Contract
///
/// - `predict` returns a [`ValueDistribution`] of shape
///   `[num_actions() × atoms()]` whose rows each sum to 1.
/// - `fit` performs one optimization step towards `targets` (same shapes)
///   and returns the training loss.
/// - `set_weights(&other.weights())` makes two predictors produce identical
///   outputs.
///
/// # Examples
///
/// ```no_run
/// use dino_dqn::ports::Predictor;
/// use dino_dqn::types::FeatureVector;
///
/// fn value_of<P: Predictor>(predictor: &P, state: &FeatureVector) -> dino_dqn::Result<usize> {
///     let dist = predictor.predict(state)?;
///     Ok(dist.num_actions())
/// }
/// ```
pub trait Predictor: Send {
    /// Number of actions (rows of every prediction).
    fn num_actions(&self) -> usize;

    /// Number of atoms per action (columns of every prediction).
    fn atoms(&self) -> usize;

    /// Predict the value distribution of a single state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the feature vector has the wrong
    /// length for this predictor.
    fn predict(&self, state: &FeatureVector) -> Result<ValueDistribution>;

    /// Predict a batch of states.
    ///
    /// # Default Implementation
    ///
    /// Calls [`Predictor::predict`] once per state.
    fn predict_batch(&self, states: &[FeatureVector]) -> Result<Vec<ValueDistribution>> {
        states.iter().map(|state| self.predict(state)).collect()
    }

    /// Take one optimization step towards the target distributions.
    ///
    /// Returns the loss measured before the update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if `states` and `targets` differ in
    /// length, or [`Error::ShapeMismatch`] for malformed inputs.
    fn fit(&mut self, states: &[FeatureVector], targets: &[ValueDistribution]) -> Result<f64>;

    /// Snapshot of the current parameters.
    fn weights(&self) -> Weights;

    /// Replace the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the weights do not fit this
    /// predictor's architecture.
    fn set_weights(&mut self, weights: &Weights) -> Result<()>;
}

/// Copy every parameter of `source` into `dest`.
///
/// # Errors
///
/// Propagates [`Predictor::set_weights`] failures.
pub fn sync_weights<S, D>(source: &S, dest: &mut D) -> Result<()>
where
    S: Predictor + ?Sized,
    D: Predictor + ?Sized,
{
    dest.set_weights(&source.weights())
}
