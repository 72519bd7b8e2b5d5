//! Core value types shared by the encoder, simulator, replay memory and agent.

use std::{fmt, ops::Index};

use serde::{Deserialize, Serialize};

/// Number of actions available to the dino.
pub const NUM_ACTIONS: usize = 3;

/// Canonical length of an encoded [`FeatureVector`].
pub const FEATURE_LEN: usize = 106;

/// A player action.
///
/// The discriminants are the action indices used by the network output rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    Stand = 0,
    Jump = 1,
    Crouch = 2,
}

impl Action {
    /// All actions in index order.
    pub const ALL: [Action; NUM_ACTIONS] = [Action::Stand, Action::Jump, Action::Crouch];

    /// Convert an action index (0-2) into an action.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidAction`] if the index is >= 3.
    pub fn from_index(index: usize) -> Result<Self, crate::Error> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(crate::Error::InvalidAction { action: index })
    }

    /// Get the action index.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for Action {
    type Error = crate::Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Action::from_index(value)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Stand => "stand",
            Action::Jump => "jump",
            Action::Crouch => "crouch",
        };
        f.write_str(name)
    }
}

/// An obstacle as reported by an observation.
///
/// `x_pos` uses the live game's pixel law: 19 is a crash, 625 is where
/// obstacles appear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleObservation {
    pub x_pos: f64,
    pub y_pos: f64,
    pub width: f64,
    pub height: f64,
}

/// Immutable snapshot of the game produced by an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub speed: f64,
    pub jumping: bool,
    pub ypos: f64,
    pub obstacles: Vec<ObstacleObservation>,
    /// Monotonic game time in milliseconds, used for pacing.
    pub time: f64,
    pub done: bool,
}

/// Fixed-length numeric encoding of a [`GameState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// A vector of [`FEATURE_LEN`] zeros.
    pub fn zeros() -> Self {
        FeatureVector(vec![0.0; FEATURE_LEN])
    }

    /// Wrap raw values, validating the length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ShapeMismatch`] if `values.len() != FEATURE_LEN`.
    pub fn from_values(values: Vec<f64>) -> Result<Self, crate::Error> {
        if values.len() == FEATURE_LEN {
            Ok(FeatureVector(values))
        } else {
            Err(crate::Error::ShapeMismatch {
                context: "feature vector".to_string(),
                expected: FEATURE_LEN,
                got: values.len(),
            })
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// A (possibly multi-step aggregated) transition stored in replay memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: FeatureVector,
    pub action: Action,
    pub reward: f64,
    pub next_state: FeatureVector,
    pub done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip_indices() {
        for (i, action) in Action::ALL.iter().enumerate() {
            assert_eq!(action.index(), i);
            assert_eq!(Action::from_index(i).unwrap(), *action);
        }
    }

    #[test]
    fn test_action_out_of_range() {
        assert!(matches!(
            Action::try_from(3),
            Err(crate::Error::InvalidAction { action: 3 })
        ));
    }

    #[test]
    fn test_feature_vector_length_checked() {
        assert!(FeatureVector::from_values(vec![0.0; 10]).is_err());
        assert_eq!(FeatureVector::zeros().len(), FEATURE_LEN);
    }
}
