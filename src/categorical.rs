//! Categorical (C51) value distributions
//!
//! Values are represented as probability mass over a fixed, evenly spaced
//! support `z_0..z_{K-1}` on `[v_min, v_max]`. The Bellman backup shifts and
//! scales the support, then projects the mass back onto the fixed atoms.
//!
//! Reference: Bellemare, Dabney & Munos, "A Distributional Perspective on
//! Reinforcement Learning" (2017), Algorithm 1.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Probabilities are clipped into `[KL_FLOOR, 1]` before the KL ratio.
pub const KL_FLOOR: f64 = 1e-7;

/// Fixed support of a categorical distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSupport {
    v_min: f64,
    v_max: f64,
    delta_z: f64,
    atoms: Vec<f64>,
}

impl CategoricalSupport {
    /// Support of `atoms` evenly spaced values on `[v_min, v_max]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for fewer than two atoms or an
    /// empty value range.
    pub fn new(v_min: f64, v_max: f64, atoms: usize) -> Result<Self> {
        if atoms < 2 {
            return Err(Error::config("categorical support needs at least two atoms"));
        }
        if !(v_min < v_max) {
            return Err(Error::config(format!(
                "categorical support range [{v_min}, {v_max}] is empty"
            )));
        }
        let delta_z = (v_max - v_min) / (atoms - 1) as f64;
        let atoms = (0..atoms).map(|i| v_min + i as f64 * delta_z).collect();
        Ok(Self {
            v_min,
            v_max,
            delta_z,
            atoms,
        })
    }

    pub fn v_min(&self) -> f64 {
        self.v_min
    }

    pub fn v_max(&self) -> f64 {
        self.v_max
    }

    pub fn delta_z(&self) -> f64 {
        self.delta_z
    }

    /// The atom values `z_j`.
    pub fn values(&self) -> &[f64] {
        &self.atoms
    }

    /// Number of atoms K.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Expected value `Σ z_j p_j` of one action's mass vector.
    pub fn expected_value(&self, mass: &[f64]) -> f64 {
        self.atoms.iter().zip(mass).map(|(z, p)| z * p).sum()
    }

    /// Expected value per action.
    pub fn expected_values(&self, dist: &ValueDistribution) -> Vec<f64> {
        dist.rows().map(|row| self.expected_value(row)).collect()
    }

    /// Action with the highest expected value; ties go to the first maximum.
    pub fn greedy_action(&self, dist: &ValueDistribution) -> usize {
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (action, value) in self.expected_values(dist).into_iter().enumerate() {
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        best
    }

    /// Project the distributional Bellman target onto the support.
    ///
    /// `p` is the next-state mass for the bootstrapping action, `gamma` the
    /// discount for the bootstrapped part (already raised to the multi-step
    /// power). For terminal transitions all mass collapses onto `reward`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `p` does not have one entry per atom.
    pub fn project(&self, reward: f64, gamma: f64, done: bool, p: &[f64]) -> Result<Vec<f64>> {
        let k = self.atoms.len();
        if p.len() != k {
            return Err(Error::ShapeMismatch {
                context: "projected distribution".to_string(),
                expected: k,
                got: p.len(),
            });
        }

        let mut m = vec![0.0; k];
        for (&z, &p_j) in self.atoms.iter().zip(p) {
            let tz = if done { reward } else { reward + gamma * z };
            let tz = tz.clamp(self.v_min, self.v_max);
            let b = (tz - self.v_min) / self.delta_z;
            let l = b.floor();
            let mut u = b.ceil();
            if l == u {
                u += 1.0;
            }
            let (li, ui) = (l as usize, u as usize);
            m[li.min(k - 1)] += p_j * (u - b);
            // Past the last atom the upper share is zero.
            if ui < k {
                m[ui] += p_j * (b - l);
            }
        }
        Ok(m)
    }
}

/// KL divergence `Σ m_j log(m_j / q_j)` with both sides clipped into
/// `[KL_FLOOR, 1]`.
pub fn kl_divergence(target: &[f64], predicted: &[f64]) -> f64 {
    target
        .iter()
        .zip(predicted)
        .map(|(&m, &q)| {
            let m = m.clamp(KL_FLOOR, 1.0);
            let q = q.clamp(KL_FLOOR, 1.0);
            m * (m / q).ln()
        })
        .sum()
}

/// Per-action probability mass over the atoms, shape `[actions × atoms]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDistribution {
    actions: usize,
    atoms: usize,
    mass: Vec<f64>,
}

impl ValueDistribution {
    /// Uniform mass for every action.
    pub fn uniform(actions: usize, atoms: usize) -> Self {
        Self {
            actions,
            atoms,
            mass: vec![1.0 / atoms as f64; actions * atoms],
        }
    }

    /// Wrap a row-major mass matrix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `mass.len() != actions * atoms`.
    pub fn from_rows(actions: usize, atoms: usize, mass: Vec<f64>) -> Result<Self> {
        if mass.len() != actions * atoms {
            return Err(Error::ShapeMismatch {
                context: "value distribution".to_string(),
                expected: actions * atoms,
                got: mass.len(),
            });
        }
        Ok(Self {
            actions,
            atoms,
            mass,
        })
    }

    pub fn num_actions(&self) -> usize {
        self.actions
    }

    pub fn atoms(&self) -> usize {
        self.atoms
    }

    /// Mass vector of one action.
    pub fn action(&self, action: usize) -> &[f64] {
        &self.mass[action * self.atoms..(action + 1) * self.atoms]
    }

    /// Overwrite one action's mass vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `mass` has the wrong length.
    pub fn set_action(&mut self, action: usize, mass: &[f64]) -> Result<()> {
        if mass.len() != self.atoms {
            return Err(Error::ShapeMismatch {
                context: format!("mass of action {action}"),
                expected: self.atoms,
                got: mass.len(),
            });
        }
        self.mass[action * self.atoms..(action + 1) * self.atoms].copy_from_slice(mass);
        Ok(())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.mass.chunks(self.atoms)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn support() -> CategoricalSupport {
        CategoricalSupport::new(-5.0, 5.0, 51).unwrap()
    }

    #[test]
    fn test_support_spacing() {
        let s = support();
        assert_eq!(s.len(), 51);
        assert!((s.delta_z() - 0.2).abs() < 1e-12);
        assert_eq!(s.values()[0], -5.0);
        assert!((s.values()[50] - 5.0).abs() < 1e-12);
        assert!((s.values()[25]).abs() < 1e-12);
    }

    #[test]
    fn test_terminal_projection_on_atom() {
        let s = support();
        let p = vec![1.0 / 51.0; 51];
        let m = s.project(-1.0, 0.9, true, &p).unwrap();
        // -1.0 sits exactly on atom 20.
        assert!((m[20] - 1.0).abs() < 1e-9);
        assert!((m.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_terminal_projection_between_atoms() {
        let s = support();
        let p = vec![1.0 / 51.0; 51];
        let m = s.project(0.05, 0.9, true, &p).unwrap();
        assert!((m[25] - 0.75).abs() < 1e-9);
        assert!((m[26] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_projection_clamps_to_vmax() {
        let s = support();
        let mut p = vec![0.0; 51];
        p[50] = 1.0;
        let m = s.project(10.0, 1.0, false, &p).unwrap();
        assert!((m[50] - 1.0).abs() < 1e-9);
        assert!((m.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_rejects_wrong_length() {
        assert!(support().project(0.0, 0.9, false, &[1.0]).is_err());
    }

    #[test]
    fn test_greedy_action_first_maximum() {
        let s = CategoricalSupport::new(-1.0, 1.0, 3).unwrap();
        let dist = ValueDistribution::from_rows(
            3,
            3,
            vec![
                0.0, 0.0, 1.0, // +1
                1.0, 0.0, 0.0, // -1
                0.0, 0.0, 1.0, // +1
            ],
        )
        .unwrap();
        assert_eq!(s.expected_values(&dist), vec![1.0, -1.0, 1.0]);
        assert_eq!(s.greedy_action(&dist), 0);
    }

    #[test]
    fn test_kl_divergence() {
        let p = [0.5, 0.5];
        assert!(kl_divergence(&p, &p).abs() < 1e-12);
        let q = [0.9, 0.1];
        let expected = 0.5 * (0.5f64 / 0.9).ln() + 0.5 * (0.5f64 / 0.1).ln();
        assert!((kl_divergence(&p, &q) - expected).abs() < 1e-12);
        assert!(kl_divergence(&[1.0, 0.0], &[0.0, 1.0]).is_finite());
    }

    #[test]
    fn test_set_action_row() {
        let mut dist = ValueDistribution::uniform(3, 4);
        dist.set_action(1, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(dist.action(1), &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(dist.action(2), &[0.25; 4]);
        assert!(dist.set_action(0, &[1.0]).is_err());
    }
}
