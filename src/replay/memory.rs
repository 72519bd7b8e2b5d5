//! Prioritized replay memory
//!
//! A fixed-capacity circular buffer of experiences, each tagged with a
//! priority. Sampling draws slots with replacement, proportionally to their
//! (optionally re-scaled) priority.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, types::Experience};

/// Priority transform parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityParams {
    /// Added to every raw priority so no slot becomes unreachable
    pub epsilon: f64,
    /// Exponent applied after the offset
    pub alpha: f64,
}

impl Default for PriorityParams {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            alpha: 0.5,
        }
    }
}

impl PriorityParams {
    /// Stored priority for a raw priority: `(raw + epsilon)^alpha`.
    ///
    /// Negative raw values are treated as zero.
    pub fn transform(&self, raw: f64) -> f64 {
        (raw.max(0.0) + self.epsilon).powf(self.alpha)
    }
}

/// An experience tagged with its sampling priority.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityEntry {
    pub experience: Experience,
    pub priority: f64,
}

/// A sampled batch: slot indices and the experiences stored there.
#[derive(Debug, Clone)]
pub struct SampledBatch<'a> {
    pub indices: Vec<usize>,
    pub experiences: Vec<&'a Experience>,
}

impl SampledBatch<'_> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// First index whose value is >= `value` in a non-decreasing array.
///
/// Returns `cumulative.len()` if every value is smaller.
pub fn lower_bound(cumulative: &[f64], value: f64) -> usize {
    cumulative.partition_point(|&c| c < value)
}

/// Fixed-capacity prioritized replay buffer.
#[derive(Debug, Clone)]
pub struct ReplayMemory {
    slots: Vec<Option<PriorityEntry>>,
    pointer: usize,
    count: usize,
    sum_priorities: f64,
    params: PriorityParams,
}

impl ReplayMemory {
    /// Create an empty memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for a zero capacity or
    /// non-positive epsilon.
    pub fn new(capacity: usize, params: PriorityParams) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::config("replay memory capacity must be positive"));
        }
        if params.epsilon.is_nan() || params.epsilon <= 0.0 || !params.alpha.is_finite() {
            return Err(Error::config(format!(
                "invalid priority parameters: epsilon={}, alpha={}",
                params.epsilon, params.alpha
            )));
        }
        Ok(Self {
            slots: vec![None; capacity],
            pointer: 0,
            count: 0,
            sum_priorities: 0.0,
            params,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Running sum of stored priorities.
    pub fn sum_priorities(&self) -> f64 {
        self.sum_priorities
    }

    /// Stored (transformed) priority of a slot; zero when empty.
    pub fn priority(&self, index: usize) -> f64 {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .map_or(0.0, |entry| entry.priority)
    }

    pub fn get(&self, index: usize) -> Option<&Experience> {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .map(|entry| &entry.experience)
    }

    /// Store an experience at the write pointer, evicting the oldest entry
    /// once the buffer is full.
    pub fn add(&mut self, experience: Experience, raw_priority: f64) {
        let priority = self.params.transform(raw_priority);
        let slot = &mut self.slots[self.pointer];
        let old_priority = match slot {
            Some(entry) => entry.priority,
            None => {
                self.count += 1;
                0.0
            }
        };
        *slot = Some(PriorityEntry {
            experience,
            priority,
        });
        self.sum_priorities += priority - old_priority;
        self.pointer = (self.pointer + 1) % self.slots.len();
    }

    /// Cumulative draw probabilities over all slots for the given scale.
    ///
    /// Empty slots contribute zero. The last element is 1 up to rounding.
    pub fn cumulative_probabilities(&self, priority_scale: f64) -> Vec<f64> {
        let scaled: Vec<f64> = self
            .slots
            .iter()
            .map(|slot| slot.as_ref().map_or(0.0, |e| e.priority.powf(priority_scale)))
            .collect();
        let total = if priority_scale == 1.0 {
            self.sum_priorities
        } else {
            scaled.iter().sum()
        };

        let mut running = 0.0;
        scaled
            .into_iter()
            .map(|p| {
                running += p / total;
                running
            })
            .collect()
    }

    /// Draw `batch_size` slots with replacement, proportionally to
    /// `priority^priority_scale`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientExperience`] if fewer than `batch_size`
    /// experiences are stored.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        batch_size: usize,
        priority_scale: f64,
    ) -> Result<SampledBatch<'_>> {
        if self.count < batch_size || self.count == 0 {
            return Err(Error::InsufficientExperience {
                count: self.count,
                batch_size,
            });
        }

        let cumulative = self.cumulative_probabilities(priority_scale);
        let last_filled = self
            .slots
            .iter()
            .rposition(Option::is_some)
            .unwrap_or_default();

        let mut indices = Vec::with_capacity(batch_size);
        let mut experiences = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let u: f64 = rng.random();
            // Rounding can leave the final cumulative value just below u.
            let mut index = lower_bound(&cumulative, u).min(last_filled);
            if self.slots[index].is_none() {
                index = last_filled;
            }
            if let Some(entry) = &self.slots[index] {
                indices.push(index);
                experiences.push(&entry.experience);
            }
        }

        Ok(SampledBatch {
            indices,
            experiences,
        })
    }

    /// Replace the priorities of previously sampled slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the slices differ in length and
    /// [`Error::EmptySlot`] for an index that was never written. Earlier pairs
    /// are already applied when an error is returned.
    pub fn update_priorities(&mut self, indices: &[usize], raw_priorities: &[f64]) -> Result<()> {
        if indices.len() != raw_priorities.len() {
            return Err(Error::LengthMismatch {
                context: "priority update",
                left: indices.len(),
                right: raw_priorities.len(),
            });
        }

        for (&index, &raw) in indices.iter().zip(raw_priorities) {
            let entry = self
                .slots
                .get_mut(index)
                .and_then(Option::as_mut)
                .ok_or(Error::EmptySlot { index })?;
            let priority = self.params.transform(raw);
            self.sum_priorities += priority - entry.priority;
            entry.priority = priority;
        }
        Ok(())
    }
}
