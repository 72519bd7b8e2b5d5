//! Score-tiered obstacle spawning

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::game::{OBSTACLE_CATALOG, Obstacle, SPAWN_DISTANCE};

/// Environment move in the alternating-turn game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvAction {
    /// Nothing appears this step
    Pass,
    /// Spawn the catalog entry with this index at the spawn distance
    Spawn(usize),
}

/// Spawn parameters active from `min_score` upwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnTier {
    pub min_score: u64,
    /// Number of leading catalog entries that may spawn
    pub catalog_len: usize,
    /// Gap (in steps) before which no obstacle may spawn
    pub min_gap: i32,
    /// Gap at which a spawn is forced
    pub max_gap: i32,
}

/// Policy deciding the environment's move.
///
/// The gap is the distance between the spawn point and the trailing edge of
/// the newest obstacle. Below `min_gap` nothing spawns, at `max_gap` or above
/// a spawn is forced, and inside the window a spawn happens with probability
/// `1 / (max_gap - gap)` so that the chance rises as the window closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPolicy {
    tiers: Vec<SpawnTier>,
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                SpawnTier {
                    min_score: 0,
                    catalog_len: 2,
                    min_gap: 15,
                    max_gap: 25,
                },
                SpawnTier {
                    min_score: 200,
                    catalog_len: 4,
                    min_gap: 10,
                    max_gap: 15,
                },
                SpawnTier {
                    min_score: 300,
                    catalog_len: 6,
                    min_gap: 5,
                    max_gap: 15,
                },
                SpawnTier {
                    min_score: 400,
                    catalog_len: OBSTACLE_CATALOG.len(),
                    min_gap: 10,
                    max_gap: 20,
                },
            ],
        }
    }
}

impl SpawnPolicy {
    /// Build a policy from explicit tiers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfiguration`] if the tiers are empty,
    /// not sorted by score, start above score 0, or have an invalid window.
    pub fn new(tiers: Vec<SpawnTier>) -> crate::Result<Self> {
        if tiers.first().map(|t| t.min_score) != Some(0) {
            return Err(crate::Error::config(
                "spawn tiers must start at score 0",
            ));
        }
        if tiers.windows(2).any(|w| w[0].min_score >= w[1].min_score) {
            return Err(crate::Error::config(
                "spawn tiers must be sorted by strictly increasing score",
            ));
        }
        for tier in &tiers {
            if tier.catalog_len == 0 || tier.catalog_len > OBSTACLE_CATALOG.len() {
                return Err(crate::Error::config(format!(
                    "spawn tier catalog length {} outside 1..={}",
                    tier.catalog_len,
                    OBSTACLE_CATALOG.len()
                )));
            }
            if tier.min_gap < 0 || tier.min_gap >= tier.max_gap {
                return Err(crate::Error::config(format!(
                    "spawn tier gap window [{}, {}) is empty",
                    tier.min_gap, tier.max_gap
                )));
            }
        }
        Ok(Self { tiers })
    }

    /// Tier in effect for the given score.
    pub fn tier(&self, score: u64) -> &SpawnTier {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.min_score <= score)
            .unwrap_or(&self.tiers[0])
    }

    /// Gap between the spawn point and the newest obstacle, if any.
    pub fn gap(obstacles: &[Obstacle]) -> Option<i32> {
        obstacles
            .last()
            .map(|last| SPAWN_DISTANCE - (last.distance + last.width - 1))
    }

    /// Choose the environment's move for the current step.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        score: u64,
        obstacles: &[Obstacle],
        rng: &mut R,
    ) -> EnvAction {
        let tier = self.tier(score);
        let spawn = match Self::gap(obstacles) {
            None => true,
            Some(gap) if gap >= tier.max_gap => true,
            Some(gap) if gap >= tier.min_gap => rng.random_range(0..tier.max_gap - gap) == 0,
            Some(_) => false,
        };

        if spawn {
            EnvAction::Spawn(rng.random_range(0..tier.catalog_len))
        } else {
            EnvAction::Pass
        }
    }
}
