//! State encoding
//!
//! Turns a [`GameState`] into the 106-slot [`FeatureVector`] consumed by the
//! predictor:
//!
//! | Slots     | Content                                   |
//! |-----------|-------------------------------------------|
//! | 0..40     | distance bucket of obstacle 0, one-hot    |
//! | 40,41,42  | y-offset, width, height of obstacle 0     |
//! | 43..86    | same block for obstacle 1                 |
//! | 86        | jump flag                                 |
//! | 87        | dino y-position                           |
//! | 88..106   | speed bucket, one-hot                     |

use crate::types::{FEATURE_LEN, FeatureVector, GameState, ObstacleObservation};

/// Number of distance buckets per obstacle block.
pub const DISTANCE_BUCKETS: usize = 40;
/// Slots per obstacle block (buckets plus y-offset, width, height).
pub const OBSTACLE_BLOCK: usize = DISTANCE_BUCKETS + 3;
/// Number of speed buckets.
pub const SPEED_BUCKETS: usize = 18;

/// Smallest `x_pos` of an obstacle still in front of the dino (crash distance).
pub const MIN_OBSTACLE_X: f64 = 19.0;
/// Pixels per distance bucket.
pub const BUCKET_WIDTH: f64 = 16.0;
/// Speed mapped to bucket 0.
pub const BASE_SPEED: f64 = 6.0;

const JUMP_SLOT: usize = 2 * OBSTACLE_BLOCK;
const YPOS_SLOT: usize = JUMP_SLOT + 1;
const SPEED_OFFSET: usize = YPOS_SLOT + 1;

const _: () = assert!(SPEED_OFFSET + SPEED_BUCKETS == FEATURE_LEN);

/// Distance bucket for an obstacle x-position, saturating at both ends.
pub fn distance_bucket(x_pos: f64) -> usize {
    let bucket = ((x_pos - MIN_OBSTACLE_X) / BUCKET_WIDTH).floor();
    bucket.clamp(0.0, (DISTANCE_BUCKETS - 1) as f64) as usize
}

/// Speed bucket for a game speed, saturating at both ends.
pub fn speed_bucket(speed: f64) -> usize {
    (speed - BASE_SPEED)
        .round()
        .clamp(0.0, (SPEED_BUCKETS - 1) as f64) as usize
}

fn write_obstacle(obstacle: &ObstacleObservation, block: &mut [f64]) {
    block[distance_bucket(obstacle.x_pos)] = 1.0;
    block[DISTANCE_BUCKETS] = obstacle.y_pos;
    block[DISTANCE_BUCKETS + 1] = obstacle.width;
    block[DISTANCE_BUCKETS + 2] = obstacle.height;
}

/// Encode a game state. Pure and total.
pub fn encode(state: &GameState) -> FeatureVector {
    let mut vector = FeatureVector::zeros();
    let slots = vector.as_mut_slice();

    let mut nearest: Vec<&ObstacleObservation> = state.obstacles.iter().collect();
    nearest.sort_by(|a, b| a.x_pos.total_cmp(&b.x_pos));

    for (block, obstacle) in slots
        .chunks_mut(OBSTACLE_BLOCK)
        .take(2)
        .zip(nearest)
    {
        write_obstacle(obstacle, block);
    }

    if state.jumping {
        slots[JUMP_SLOT] = 1.0;
    }
    slots[YPOS_SLOT] = state.ypos;
    slots[SPEED_OFFSET + speed_bucket(state.speed)] = 1.0;

    vector
}
