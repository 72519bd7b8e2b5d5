//! Alternating-turn dino game
//!
//! The player and the environment take turns. The player stands, jumps or
//! crouches; the environment either passes or spawns an obstacle, and its turn
//! also moves the world one step forward (jump phase, obstacle distances,
//! collision, score).

use std::fmt;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::spawn::{EnvAction, SpawnPolicy};
use crate::{
    Error, Result,
    encoder::{BUCKET_WIDTH, MIN_OBSTACLE_X},
    ports::Environment,
    types::{Action, GameState, NUM_ACTIONS, ObstacleObservation},
};

/// Dino height per jump phase; the jump lasts as long as the table.
pub const JUMP_PHASES: [i32; 6] = [0, 1, 2, 3, 2, 1];

/// Obstacle shapes as `(y, width, height)`.
pub const OBSTACLE_CATALOG: [(i32, i32, i32); 8] = [
    (0, 1, 2), // big cactus
    (0, 1, 1), // small cactus
    (0, 2, 2), // two big cacti
    (0, 2, 1), // two small cacti
    (0, 3, 2), // three big cacti
    (0, 3, 1), // three small cacti
    (1, 1, 2), // low bird
    (2, 1, 2), // high bird
];

/// Steps ahead of the dino where new obstacles appear.
pub const SPAWN_DISTANCE: i32 = 40;

/// Simulated milliseconds per `perform_action`.
pub const STEP_MS: u64 = 50;

/// Speed reported in observations; the simulator never accelerates.
pub const SIMULATED_SPEED: f64 = 6.0;

/// Environment actions in the flat action space: pass plus one per catalog entry.
pub const NUM_ENV_ACTIONS: usize = OBSTACLE_CATALOG.len() + 1;

const STANDING_HEIGHT: i32 = 2;
const CROUCHING_HEIGHT: i32 = 1;

/// A rectangular obstacle. Birds behave like flying cacti.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Obstacle {
    /// Steps until the obstacle reaches the dino's column
    pub distance: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Obstacle {
    /// Catalog obstacle placed at the given distance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAction`] for an index outside the catalog.
    pub fn from_catalog(index: usize, distance: i32) -> Result<Self> {
        let (y, width, height) = *OBSTACLE_CATALOG
            .get(index)
            .ok_or(Error::InvalidAction { action: index })?;
        Ok(Self {
            distance,
            y,
            width,
            height,
        })
    }

    fn occupies_dino_column(&self) -> bool {
        self.distance <= 0 && self.distance + self.width - 1 >= 0
    }

    fn overlaps_vertically(&self, y: i32, height: i32) -> bool {
        self.y <= y + height - 1 && self.y + self.height - 1 >= y
    }

    fn has_passed(&self) -> bool {
        self.distance + self.width + 1 <= 0
    }

    fn observe(&self) -> ObstacleObservation {
        ObstacleObservation {
            x_pos: f64::from(self.distance) * BUCKET_WIDTH + MIN_OBSTACLE_X,
            y_pos: f64::from(self.y),
            width: f64::from(self.width),
            height: f64::from(self.height),
        }
    }
}

/// Side whose move it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Turn {
    Player,
    Environment,
}

/// Raw simulator state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimState {
    pub dino_y: i32,
    pub dino_height: i32,
    /// Index into [`JUMP_PHASES`] while airborne
    pub jump_phase: Option<usize>,
    pub obstacles: Vec<Obstacle>,
    pub score: u64,
    pub terminal: bool,
    pub time_ms: u64,
    pub turn: Turn,
}

impl SimState {
    fn fresh() -> Self {
        Self {
            dino_y: 0,
            dino_height: STANDING_HEIGHT,
            jump_phase: None,
            obstacles: vec![Obstacle {
                distance: SPAWN_DISTANCE,
                y: OBSTACLE_CATALOG[0].0,
                width: OBSTACLE_CATALOG[0].1,
                height: OBSTACLE_CATALOG[0].2,
            }],
            score: 0,
            terminal: false,
            time_ms: 0,
            turn: Turn::Player,
        }
    }

    fn advance_jump(&mut self) {
        if let Some(phase) = self.jump_phase {
            let next = phase + 1;
            if next == JUMP_PHASES.len() {
                self.dino_y = 0;
                self.jump_phase = None;
            } else {
                self.dino_y = JUMP_PHASES[next];
                self.jump_phase = Some(next);
            }
        }
    }

    fn advance_time(&mut self) {
        let (dino_y, dino_height) = (self.dino_y, self.dino_height);
        let mut crashed = false;
        for obstacle in &mut self.obstacles {
            obstacle.distance -= 1;
            if obstacle.occupies_dino_column() && obstacle.overlaps_vertically(dino_y, dino_height)
            {
                crashed = true;
            }
        }
        self.obstacles.retain(|o| !o.has_passed());
        if crashed {
            self.terminal = true;
        } else {
            self.score += 1;
        }
    }
}

/// Reference dino game simulator.
///
/// All randomness comes from the owned RNG, so two simulators built from the
/// same seed and driven by the same actions produce identical runs.
#[derive(Debug, Clone)]
pub struct Simulator<R = StdRng> {
    state: SimState,
    policy: SpawnPolicy,
    rng: R,
}

impl Simulator<StdRng> {
    /// Simulator seeded from the thread RNG.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_rng(&mut rand::rng()))
    }

    /// Deterministic simulator.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for Simulator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Simulator<R> {
    /// Simulator drawing from the given random source.
    pub fn with_rng(rng: R) -> Self {
        Self {
            state: SimState::fresh(),
            policy: SpawnPolicy::default(),
            rng,
        }
    }

    pub fn with_spawn_policy(mut self, policy: SpawnPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.terminal
    }

    /// Reset to a fresh episode: one big cactus at the spawn distance.
    pub fn restart(&mut self) {
        self.state = SimState::fresh();
    }

    /// Replace the active obstacles, for setting up scenarios.
    pub fn replace_obstacles(&mut self, obstacles: Vec<Obstacle>) {
        self.state.obstacles = obstacles;
    }

    /// Apply the player's move.
    ///
    /// While airborne the action is ignored; the jump resolves through the
    /// phase table.
    ///
    /// # Errors
    ///
    /// [`Error::TerminalState`] after a crash, [`Error::WrongTurn`] if the
    /// environment is at move.
    pub fn player_action(&mut self, action: Action) -> Result<()> {
        self.ensure_turn(Turn::Player)?;
        let state = &mut self.state;
        if state.jump_phase.is_none() {
            state.dino_height = STANDING_HEIGHT;
            match action {
                Action::Crouch => state.dino_height = CROUCHING_HEIGHT,
                Action::Jump => {
                    state.jump_phase = Some(0);
                    state.dino_y = JUMP_PHASES[0];
                }
                Action::Stand => {}
            }
        }
        state.turn = Turn::Environment;
        Ok(())
    }

    /// Apply the environment's move and advance the world one step.
    ///
    /// # Errors
    ///
    /// [`Error::TerminalState`] after a crash, [`Error::WrongTurn`] if the
    /// player is at move, [`Error::InvalidAction`] for an unknown obstacle.
    pub fn env_action(&mut self, action: EnvAction) -> Result<()> {
        self.ensure_turn(Turn::Environment)?;
        if let EnvAction::Spawn(index) = action {
            let obstacle = Obstacle::from_catalog(index, SPAWN_DISTANCE)?;
            self.state.obstacles.push(obstacle);
        }
        self.state.advance_jump();
        self.state.advance_time();
        self.state.turn = Turn::Player;
        Ok(())
    }

    /// Apply an action from the flat action space.
    ///
    /// `0..3` are player actions, `3` is the environment pass, and `4..12`
    /// spawn the matching catalog obstacle.
    pub fn apply_action(&mut self, index: usize) -> Result<()> {
        if self.state.terminal {
            return Err(Error::TerminalState);
        }
        if index < NUM_ACTIONS {
            self.player_action(Action::from_index(index)?)
        } else if index == NUM_ACTIONS {
            self.env_action(EnvAction::Pass)
        } else if index < NUM_ACTIONS + NUM_ENV_ACTIONS {
            self.env_action(EnvAction::Spawn(index - NUM_ACTIONS - 1))
        } else {
            Err(Error::InvalidAction { action: index })
        }
    }

    /// Let the spawn policy pick the environment's move.
    ///
    /// # Errors
    ///
    /// [`Error::WrongTurn`] if the player is at move.
    pub fn choose_env_action(&mut self) -> Result<EnvAction> {
        self.ensure_turn(Turn::Environment)?;
        Ok(self
            .policy
            .choose(self.state.score, &self.state.obstacles, &mut self.rng))
    }

    /// One full step: the player's move, the environment's reply (unless the
    /// game ended), and 50 ms of simulated time.
    pub fn perform_action(&mut self, action: Action) -> Result<()> {
        self.player_action(action)?;
        if !self.state.terminal {
            let env_action = self.choose_env_action()?;
            self.env_action(env_action)?;
        }
        self.state.time_ms += STEP_MS;
        Ok(())
    }

    /// Observation in the live game's shape.
    pub fn observation(&self) -> GameState {
        let state = &self.state;
        GameState {
            speed: SIMULATED_SPEED,
            jumping: state.jump_phase.is_some(),
            ypos: f64::from(state.jump_phase.map_or(0, |p| JUMP_PHASES[p])),
            obstacles: state.obstacles.iter().map(Obstacle::observe).collect(),
            time: state.time_ms as f64,
            done: state.terminal,
        }
    }

    fn ensure_turn(&self, expected: Turn) -> Result<()> {
        if self.state.terminal {
            return Err(Error::TerminalState);
        }
        if self.state.turn != expected {
            let (side, at_move) = match expected {
                Turn::Player => ("player", "environment"),
                Turn::Environment => ("environment", "player"),
            };
            return Err(Error::WrongTurn {
                side,
                expected: at_move,
            });
        }
        Ok(())
    }
}

impl<R: Rng> Environment for Simulator<R> {
    fn restart(&mut self) -> Result<()> {
        Simulator::restart(self);
        Ok(())
    }

    fn perform_action(&mut self, action: Action) -> Result<()> {
        Simulator::perform_action(self, action)
    }

    fn observe(&self) -> Result<GameState> {
        Ok(self.observation())
    }

    fn pause(&mut self, _duration: std::time::Duration) {}
}

const ROWS: usize = 5;
const COLUMNS: usize = 46;
const DINO_COLUMN: i32 = 3;

/// ASCII picture of the scene, dino `D`, cacti `|`, birds `<`.
impl<R> fmt::Display for Simulator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut grid = [[' '; COLUMNS]; ROWS];
        for cell in grid[ROWS - 1].iter_mut() {
            *cell = '.';
        }
        for row in grid.iter_mut() {
            row[COLUMNS - 1] = '#';
        }

        let mut plot = |y: i32, x: i32, c: char| {
            let row = ROWS as i32 - 1 - y;
            if (0..ROWS as i32).contains(&row) && (0..COLUMNS as i32).contains(&x) {
                grid[row as usize][x as usize] = c;
            }
        };

        for i in 0..self.state.dino_height {
            plot(self.state.dino_y + i, DINO_COLUMN, 'D');
        }
        for obstacle in &self.state.obstacles {
            let c = if obstacle.y == 0 { '|' } else { '<' };
            for i in 0..obstacle.height {
                for j in 0..obstacle.width {
                    plot(obstacle.y + i, DINO_COLUMN + obstacle.distance + j, c);
                }
            }
        }

        for row in &grid {
            writeln!(f, "{}", row.iter().collect::<String>())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::spawn::SpawnTier;

    fn cactus(distance: i32, width: i32, height: i32) -> Obstacle {
        Obstacle {
            distance,
            y: 0,
            width,
            height,
        }
    }

    #[test]
    fn test_restart_state() {
        let sim = Simulator::with_seed(0);
        let obs = sim.observation();
        assert!(!obs.done);
        assert!(!obs.jumping);
        assert_eq!(obs.time, 0.0);
        assert_eq!(obs.obstacles.len(), 1);
        assert_eq!(obs.obstacles[0].x_pos, 40.0 * 16.0 + 19.0);
    }

    #[test]
    fn test_jump_follows_phase_table() {
        let mut sim = Simulator::with_seed(1);
        sim.replace_obstacles(vec![]);
        sim.perform_action(Action::Jump).unwrap();

        let mut heights = vec![sim.observation().ypos];
        for _ in 0..6 {
            sim.perform_action(Action::Crouch).unwrap();
            heights.push(sim.observation().ypos);
        }
        assert_eq!(heights, vec![1.0, 2.0, 3.0, 2.0, 1.0, 0.0, 0.0]);
        assert!(!sim.observation().jumping);
        // Grounded again, so the last crouch took effect.
        assert_eq!(sim.state().dino_height, 1);
    }

    #[test]
    fn test_jump_clears_small_cactus() {
        let mut sim = Simulator::with_seed(2);
        sim.replace_obstacles(vec![cactus(2, 1, 1)]);
        for action in [Action::Jump, Action::Stand, Action::Stand] {
            sim.perform_action(action).unwrap();
        }
        assert!(!sim.is_terminal());
    }

    #[test]
    fn test_crouch_under_low_bird() {
        let bird = Obstacle::from_catalog(6, 1).unwrap();

        let mut crouching = Simulator::with_seed(3);
        crouching.replace_obstacles(vec![bird]);
        crouching.perform_action(Action::Crouch).unwrap();
        assert!(!crouching.is_terminal());

        let mut standing = Simulator::with_seed(3);
        standing.replace_obstacles(vec![bird]);
        standing.perform_action(Action::Stand).unwrap();
        assert!(standing.is_terminal());
    }

    #[test]
    fn test_collision_stops_score() {
        let mut sim = Simulator::with_seed(4);
        sim.replace_obstacles(vec![cactus(1, 1, 2)]);
        sim.perform_action(Action::Stand).unwrap();
        assert!(sim.is_terminal());
        assert_eq!(sim.state().score, 0);
        assert_eq!(sim.state().time_ms, STEP_MS);
    }

    #[test]
    fn test_actions_rejected_on_terminal_state() {
        let mut sim = Simulator::with_seed(5);
        sim.replace_obstacles(vec![cactus(1, 1, 2)]);
        sim.perform_action(Action::Stand).unwrap();
        assert!(matches!(
            sim.perform_action(Action::Stand),
            Err(Error::TerminalState)
        ));
        assert!(matches!(sim.apply_action(3), Err(Error::TerminalState)));
    }

    #[test]
    fn test_turn_order_enforced() {
        let mut sim = Simulator::with_seed(6);
        assert!(matches!(
            sim.env_action(EnvAction::Pass),
            Err(Error::WrongTurn { .. })
        ));
        assert!(matches!(
            sim.choose_env_action(),
            Err(Error::WrongTurn { .. })
        ));
        sim.player_action(Action::Stand).unwrap();
        assert!(matches!(
            sim.player_action(Action::Stand),
            Err(Error::WrongTurn { .. })
        ));
        sim.env_action(EnvAction::Pass).unwrap();
        assert_eq!(sim.state().turn, Turn::Player);
    }

    #[test]
    fn test_flat_action_space() {
        let mut sim = Simulator::with_seed(7);
        sim.replace_obstacles(vec![]);
        sim.apply_action(0).unwrap();
        sim.apply_action(4 + 7).unwrap();
        assert_eq!(sim.state().obstacles[0], Obstacle::from_catalog(7, 39).unwrap());
        sim.apply_action(0).unwrap();
        assert!(matches!(
            sim.apply_action(12),
            Err(Error::InvalidAction { action: 12 })
        ));
    }

    #[test]
    fn test_custom_spawn_policy_drives_environment_moves() {
        let dense = SpawnPolicy::new(vec![SpawnTier {
            min_score: 0,
            catalog_len: 1,
            min_gap: 0,
            max_gap: 1,
        }])
        .unwrap();
        let mut sim = Simulator::with_seed(10).with_spawn_policy(dense);
        sim.replace_obstacles(vec![]);
        for _ in 0..5 {
            sim.player_action(Action::Stand).unwrap();
            let action = sim.choose_env_action().unwrap();
            assert_eq!(action, EnvAction::Spawn(0));
            sim.env_action(action).unwrap();
        }
        assert_eq!(sim.state().obstacles.len(), 5);

        // The default first tier keeps a gap of at least 15 steps.
        let mut sparse = Simulator::with_seed(10);
        sparse.replace_obstacles(vec![]);
        sparse.player_action(Action::Stand).unwrap();
        let first = sparse.choose_env_action().unwrap();
        sparse.env_action(first).unwrap();
        sparse.player_action(Action::Stand).unwrap();
        assert_eq!(sparse.choose_env_action().unwrap(), EnvAction::Pass);
    }

    #[test]
    fn test_passed_obstacles_dropped() {
        let mut sim = Simulator::with_seed(8);
        sim.replace_obstacles(vec![cactus(2, 1, 1)]);
        for _ in 0..6 {
            sim.player_action(Action::Jump).unwrap();
            sim.env_action(EnvAction::Pass).unwrap();
        }
        assert!(sim.state().obstacles.is_empty());
    }

    #[test]
    fn test_render_shows_dino_and_obstacle() {
        let mut sim = Simulator::with_seed(9);
        sim.replace_obstacles(vec![cactus(10, 1, 2)]);
        let picture = sim.to_string();
        let rows: Vec<&str> = picture.lines().collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4].chars().nth(3), Some('D'));
        assert_eq!(rows[3].chars().nth(3), Some('D'));
        assert_eq!(rows[4].chars().nth(13), Some('|'));
        assert!(rows.iter().all(|r| r.ends_with('#')));
    }
}
