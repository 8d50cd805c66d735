//! The per-tick game rules, independent of any terminal or timer.
//!
//! [`SnakeSimulation::step`] is the only place state changes during play. The
//! caller owns the clock: it calls `step` once per tick and restarts its
//! timer whenever a [`StepReport`] carries a new interval.

use std::time::Duration;

use clap::ValueEnum;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::snake::{Cell, Direction, Snake};
use crate::store::HighScoreStore;

/// Resampling cap for food placement. Past this the last sample is kept even
/// if the snake covers it, so placement always terminates.
pub const MAX_FOOD_PLACEMENT_ATTEMPTS: usize = 500;

/// Chain length at which play speeds up to at least [`SpeedLevel::Normal`].
pub const NORMAL_SPEED_LENGTH: usize = 8;
/// Chain length at which play speeds up to [`SpeedLevel::Hard`].
pub const HARD_SPEED_LENGTH: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoundsError {
    #[error("grid needs at least one column and one row, got {cols}x{rows}")]
    Empty { cols: i32, rows: i32 },
    #[error("cell size must be positive, got {0}")]
    CellSize(i32),
    #[error("a {cols}x{rows} grid of {cell_size}px cells does not fit in pixel coordinates")]
    TooLarge { cols: i32, rows: i32, cell_size: i32 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GridBounds {
    cols: i32,
    rows: i32,
    cell_size: i32,
}

impl GridBounds {
    pub fn new(cols: i32, rows: i32, cell_size: i32) -> Result<Self, BoundsError> {
        if cols < 1 || rows < 1 {
            return Err(BoundsError::Empty { cols, rows });
        }
        if cell_size < 1 {
            return Err(BoundsError::CellSize(cell_size));
        }
        // One spare cell past each edge, so a head stepping off the grid still fits.
        let fits = |n: i32| n.checked_add(1).and_then(|n| n.checked_mul(cell_size)).is_some();
        if !fits(cols) || !fits(rows) {
            return Err(BoundsError::TooLarge { cols, rows, cell_size });
        }
        Ok(GridBounds { cols, rows, cell_size })
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    pub fn width(&self) -> i32 {
        self.cols * self.cell_size
    }

    pub fn height(&self) -> i32 {
        self.rows * self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn cell_at(&self, col: i32, row: i32) -> Cell {
        Cell::new(col * self.cell_size, row * self.cell_size)
    }

    /// Grid coordinates of a pixel-space cell.
    pub fn column_row(&self, cell: Cell) -> (i32, i32) {
        (cell.x / self.cell_size, cell.y / self.cell_size)
    }

    pub fn center(&self) -> Cell {
        self.cell_at(self.cols / 2, self.rows / 2)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (0..self.width()).contains(&cell.x) && (0..self.height()).contains(&cell.y)
    }

    /// Folds a cell that stepped off one edge back in at the opposite edge.
    pub fn wrap(&self, cell: Cell) -> Cell {
        Cell::new(cell.x.rem_euclid(self.width()), cell.y.rem_euclid(self.height()))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum SpeedLevel {
    Easy,
    Normal,
    Hard,
}

impl SpeedLevel {
    pub fn interval(self) -> Duration {
        match self {
            SpeedLevel::Easy => Duration::from_millis(180),
            SpeedLevel::Normal => Duration::from_millis(120),
            SpeedLevel::Hard => Duration::from_millis(70),
        }
    }

    /// Level a chain of `len` segments calls for, before the never-slow-down
    /// rule is applied.
    pub fn for_length(len: usize, base: SpeedLevel) -> SpeedLevel {
        if len >= HARD_SPEED_LENGTH {
            SpeedLevel::Hard
        } else if len >= NORMAL_SPEED_LENGTH {
            SpeedLevel::Normal
        } else {
            base
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Collision {
    Wall,
    Body,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Moved,
    AteFood,
    GameOver(Collision),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    pub outcome: Outcome,
    /// Set when the speed level changed; the scheduler should restart its
    /// timer at this interval.
    pub new_interval: Option<Duration>,
}

impl StepReport {
    fn without_speed_change(outcome: Outcome) -> Self {
        StepReport { outcome, new_interval: None }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SimState {
    Ready,
    Running,
    GameOver,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub bounds: GridBounds,
    pub wrap: bool,
    pub base_speed: SpeedLevel,
}

pub struct SnakeSimulation<R: Rng> {
    config: SessionConfig,
    snake: Snake,
    food: Cell,
    score: u32,
    high_score: u32,
    speed: SpeedLevel,
    state: SimState,
    collision: Option<Collision>,
    store: Box<dyn HighScoreStore>,
    rng: R,
}

impl<R: Rng> SnakeSimulation<R> {
    pub fn new(config: SessionConfig, store: Box<dyn HighScoreStore>, rng: R) -> Self {
        let head = config.bounds.center();
        let mut sim = SnakeSimulation {
            config,
            snake: Snake::new(head, Direction::Right),
            food: head,
            score: 0,
            high_score: 0,
            speed: config.base_speed,
            state: SimState::Ready,
            collision: None,
            store,
            rng,
        };
        sim.initialize(config);
        sim
    }

    /// Starts a fresh session: one segment in the middle heading right, score
    /// zero, speed at the chosen base, food somewhere free.
    pub fn initialize(&mut self, config: SessionConfig) {
        self.config = config;
        self.snake = Snake::new(config.bounds.center(), Direction::Right);
        self.score = 0;
        self.high_score = self.store.load();
        self.speed = config.base_speed;
        self.state = SimState::Ready;
        self.collision = None;
        self.place_food();

        info!(
            cols = config.bounds.cols(),
            rows = config.bounds.rows(),
            wrap = config.wrap,
            speed = ?config.base_speed,
            high_score = self.high_score,
            "new session"
        );
    }

    pub fn reset(&mut self) {
        self.initialize(self.config);
    }

    pub fn set_direction(&mut self, requested: Direction) {
        if self.state != SimState::GameOver {
            self.snake.set_direction(requested);
        }
    }

    pub fn step(&mut self) -> StepReport {
        if let Some(collision) = self.collision {
            return StepReport::without_speed_change(Outcome::GameOver(collision));
        }
        self.state = SimState::Running;

        let bounds = self.config.bounds;
        let dir = self.snake.take_direction();
        let mut head = self.snake.head().offset(dir, bounds.cell_size());

        if !bounds.contains(head) {
            if self.config.wrap {
                head = bounds.wrap(head);
            } else {
                return self.game_over(Collision::Wall, head);
            }
        }

        if self.snake.contains(&head) {
            return self.game_over(Collision::Body, head);
        }

        let ate = head == self.food;
        self.snake.push_head(head);

        let outcome = if ate {
            self.score += 1;
            if self.score > self.high_score {
                self.high_score = self.score;
                if let Err(err) = self.store.save(self.high_score) {
                    warn!(%err, high_score = self.high_score, "could not persist high score");
                }
            }
            self.place_food();
            debug!(score = self.score, len = self.snake.len(), "ate food");
            Outcome::AteFood
        } else {
            self.snake.pop_tail();
            Outcome::Moved
        };

        StepReport { outcome, new_interval: self.escalate_speed() }
    }

    fn game_over(&mut self, collision: Collision, at: Cell) -> StepReport {
        self.state = SimState::GameOver;
        self.collision = Some(collision);
        info!(?collision, x = at.x, y = at.y, score = self.score, "game over");
        StepReport::without_speed_change(Outcome::GameOver(collision))
    }

    fn escalate_speed(&mut self) -> Option<Duration> {
        let target = SpeedLevel::for_length(self.snake.len(), self.config.base_speed);
        let next = self.speed.max(target);
        if next == self.speed {
            return None;
        }

        debug!(from = ?self.speed, to = ?next, len = self.snake.len(), "speeding up");
        self.speed = next;
        Some(next.interval())
    }

    fn place_food(&mut self) {
        let bounds = self.config.bounds;
        let mut candidate = self.food;

        for _ in 0..MAX_FOOD_PLACEMENT_ATTEMPTS {
            let col = self.rng.gen_range(0..bounds.cols());
            let row = self.rng.gen_range(0..bounds.rows());
            candidate = bounds.cell_at(col, row);
            if !self.snake.contains(&candidate) {
                self.food = candidate;
                return;
            }
        }

        warn!(
            x = candidate.x,
            y = candidate.y,
            "no free cell found for food, placing on the snake"
        );
        self.food = candidate;
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn food(&self) -> Cell {
        self.food
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn speed_level(&self) -> SpeedLevel {
        self.speed
    }

    pub fn interval(&self) -> Duration {
        self.speed.interval()
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    /// What ended the session, if it has ended.
    pub fn collision(&self) -> Option<Collision> {
        self.collision
    }

    pub fn bounds(&self) -> GridBounds {
        self.config.bounds
    }

    pub fn direction(&self) -> Direction {
        self.snake.next_direction()
    }

    pub fn wraps(&self) -> bool {
        self.config.wrap
    }
}
