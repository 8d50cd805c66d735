use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::style::Color;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::{Cli, MenuChoices};
use crate::simulation::{
    Collision, GridBounds, Outcome, SessionConfig, SimState, SnakeSimulation, SpeedLevel,
    StepReport,
};
use crate::snake::{Cell, Direction::{self, *}, SWIPE_THRESHOLD};
use crate::store::{FileStore, HighScoreStore, MemoryStore};
use crate::term::{ScreenPos, TermManager};
use crate::theme::Theme;

/// Shown scores are the food count times this.
const DISPLAY_SCORE_MULTIPLIER: u32 = 10;
/// Each grid cell is two terminal columns wide so cells look roughly square.
const CHARS_PER_CELL: u16 = 2;
const PAUSED_POLL_MS: u64 = 100;

const SNAKE_BODY_CHAR: char = '█';
const APPLE_CHARS: [char; 2] = ['(', ')'];
const DEAD_SNAKE_CHAR: char = 'X';

/// Fixed-delay schedule for simulation ticks.
#[derive(Copy, Clone, Debug)]
pub struct Ticker {
    interval: Duration,
    next_due: Instant,
}

impl Ticker {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Ticker { interval, next_due: now + interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn due(&self, now: Instant) -> bool {
        now >= self.next_due
    }

    pub fn time_until(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }

    /// Schedules the next tick one interval after `now`.
    pub fn advance(&mut self, now: Instant) {
        self.next_due = now + self.interval;
    }

    /// Drops the pending tick and starts over at `interval`.
    pub fn restart(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        self.next_due = now + interval;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Command {
    Turn(Direction),
    Pause,
    Quit,
}

/// Turns a mouse press/release pair into a swipe.
#[derive(Debug)]
struct SwipeTracker {
    cell_size: i32,
    start: Option<ScreenPos>,
}

impl SwipeTracker {
    fn new(cell_size: i32) -> Self {
        SwipeTracker { cell_size, start: None }
    }

    fn press(&mut self, pos: ScreenPos) {
        self.start = Some(pos);
    }

    /// Feeds a left-button press or release; returns a turn once a swipe ends.
    fn handle(&mut self, ev: &MouseEvent) -> Option<Direction> {
        let pos = (ev.column, ev.row);
        match ev.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.press(pos);
                None
            }
            MouseEventKind::Up(MouseButton::Left) => self.release(pos),
            _ => None,
        }
    }

    fn release(&mut self, pos: ScreenPos) -> Option<Direction> {
        let start = self.start.take()?;
        let px_per_col = self.cell_size as f32 / CHARS_PER_CELL as f32;
        let dx = (pos.0 as f32 - start.0 as f32) * px_per_col;
        let dy = (pos.1 as f32 - start.1 as f32) * self.cell_size as f32;
        Direction::from_swipe(dx, dy, SWIPE_THRESHOLD)
    }
}

fn key_command(ev: &KeyEvent) -> Option<Command> {
    if is_ctrl_c(ev) {
        return Some(Command::Quit);
    }

    match ev.code {
        KeyCode::Up | KeyCode::Char('w' | 'W' | 'i') => Some(Command::Turn(Up)),
        KeyCode::Left | KeyCode::Char('a' | 'A' | 'j') => Some(Command::Turn(Left)),
        KeyCode::Down | KeyCode::Char('s' | 'S' | 'k') => Some(Command::Turn(Down)),
        KeyCode::Right | KeyCode::Char('d' | 'D' | 'l') => Some(Command::Turn(Right)),
        KeyCode::Esc => Some(Command::Pause),
        _ => None,
    }
}

/// Grid that fits inside the border, leaving the bottom row for the status line.
pub fn bounds_for_terminal(size: ScreenPos, cell_size: i32) -> Result<GridBounds> {
    let cols = size.0.saturating_sub(2) / CHARS_PER_CELL;
    let rows = size.1.saturating_sub(3);
    GridBounds::new(cols as i32, rows as i32, cell_size)
        .with_context(|| format!("terminal of {}x{} is too small to play in", size.0, size.1))
}

enum SessionEnd {
    Menu,
    Quit,
}

pub struct SnakeGame {
    cli: Cli,
    term: TermManager,
    rng: StdRng,
    memory_store: MemoryStore,
    paused: bool,
}

impl SnakeGame {
    pub fn new(cli: Cli) -> Result<Self> {
        let rng = match cli.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let term = TermManager::new(Theme::Default.palette())?;
        Ok(SnakeGame { cli, term, rng, memory_store: MemoryStore::default(), paused: false })
    }

    pub fn run(&mut self) -> Result<()> {
        self.term.setup()?;
        let result = self.run_sessions();
        self.term.restore();
        result
    }

    fn run_sessions(&mut self) -> Result<()> {
        let mut choices = MenuChoices::from_cli(&self.cli);

        loop {
            let (theme, wrap, difficulty) = match self.menu(choices)? {
                Some(picked) => picked,
                None => return Ok(()),
            };

            match self.play(theme, wrap, difficulty)? {
                SessionEnd::Menu => choices = MenuChoices::default(),
                SessionEnd::Quit => return Ok(()),
            }
        }
    }

    /// Asks for whatever is still unset. `None` means the player quit.
    fn menu(&mut self, mut choices: MenuChoices) -> Result<Option<(Theme, bool, SpeedLevel)>> {
        self.term.clear()?;

        if choices.theme.is_none() {
            let lines = ["Pick a theme", "", "1  classic", "2  night", "3  neon", "4  default"];
            choices.theme = match self.ask(&lines, &['1', '2', '3', '4'])? {
                Some(i) => Some(Theme::ALL[i]),
                None => return Ok(None),
            };
        }

        if choices.wrap.is_none() {
            let lines = ["Walls", "", "1  wrap around edges", "2  edges are deadly"];
            choices.wrap = match self.ask(&lines, &['1', '2'])? {
                Some(i) => Some(i == 0),
                None => return Ok(None),
            };
        }

        if choices.difficulty.is_none() {
            let lines = ["Difficulty", "", "1  easy", "2  normal", "3  hard"];
            let levels = [SpeedLevel::Easy, SpeedLevel::Normal, SpeedLevel::Hard];
            choices.difficulty = match self.ask(&lines, &['1', '2', '3'])? {
                Some(i) => Some(levels[i]),
                None => return Ok(None),
            };
        }

        self.term.hide_message()?;
        Ok(choices.complete())
    }

    fn ask(&mut self, lines: &[&str], keys: &[char]) -> Result<Option<usize>> {
        self.term.show_message(lines)?;
        loop {
            let ev = self.term.read_key_blocking()?;
            if is_ctrl_c(&ev) {
                return Ok(None);
            }
            if let KeyCode::Char(c) = ev.code {
                if let Some(i) = keys.iter().position(|k| *k == c) {
                    return Ok(Some(i));
                }
            }
        }
    }

    fn open_store(&self) -> Box<dyn HighScoreStore> {
        if self.cli.no_persist {
            Box::new(self.memory_store.clone())
        } else {
            Box::new(FileStore::new(&self.cli.high_score_file))
        }
    }

    fn play(&mut self, theme: Theme, wrap: bool, difficulty: SpeedLevel) -> Result<SessionEnd> {
        self.term.set_palette(theme.palette());
        self.term.refresh_size()?;
        let bounds = bounds_for_terminal(self.term.get_terminal_size(), self.cli.cell_size)?;
        let config = SessionConfig { bounds, wrap, base_speed: difficulty };
        let rng = StdRng::from_rng(&mut self.rng).context("failed to seed food placement")?;
        let mut sim = SnakeSimulation::new(config, self.open_store(), rng);
        info!(theme = theme.name(), cells = bounds.cell_count(), "starting game");

        if !self.show_intro()? {
            return Ok(SessionEnd::Quit);
        }

        loop {
            if let Some(end) = self.run_until_game_over(&mut sim)? {
                return Ok(end);
            }

            self.show_game_over(&sim)?;
            let key = self.term.read_key_blocking()?;
            if is_ctrl_c(&key) {
                return Ok(SessionEnd::Quit);
            }
            if matches!(key.code, KeyCode::Char('m') | KeyCode::Char('M')) {
                return Ok(SessionEnd::Menu);
            }
            sim.reset();
        }
    }

    /// `false` if the player quit instead of starting.
    fn show_intro(&mut self) -> Result<bool> {
        self.term.show_message(&[
            "Arrow keys, WASD or IJKL to move",
            "Drag with the mouse to swipe",
            "Esc to pause",
            "CTRL+C to quit",
            "",
            "Press any key to begin",
        ])?;
        if is_ctrl_c(&self.term.read_key_blocking()?) {
            return Ok(false);
        }
        self.term.hide_message()?;
        Ok(true)
    }

    /// Ticks until the session ends. `Some` means the player left mid-game.
    fn run_until_game_over(
        &mut self,
        sim: &mut SnakeSimulation<StdRng>,
    ) -> Result<Option<SessionEnd>> {
        self.paused = false;
        self.draw_board(sim)?;

        let mut swipe = SwipeTracker::new(self.cli.cell_size);
        let mut ticker = Ticker::new(sim.interval(), Instant::now());

        loop {
            let timeout = if self.paused {
                Duration::from_millis(PAUSED_POLL_MS)
            } else {
                ticker.time_until(Instant::now())
            };

            for ev in self.term.read_events(timeout)? {
                let command = match ev {
                    Event::Key(key) => key_command(&key),
                    Event::Mouse(mouse) => swipe.handle(&mouse).map(Command::Turn),
                    _ => None,
                };

                match command {
                    Some(Command::Quit) => return Ok(Some(SessionEnd::Quit)),
                    Some(Command::Pause) => {
                        self.toggle_pause()?;
                        ticker.restart(sim.interval(), Instant::now());
                    }
                    Some(Command::Turn(dir)) if !self.paused => sim.set_direction(dir),
                    _ => {}
                }
            }

            let now = Instant::now();
            if self.paused || !ticker.due(now) {
                continue;
            }
            ticker.advance(now);

            let old_head = sim.snake().head();
            let old_tail = sim.snake().body().back().copied();
            let old_food = sim.food();
            let report = sim.step();

            if let Some(interval) = report.new_interval {
                debug!(
                    from_ms = ticker.interval().as_millis() as u64,
                    to_ms = interval.as_millis() as u64,
                    "restarting ticker"
                );
                ticker.restart(interval, now);
            }

            if let Outcome::GameOver(_) = report.outcome {
                return Ok(None);
            }
            self.draw_update(sim, &report, old_head, old_tail, old_food)?;
        }
    }

    ///////////////////////////////////////////////////////////////////////////

    fn screen_pos(bounds: &GridBounds, cell: Cell) -> ScreenPos {
        let (col, row) = bounds.column_row(cell);
        (1 + col as u16 * CHARS_PER_CELL, 1 + row as u16)
    }

    fn paint_cell(&mut self, bounds: &GridBounds, cell: Cell, chars: [char; 2], fg: Color) {
        let (x, y) = Self::screen_pos(bounds, cell);
        for (i, ch) in chars.iter().enumerate() {
            self.term.print_at((x + i as u16, y), *ch, fg);
        }
    }

    fn draw_board(&mut self, sim: &SnakeSimulation<StdRng>) -> Result<()> {
        let bounds = sim.bounds();
        let palette = self.term.palette();

        self.term.clear()?;
        self.term.draw_borders(bounds.cols() as u16 * CHARS_PER_CELL + 2, bounds.rows() as u16 + 2);

        self.paint_cell(&bounds, sim.food(), APPLE_CHARS, palette.food);
        let head_chars = [head_char(sim.direction()); 2];
        for (i, cell) in sim.snake().body().iter().enumerate() {
            let chars = if i == 0 { head_chars } else { [SNAKE_BODY_CHAR; 2] };
            self.paint_cell(&bounds, *cell, chars, palette.snake);
        }

        self.draw_status(sim);
        self.term.flush()
    }

    fn draw_update(
        &mut self,
        sim: &SnakeSimulation<StdRng>,
        report: &StepReport,
        old_head: Cell,
        old_tail: Option<Cell>,
        old_food: Cell,
    ) -> Result<()> {
        let bounds = sim.bounds();
        let palette = self.term.palette();

        if report.outcome == Outcome::Moved {
            if let Some(tail) = old_tail.filter(|t| !sim.snake().contains(t)) {
                self.paint_cell(&bounds, tail, [' '; 2], palette.text);
            }
        }
        if sim.snake().len() > 1 {
            self.paint_cell(&bounds, old_head, [SNAKE_BODY_CHAR; 2], palette.snake);
        }
        if sim.food() != old_food {
            self.paint_cell(&bounds, sim.food(), APPLE_CHARS, palette.food);
        }
        let head_chars = [head_char(sim.snake().direction()); 2];
        self.paint_cell(&bounds, sim.snake().head(), head_chars, palette.snake);

        self.draw_status(sim);
        self.term.flush()
    }

    fn draw_status(&mut self, sim: &SnakeSimulation<StdRng>) {
        let (_, height) = self.term.get_terminal_size();
        let line = format!(
            "Score: {} | High Score: {} | Speed: {:?} | Wrap: {}",
            sim.score() * DISPLAY_SCORE_MULTIPLIER,
            sim.high_score() * DISPLAY_SCORE_MULTIPLIER,
            sim.speed_level(),
            if sim.wraps() { "on" } else { "off" },
        );
        self.term.print_line(height.saturating_sub(1), &line);
    }

    fn show_game_over(&mut self, sim: &SnakeSimulation<StdRng>) -> Result<()> {
        debug_assert_eq!(sim.state(), SimState::GameOver);
        let bounds = sim.bounds();
        let fg = self.term.palette().snake;
        for cell in sim.snake().body() {
            self.paint_cell(&bounds, *cell, [DEAD_SNAKE_CHAR; 2], fg);
        }
        self.draw_status(sim);

        let cause = match sim.collision() {
            Some(Collision::Wall) => "You hit the wall!",
            Some(Collision::Body) | None => "You bit yourself!",
        };

        self.term.show_message(&[
            "Game over!",
            cause,
            &format!("Score: {}", sim.score() * DISPLAY_SCORE_MULTIPLIER),
            &format!("High score: {}", sim.high_score() * DISPLAY_SCORE_MULTIPLIER),
            "",
            "Press any key to play again,",
            "M for the menu, or CTRL+C to quit.",
        ])
    }

    fn toggle_pause(&mut self) -> Result<()> {
        if !self.paused {
            self.term.show_message(&["Paused", "Press Esc to resume", "or Ctrl+C to quit"])?;
        } else {
            self.term.hide_message()?;
        }

        self.paused = !self.paused;
        Ok(())
    }
}

fn head_char(dir: Direction) -> char {
    match dir {
        Up => '^',
        Down => 'v',
        Left => '<',
        Right => '>',
    }
}

fn is_ctrl_c(ev: &KeyEvent) -> bool {
    matches!(ev, KeyEvent { code: KeyCode::Char('c'), modifiers: KeyModifiers::CONTROL })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE }
    }

    #[test]
    fn ticker_fires_after_interval() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(120), start);
        assert!(!ticker.due(start));
        assert_eq!(ticker.time_until(start), Duration::from_millis(120));

        let later = start + Duration::from_millis(125);
        assert!(ticker.due(later));
        assert_eq!(ticker.time_until(later), Duration::from_millis(0));

        ticker.advance(later);
        assert!(!ticker.due(later + Duration::from_millis(119)));
        assert!(ticker.due(later + Duration::from_millis(120)));
    }

    #[test]
    fn ticker_restart_drops_old_phase() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(180), start);
        let now = start + Duration::from_millis(150);
        ticker.restart(Duration::from_millis(70), now);
        assert_eq!(ticker.interval(), Duration::from_millis(70));
        assert!(!ticker.due(start + Duration::from_millis(180)));
        assert!(ticker.due(now + Duration::from_millis(70)));
    }

    #[test]
    fn keys_map_to_turns() {
        assert_eq!(key_command(&key(KeyCode::Up)), Some(Command::Turn(Up)));
        assert_eq!(key_command(&key(KeyCode::Char('A'))), Some(Command::Turn(Left)));
        assert_eq!(key_command(&key(KeyCode::Char('s'))), Some(Command::Turn(Down)));
        assert_eq!(key_command(&key(KeyCode::Char('l'))), Some(Command::Turn(Right)));
        assert_eq!(key_command(&key(KeyCode::Esc)), Some(Command::Pause));
        assert_eq!(key_command(&key(KeyCode::Char('q'))), None);
    }

    #[test]
    fn ctrl_c_quits() {
        let ev = KeyEvent { code: KeyCode::Char('c'), modifiers: KeyModifiers::CONTROL };
        assert_eq!(key_command(&ev), Some(Command::Quit));
        assert_eq!(key_command(&key(KeyCode::Char('c'))), None);
    }

    #[test]
    fn mouse_drag_scales_to_pixels() {
        let mut swipe = SwipeTracker::new(20);
        // two rows down is 40px, past the threshold
        swipe.press((10, 5));
        assert_eq!(swipe.release((10, 7)), Some(Down));

        // one row is 20px, a tap
        swipe.press((10, 5));
        assert_eq!(swipe.release((10, 4)), None);

        // four columns are two cells, 40px
        swipe.press((10, 5));
        assert_eq!(swipe.release((6, 5)), Some(Left));

        // release without press
        assert_eq!(swipe.release((0, 0)), None);
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent { kind, column, row, modifiers: KeyModifiers::NONE }
    }

    #[test]
    fn left_button_drag_turns() {
        let mut swipe = SwipeTracker::new(20);
        assert_eq!(swipe.handle(&mouse(MouseEventKind::Down(MouseButton::Left), 10, 5)), None);
        assert_eq!(swipe.handle(&mouse(MouseEventKind::Drag(MouseButton::Left), 14, 5)), None);
        assert_eq!(swipe.handle(&mouse(MouseEventKind::Up(MouseButton::Left), 16, 5)), Some(Right));

        // other buttons are ignored
        assert_eq!(swipe.handle(&mouse(MouseEventKind::Down(MouseButton::Right), 10, 5)), None);
        assert_eq!(swipe.handle(&mouse(MouseEventKind::Up(MouseButton::Right), 10, 9)), None);
    }

    #[test]
    fn terminal_bounds_leave_room_for_frame() {
        let bounds = bounds_for_terminal((82, 24), 20).unwrap();
        assert_eq!((bounds.cols(), bounds.rows()), (40, 21));
        assert_eq!(SnakeGame::screen_pos(&bounds, bounds.cell_at(39, 20)), (79, 21));
    }

    #[test]
    fn tiny_terminal_is_an_error() {
        assert!(bounds_for_terminal((3, 3), 20).is_err());
    }
}
