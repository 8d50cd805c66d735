use std::collections::VecDeque;

use Direction::*;

/// Minimum swipe length, in device pixels, before a drag counts as a turn.
pub const SWIPE_THRESHOLD: f32 = 30.0;

/// A grid-aligned position in pixel space (always a multiple of the cell size).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    pub fn offset(self, dir: Direction, cell_size: i32) -> Self {
        let (dx, dy) = dir.unit();
        Cell::new(self.x + dx * cell_size, self.y + dy * cell_size)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn reverse(self) -> Direction {
        match self {
            Up => Down,
            Down => Up,
            Left => Right,
            Right => Left,
        }
    }

    pub fn is_reverse_of(self, other: Direction) -> bool {
        self.reverse() == other
    }

    /// Unit vector in grid steps, y growing downwards.
    pub fn unit(self) -> (i32, i32) {
        match self {
            Up => (0, -1),
            Down => (0, 1),
            Left => (-1, 0),
            Right => (1, 0),
        }
    }

    /// Interprets a drag of `(dx, dy)` device pixels. The axis with the larger
    /// displacement wins, and it has to be longer than `threshold`.
    pub fn from_swipe(dx: f32, dy: f32, threshold: f32) -> Option<Direction> {
        if dx.abs() > dy.abs() {
            if dx > threshold {
                Some(Right)
            } else if dx < -threshold {
                Some(Left)
            } else {
                None
            }
        } else if dy > threshold {
            Some(Down)
        } else if dy < -threshold {
            Some(Up)
        } else {
            None
        }
    }
}

/// The segment chain, head first, plus the heading it is travelling in.
#[derive(Clone, Debug)]
pub struct Snake {
    body: VecDeque<Cell>,
    direction: Direction,
    pending: Option<Direction>,
}

impl Snake {
    pub fn new(head: Cell, direction: Direction) -> Self {
        let mut body = VecDeque::new();
        body.push_back(head);
        Snake { body, direction, pending: None }
    }

    #[cfg(test)]
    pub fn from_cells(cells: &[Cell], direction: Direction) -> Self {
        assert!(!cells.is_empty(), "a snake needs at least one segment");
        Snake { body: cells.iter().copied().collect(), direction, pending: None }
    }

    pub fn head(&self) -> Cell {
        self.body[0]
    }

    pub fn body(&self) -> &VecDeque<Cell> {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn contains(&self, cell: &Cell) -> bool {
        self.body.contains(cell)
    }

    /// Direction the snake moved in on the last tick.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The direction the next tick will use if nothing else is requested.
    pub fn next_direction(&self) -> Direction {
        self.pending.unwrap_or(self.direction)
    }

    /// Buffers a turn for the next tick. Reversing onto the neck is ignored and
    /// the previously buffered request stays in place.
    pub fn set_direction(&mut self, requested: Direction) {
        if !requested.is_reverse_of(self.direction) {
            self.pending = Some(requested);
        }
    }

    pub fn take_direction(&mut self) -> Direction {
        if let Some(dir) = self.pending.take() {
            self.direction = dir;
        }
        self.direction
    }

    pub fn push_head(&mut self, cell: Cell) {
        self.body.push_front(cell);
    }

    /// Drops the last segment; a one-segment snake keeps its only cell.
    pub fn pop_tail(&mut self) {
        if self.body.len() > 1 {
            self.body.pop_back();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_pairs_are_symmetric() {
        for dir in [Up, Down, Left, Right] {
            assert_eq!(dir.reverse().reverse(), dir);
            assert!(dir.is_reverse_of(dir.reverse()));
            assert!(!dir.is_reverse_of(dir));
        }
    }

    #[test]
    fn offset_moves_one_cell() {
        let c = Cell::new(40, 40);
        assert_eq!(c.offset(Up, 20), Cell::new(40, 20));
        assert_eq!(c.offset(Down, 20), Cell::new(40, 60));
        assert_eq!(c.offset(Left, 20), Cell::new(20, 40));
        assert_eq!(c.offset(Right, 20), Cell::new(60, 40));
    }

    #[test]
    fn reverse_request_keeps_last_valid_one() {
        let mut snake = Snake::new(Cell::new(0, 0), Right);
        snake.set_direction(Left);
        assert_eq!(snake.next_direction(), Right);

        snake.set_direction(Up);
        snake.set_direction(Left);
        assert_eq!(snake.take_direction(), Up);
    }

    #[test]
    fn latest_valid_request_wins() {
        let mut snake = Snake::new(Cell::new(0, 0), Right);
        snake.set_direction(Up);
        snake.set_direction(Down);
        assert_eq!(snake.take_direction(), Down);
        // nothing pending, keeps going
        assert_eq!(snake.take_direction(), Down);
    }

    #[test]
    fn swipe_picks_dominant_axis() {
        assert_eq!(Direction::from_swipe(80.0, 10.0, SWIPE_THRESHOLD), Some(Right));
        assert_eq!(Direction::from_swipe(-80.0, 79.0, SWIPE_THRESHOLD), Some(Left));
        assert_eq!(Direction::from_swipe(5.0, 45.0, SWIPE_THRESHOLD), Some(Down));
        assert_eq!(Direction::from_swipe(0.0, -31.0, SWIPE_THRESHOLD), Some(Up));
    }

    #[test]
    fn short_swipe_is_a_tap() {
        assert_eq!(Direction::from_swipe(30.0, 0.0, SWIPE_THRESHOLD), None);
        assert_eq!(Direction::from_swipe(-12.0, 20.0, SWIPE_THRESHOLD), None);
        assert_eq!(Direction::from_swipe(0.0, 0.0, SWIPE_THRESHOLD), None);
    }

    #[test]
    fn tail_never_pops_last_segment() {
        let mut snake = Snake::new(Cell::new(0, 0), Right);
        snake.pop_tail();
        assert_eq!(snake.body().iter().copied().collect::<Vec<_>>(), vec![Cell::new(0, 0)]);

        snake.push_head(Cell::new(20, 0));
        snake.pop_tail();
        assert_eq!(snake.body().iter().copied().collect::<Vec<_>>(), vec![Cell::new(20, 0)]);
    }
}
