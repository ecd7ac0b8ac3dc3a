use glam::Vec3;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::domain::collision::Aabb;
use crate::error::MazeError;

/// Carving always starts here; it is also the player's spawn cell
pub const START_CELL: (usize, usize) = (1, 1);

/// Probability that a wall next to a passage is knocked out after carving
pub const DEFAULT_EXTRA_OPENING_CHANCE: f64 = 0.05;

const WALL_CHAR: char = '#';
const OPEN_CHAR: char = '.';

/// Two-step neighbour offsets used while carving
const CARVE_DIRECTIONS: [(isize, isize); 4] = [(-2, 0), (2, 0), (0, -2), (0, 2)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Wall,
    Open,
}

/// Row-major passable/blocked grid. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MazeGrid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

/// Pending work for one visited cell of the carving walk
struct CarveFrame {
    x: usize,
    y: usize,
    directions: [(isize, isize); 4],
    next: usize,
}

/// Generate a maze, seeded when reproducibility is needed
pub fn generate(width: usize, height: usize, seed: Option<u64>) -> Result<MazeGrid, MazeError> {
    match seed {
        Some(seed) => generate_with_rng(
            width,
            height,
            DEFAULT_EXTRA_OPENING_CHANCE,
            &mut StdRng::seed_from_u64(seed),
        ),
        None => generate_with_rng(width, height, DEFAULT_EXTRA_OPENING_CHANCE, &mut rand::thread_rng()),
    }
}

/// Randomized depth-first carving from (1,1), a passage from the exit's
/// inward neighbour back to the carving, sparse extra openings, then the
/// forced exit at (width - 1, height - 2)
pub fn generate_with_rng<R: Rng + ?Sized>(
    width: usize,
    height: usize,
    extra_opening_chance: f64,
    rng: &mut R,
) -> Result<MazeGrid, MazeError> {
    if width < 3 || height < 3 {
        return Err(MazeError::TooSmall { width, height });
    }

    let mut grid = MazeGrid::filled(width, height, Cell::Wall);
    grid.carve(rng);
    grid.link_exit();
    grid.add_extra_openings(extra_opening_chance.clamp(0.0, 1.0), rng);

    let (exit_x, exit_y) = grid.exit_cell();
    grid.set(exit_x, exit_y, Cell::Open);

    log::debug!(
        "Generated {}x{} maze with {} open cells",
        width,
        height,
        grid.open_cells().count()
    );
    Ok(grid)
}

impl MazeGrid {
    pub fn filled(width: usize, height: usize, cell: Cell) -> Self {
        Self {
            width,
            height,
            cells: vec![cell; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    pub fn is_open(&self, x: usize, y: usize) -> bool {
        self.get(x, y) == Some(Cell::Open)
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    /// First open cell in row-major order; (1,1) for every carved grid
    pub fn start_cell(&self) -> (usize, usize) {
        self.open_cells().next().unwrap_or(START_CELL)
    }

    /// Boundary cell forced open as the guaranteed exit
    pub fn exit_cell(&self) -> (usize, usize) {
        (self.width - 1, self.height - 2)
    }

    pub fn open_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Open)
            .map(move |(i, _)| (i % self.width, i / self.width))
    }

    pub fn wall_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Wall)
            .map(move |(i, _)| (i % self.width, i / self.width))
    }

    fn carve<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let (start_x, start_y) = START_CELL;
        self.set(start_x, start_y, Cell::Open);

        let mut stack = vec![CarveFrame::new(start_x, start_y, rng)];

        while let Some(frame) = stack.last_mut() {
            if frame.next == frame.directions.len() {
                stack.pop();
                continue;
            }

            let (dx, dy) = frame.directions[frame.next];
            frame.next += 1;
            let (x, y) = (frame.x, frame.y);

            let Some((nx, ny)) = self.offset(x, y, dx, dy) else {
                continue;
            };
            // Border stays solid on even dimensions too
            if nx == self.width - 1 || ny == self.height - 1 || self.is_open(nx, ny) {
                continue;
            }

            // Connecting cell sits halfway between the two
            let mid_x = (x as isize + dx / 2) as usize;
            let mid_y = (y as isize + dy / 2) as usize;
            self.set(mid_x, mid_y, Cell::Open);
            self.set(nx, ny, Cell::Open);
            stack.push(CarveFrame::new(nx, ny, rng));
        }
    }

    /// Carving only visits odd cells, so on even dimensions the cell next to
    /// the exit is never reached. Open an L-shaped passage from it to the
    /// nearest carved cell; on odd dimensions this cell is already open.
    fn link_exit(&mut self) {
        let (inner_x, inner_y) = (self.width - 2, self.height - 2);
        let odd_x = inner_x - (1 - inner_x % 2);
        let odd_y = inner_y - (1 - inner_y % 2);

        for x in odd_x..=inner_x {
            self.set(x, inner_y, Cell::Open);
        }
        for y in odd_y..=inner_y {
            self.set(odd_x, y, Cell::Open);
        }
    }

    fn add_extra_openings<R: Rng + ?Sized>(&mut self, chance: f64, rng: &mut R) {
        for y in 1..self.height - 1 {
            for x in 1..self.width - 1 {
                if self.is_open(x, y) || !rng.gen_bool(chance) {
                    continue;
                }
                let touches_passage = self.is_open(x, y + 1)
                    || self.is_open(x, y - 1)
                    || self.is_open(x + 1, y)
                    || self.is_open(x - 1, y);
                if touches_passage {
                    self.set(x, y, Cell::Open);
                }
            }
        }
    }

    fn offset(&self, x: usize, y: usize, dx: isize, dy: isize) -> Option<(usize, usize)> {
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        if nx < 0 || ny < 0 || nx as usize >= self.width || ny as usize >= self.height {
            return None;
        }
        Some((nx as usize, ny as usize))
    }

    /// Flood fill over 4-adjacent open cells
    pub fn reachable_from(&self, x: usize, y: usize) -> Vec<bool> {
        let mut seen = vec![false; self.cells.len()];
        if !self.is_open(x, y) {
            return seen;
        }

        let mut queue = VecDeque::new();
        seen[y * self.width + x] = true;
        queue.push_back((x, y));

        while let Some((cx, cy)) = queue.pop_front() {
            for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                let Some((nx, ny)) = self.offset(cx, cy, dx, dy) else {
                    continue;
                };
                let idx = ny * self.width + nx;
                if !seen[idx] && self.cells[idx] == Cell::Open {
                    seen[idx] = true;
                    queue.push_back((nx, ny));
                }
            }
        }

        seen
    }

    /// Every open cell is reachable from the start cell
    pub fn is_connected(&self) -> bool {
        let (sx, sy) = self.start_cell();
        let reachable = self.reachable_from(sx, sy);
        self.cells
            .iter()
            .zip(reachable)
            .all(|(cell, seen)| *cell == Cell::Wall || seen)
    }

    /// World-space centre of a cell at the given height
    pub fn cell_center(x: usize, y: usize, cell_size: f32, height: f32) -> Vec3 {
        Vec3::new(
            x as f32 * cell_size + cell_size / 2.0,
            height,
            y as f32 * cell_size + cell_size / 2.0,
        )
    }

    /// Cell containing a world position, if it lies on the grid
    pub fn cell_at(&self, position: Vec3, cell_size: f32) -> Option<(usize, usize)> {
        if position.x < 0.0 || position.z < 0.0 {
            return None;
        }
        let x = (position.x / cell_size) as usize;
        let y = (position.z / cell_size) as usize;
        (x < self.width && y < self.height).then_some((x, y))
    }

    /// One cube obstacle per wall cell, resting on the floor
    pub fn wall_boxes(&self, cell_size: f32) -> Vec<Aabb> {
        self.wall_cells()
            .map(|(x, y)| {
                let center = Self::cell_center(x, y, cell_size, cell_size / 2.0);
                Aabb::from_center(center, Vec3::splat(cell_size / 2.0))
            })
            .collect()
    }

    /// `#`/`.` rows, the form published in the room document
    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width)
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Cell::Wall => WALL_CHAR,
                        Cell::Open => OPEN_CHAR,
                    })
                    .collect()
            })
            .collect()
    }

    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, MazeError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        if width < 3 || height < 3 {
            return Err(MazeError::TooSmall { width, height });
        }

        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(MazeError::Malformed {
                    reason: format!("row {} has length {}, expected {}", y, row.chars().count(), width),
                });
            }
            for ch in row.chars() {
                cells.push(match ch {
                    WALL_CHAR => Cell::Wall,
                    OPEN_CHAR => Cell::Open,
                    other => {
                        return Err(MazeError::Malformed {
                            reason: format!("unexpected cell '{}' in row {}", other, y),
                        })
                    }
                });
            }
        }

        Ok(Self { width, height, cells })
    }
}

impl CarveFrame {
    fn new<R: Rng + ?Sized>(x: usize, y: usize, rng: &mut R) -> Self {
        let mut directions = CARVE_DIRECTIONS;
        directions.shuffle(rng);
        Self { x, y, directions, next: 0 }
    }
}

impl fmt::Display for MazeGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.to_rows() {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn test_start_and_exit_open() {
        let grid = generate(25, 25, Some(7)).unwrap();
        assert!(grid.is_open(1, 1));
        assert!(grid.is_open(24, 23));
        assert_eq!(grid.start_cell(), (1, 1));
        assert_eq!(grid.exit_cell(), (24, 23));
    }

    #[test]
    fn test_perfect_maze_without_extra_openings() {
        // Without the post-pass the carve is a spanning tree over odd cells
        let grid = generate_with_rng(11, 11, 0.0, &mut seeded(3)).unwrap();
        for y in (1..11).step_by(2) {
            for x in (1..11).step_by(2) {
                assert!(grid.is_open(x, y), "odd cell ({}, {}) should be carved", x, y);
            }
        }
        // 25 odd cells joined by 24 connectors, plus the exit
        assert_eq!(grid.open_cells().count(), 25 + 24 + 1);
        assert!(grid.is_connected());
    }

    #[test]
    fn test_border_stays_closed_except_exit() {
        let grid = generate(15, 15, Some(11)).unwrap();
        for x in 0..15 {
            assert!(!grid.is_open(x, 0));
            assert!(!grid.is_open(x, 14));
        }
        for y in 0..15 {
            assert!(!grid.is_open(0, y));
            assert_eq!(grid.is_open(14, y), y == 13);
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate(21, 21, Some(42)).unwrap();
        let b = generate(21, 21, Some(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extra_openings_keep_connectivity() {
        let grid = generate_with_rng(31, 31, 1.0, &mut seeded(5)).unwrap();
        assert!(grid.is_connected());
    }

    #[test]
    fn test_even_dimensions_stay_connected() {
        for seed in 0..20 {
            let grid = generate_with_rng(24, 24, 0.0, &mut seeded(seed)).unwrap();
            assert!(grid.is_open(22, 22), "exit neighbour closed for seed {}", seed);
            assert!(grid.is_connected(), "disconnected 24x24 maze for seed {}", seed);
        }
        let grid = generate_with_rng(4, 6, 0.0, &mut seeded(1)).unwrap();
        assert_eq!(grid.to_rows(), vec!["####", "#.##", "#.##", "#.##", "#...", "####"]);
    }

    #[test]
    fn test_too_small_rejected() {
        assert_eq!(
            generate(2, 9, Some(1)),
            Err(MazeError::TooSmall { width: 2, height: 9 })
        );
    }

    #[test]
    fn test_smallest_maze() {
        let grid = generate(3, 3, Some(1)).unwrap();
        assert_eq!(grid.to_rows(), vec!["###", "#..", "###"]);
    }

    #[test]
    fn test_rows_round_trip() {
        let grid = generate(9, 7, Some(9)).unwrap();
        let rows = grid.to_rows();
        assert_eq!(rows.len(), 7);
        assert_eq!(MazeGrid::from_rows(&rows).unwrap(), grid);
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let err = MazeGrid::from_rows(&["###", "#.", "###"]).unwrap_err();
        assert!(matches!(err, MazeError::Malformed { .. }));
        let err = MazeGrid::from_rows(&["###", "#x#", "###"]).unwrap_err();
        assert!(matches!(err, MazeError::Malformed { .. }));
    }

    #[test]
    fn test_wall_boxes_match_wall_cells() {
        let grid = MazeGrid::from_rows(&["###", "#..", "###"]).unwrap();
        let boxes = grid.wall_boxes(10.0);
        assert_eq!(boxes.len(), 7);
        // Cell (0,0) spans [0,10] on every axis
        assert_eq!(boxes[0].min, Vec3::ZERO);
        assert_eq!(boxes[0].max, Vec3::splat(10.0));
    }

    #[test]
    fn test_cell_lookup() {
        let grid = generate(9, 9, Some(2)).unwrap();
        let center = MazeGrid::cell_center(3, 4, 10.0, 5.0);
        assert_eq!(center, Vec3::new(35.0, 5.0, 45.0));
        assert_eq!(grid.cell_at(center, 10.0), Some((3, 4)));
        assert_eq!(grid.cell_at(Vec3::new(-1.0, 0.0, 5.0), 10.0), None);
        assert_eq!(grid.cell_at(Vec3::new(95.0, 0.0, 5.0), 10.0), None);
    }
}
