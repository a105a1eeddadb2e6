//! Maze carving
//!
//! Randomized depth-first search over a grid that starts fully walled,
//! stepping two cells at a time so a wall always separates neighbouring
//! corridors. One entrance is opened in the bottom row and one exit is cut
//! from the highest carved cell up through the top row.

use rand::Rng;
use rand::seq::SliceRandom;

const DIRECTIONS: [(i64, i64); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// A carved grid (`true` = open corridor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maze {
    pub rows: usize,
    pub cols: usize,
    cells: Vec<bool>,
    /// (row, col) of the single opening in the bottom row
    pub entrance: (usize, usize),
    /// (row, col) of the single opening in the top row
    pub exit: (usize, usize),
}

struct Frame {
    x: i64,
    y: i64,
    dirs: [(i64, i64); 4],
    next: usize,
}

impl Maze {
    /// Carve a maze; grids smaller than 3×3 are grown to 3×3
    pub fn carve<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let rows = rows.max(3);
        let cols = cols.max(3);
        let mut maze = Self {
            rows,
            cols,
            cells: vec![false; rows * cols],
            entrance: (rows - 1, cols / 2),
            exit: (0, cols / 2),
        };

        let start = ((cols / 2) as i64, (rows / 2) as i64);
        maze.carve_from(start, rng);
        maze.open_entrance(start.1 as usize);
        maze.open_exit();
        maze
    }

    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    fn open(&mut self, row: usize, col: usize) {
        let i = self.idx(row, col);
        self.cells[i] = true;
    }

    pub fn is_open(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[self.idx(row, col)]
    }

    /// Interior cells a carve step may land on (borders stay solid)
    fn in_interior(&self, x: i64, y: i64) -> bool {
        x > 0 && x < self.cols as i64 - 1 && y > 0 && y < self.rows as i64 - 1
    }

    fn visit<R: Rng + ?Sized>(&mut self, stack: &mut Vec<Frame>, x: i64, y: i64, rng: &mut R) {
        self.open(y as usize, x as usize);
        let mut dirs = DIRECTIONS;
        dirs.shuffle(rng);
        stack.push(Frame { x, y, dirs, next: 0 });
    }

    /// Iterative DFS; an open cell doubles as the visited mark
    fn carve_from<R: Rng + ?Sized>(&mut self, (x, y): (i64, i64), rng: &mut R) {
        let mut stack = Vec::new();
        self.visit(&mut stack, x, y, rng);

        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.dirs.len() {
                stack.pop();
                continue;
            }
            let (dx, dy) = frame.dirs[frame.next];
            frame.next += 1;
            let (fx, fy) = (frame.x, frame.y);

            let (nx, ny) = (fx + dx * 2, fy + dy * 2);
            if !self.in_interior(nx, ny) {
                continue;
            }
            if self.is_open(ny as usize, nx as usize) {
                continue;
            }
            // Knock out the wall between the two cells
            self.open((fy + dy) as usize, (fx + dx) as usize);
            self.visit(&mut stack, nx, ny, rng);
        }
    }

    /// Open the bottom-row entrance and tunnel up until it meets a corridor
    fn open_entrance(&mut self, start_row: usize) {
        let (row, col) = self.entrance;
        self.open(row, col);
        for r in (start_row..row).rev() {
            if self.is_open(r, col) {
                break;
            }
            self.open(r, col);
        }
    }

    /// Cut the exit from the highest carved interior cell to the top row
    fn open_exit(&mut self) {
        let highest = (1..self.rows - 1)
            .flat_map(|r| (1..self.cols - 1).map(move |c| (r, c)))
            .find(|&(r, c)| self.is_open(r, c));

        match highest {
            Some((row, col)) => {
                for r in 0..=row {
                    self.open(r, col);
                }
                self.exit = (0, col);
            }
            None => {
                let col = self.cols / 2;
                for r in 0..self.rows {
                    self.open(r, col);
                }
                self.exit = (0, col);
            }
        }
    }

    pub fn exit_col(&self) -> usize {
        self.exit.1
    }

    /// Wall cells as (row, col), row-major
    pub fn walls(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.rows)
            .flat_map(move |r| (0..self.cols).map(move |c| (r, c)))
            .filter(|&(r, c)| !self.is_open(r, c))
    }

    /// Open cells reachable from `from` through 4-connected corridors
    pub fn reachable_from(&self, from: (usize, usize)) -> Vec<bool> {
        let mut seen = vec![false; self.rows * self.cols];
        if !self.is_open(from.0, from.1) {
            return seen;
        }
        let mut stack = vec![from];
        seen[self.idx(from.0, from.1)] = true;
        while let Some((r, c)) = stack.pop() {
            for (dc, dr) in DIRECTIONS {
                let (nr, nc) = (r as i64 + dr, c as i64 + dc);
                if nr < 0 || nc < 0 {
                    continue;
                }
                let (nr, nc) = (nr as usize, nc as usize);
                if self.is_open(nr, nc) && !seen[self.idx(nr, nc)] {
                    seen[self.idx(nr, nc)] = true;
                    stack.push((nr, nc));
                }
            }
        }
        seen
    }

    /// True when the entrance reaches the exit
    pub fn is_solvable(&self) -> bool {
        let seen = self.reachable_from(self.entrance);
        seen[self.idx(self.exit.0, self.exit.1)]
    }

    pub fn open_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Number of adjacent open-cell pairs
    pub fn corridor_links(&self) -> usize {
        let mut links = 0;
        for r in 0..self.rows {
            for c in 0..self.cols {
                if !self.is_open(r, c) {
                    continue;
                }
                if self.is_open(r + 1, c) {
                    links += 1;
                }
                if self.is_open(r, c + 1) {
                    links += 1;
                }
            }
        }
        links
    }
}
