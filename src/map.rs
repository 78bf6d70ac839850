use crate::common::{Cell, State};
use crate::error::PlannerError;

use anyhow::Context;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Tile {
    passable: bool,
    pub neighbors: Vec<Cell>, // Accessible cells one move away, stay included
}

impl Tile {
    pub fn is_passable(&self) -> bool {
        self.passable
    }
}

#[derive(Debug, Clone)]
pub struct Map {
    pub height: usize,
    pub width: usize,
    pub grid: Vec<Vec<Tile>>,
}

impl Map {
    /// Reads a MovingAI `.map` file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("cannot read map {path}"))?;
        let map = content
            .parse::<Map>()
            .with_context(|| format!("error with map file: {path}"))?;
        Ok(map)
    }

    /// Builds a map from rows of passable flags.
    pub fn from_grid(rows: Vec<Vec<bool>>) -> Result<Self, PlannerError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.len());
        if height == 0 || width == 0 {
            return Err(PlannerError::invalid("grid must be at least 1x1"));
        }
        if let Some(row) = rows.iter().position(|row| row.len() != width) {
            return Err(PlannerError::invalid(format!(
                "grid row {row} has {} cells, expected {width}",
                rows[row].len()
            )));
        }

        let grid = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|passable| Tile {
                        passable,
                        neighbors: Vec::new(),
                    })
                    .collect()
            })
            .collect();

        let mut map = Map {
            height,
            width,
            grid,
        };
        map.initialize_neighbors();
        Ok(map)
    }

    fn initialize_neighbors(&mut self) {
        for x in 0..self.height {
            for y in 0..self.width {
                if self.grid[x][y].passable {
                    self.grid[x][y].neighbors = self.get_neighbors(x, y);
                }
            }
        }
    }

    pub fn get_neighbors(&self, x: usize, y: usize) -> Vec<Cell> {
        let directions = [(-1, 0), (1, 0), (0, -1), (0, 1), (0, 0)]; // Up, down, left, right, stay
        let mut neighbors = Vec::new();

        for &(dx, dy) in &directions {
            let new_x = x as i64 + dx;
            let new_y = y as i64 + dy;
            if new_x >= 0
                && new_y >= 0
                && new_x < self.height as i64
                && new_y < self.width as i64
                && self.grid[new_x as usize][new_y as usize].passable
            {
                neighbors.push((new_x as usize, new_y as usize));
            }
        }

        neighbors
    }

    /// Every state one move after `state`.
    pub fn neighbors(&self, state: State) -> Vec<State> {
        let (x, y) = state.position;
        self.grid[x][y]
            .neighbors
            .iter()
            .map(|&position| State::new(position, state.time_step + 1))
            .collect()
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.0 < self.height && cell.1 < self.width
    }

    pub fn is_passable(&self, x: usize, y: usize) -> bool {
        self.grid[x][y].is_passable()
    }

    /// Passable cells in row-major order.
    pub fn free_cells(&self) -> Vec<Cell> {
        (0..self.height)
            .flat_map(|x| (0..self.width).map(move |y| (x, y)))
            .filter(|&(x, y)| self.is_passable(x, y))
            .collect()
    }

    pub fn diameter(&self) -> usize {
        self.height + self.width - 2
    }
}

impl FromStr for Map {
    type Err = PlannerError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let mut lines = content.lines();
        let mut height = None;
        let mut width = None;

        for line in lines.by_ref() {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("map"), None) => break,
                (Some("height"), Some(value)) => height = value.parse::<usize>().ok(),
                (Some("width"), Some(value)) => width = value.parse::<usize>().ok(),
                // "type octile" and blank lines carry nothing we need.
                _ => {}
            }
        }

        let (height, width) = match (height, width) {
            (Some(height), Some(width)) => (height, width),
            _ => return Err(PlannerError::invalid("map header lacks height or width")),
        };

        let mut rows = Vec::with_capacity(height);
        for line in lines.take(height) {
            let row: Vec<bool> = line
                .chars()
                .take(width)
                .map(|ch| matches!(ch, '.' | 'G' | 'S'))
                .collect();
            if row.len() != width {
                return Err(PlannerError::invalid(format!(
                    "map row {} has {} cells, expected {width}",
                    rows.len(),
                    row.len()
                )));
            }
            rows.push(row);
        }

        if rows.len() != height {
            return Err(PlannerError::invalid(format!(
                "map has {} rows, expected {height}",
                rows.len()
            )));
        }

        Map::from_grid(rows)
    }
}

pub fn manhattan(a: Cell, b: Cell) -> usize {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}

/// Positional equality, time ignored.
pub fn same_cell(a: State, b: State) -> bool {
    a.position == b.position
}
