mod conflict;
mod constraint;
mod highlevel;
mod lowlevel;

pub use conflict::{detect_all_conflicts, detect_first_conflict, Conflict, ConflictType};
pub use constraint::{Constraint, ConstraintSet, ConstraintTable};
pub(crate) use highlevel::HighLevelOpenNode;
pub(crate) use lowlevel::LowLevelOpenNode;

use crate::error::PlannerError;
use crate::map::Map;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use tracing::debug;

/// Grid coordinate as (row, column).
pub type Cell = (usize, usize);

/// Cells visited by one agent, indexed by time step.
pub type Path = Vec<Cell>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    pub position: Cell,
    pub time_step: usize,
}

impl State {
    pub fn new(position: Cell, time_step: usize) -> Self {
        State {
            position,
            time_step,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: Cell,
    pub goal: Cell,
}

impl Agent {
    pub fn verify(&self, map: &Map) -> Result<(), PlannerError> {
        for (what, cell) in [("start", self.start), ("goal", self.goal)] {
            if !map.in_bounds(cell) {
                return Err(PlannerError::invalid(format!(
                    "agent {} {what} {cell:?} is outside the {}x{} grid",
                    self.id, map.height, map.width
                )));
            }
            if !map.is_passable(cell.0, cell.1) {
                return Err(PlannerError::invalid(format!(
                    "agent {} {what} {cell:?} is blocked",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Where the agent is at `time_step`. Past the end of its path the agent
/// stays parked on its last cell. Paths are never empty.
pub fn position_at(path: &[Cell], time_step: usize) -> Cell {
    path[time_step.min(path.len() - 1)]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    pub paths: Vec<Path>,
    // Sum of path lengths, counted in moves.
    pub cost: usize,
    pub high_level_expanded: usize,
}

impl Solution {
    /// The agent's path as explicit (cell, time) states.
    pub fn states(&self, agent: usize) -> Vec<State> {
        self.paths[agent]
            .iter()
            .enumerate()
            .map(|(time_step, &position)| State::new(position, time_step))
            .collect()
    }

    pub fn makespan(&self) -> usize {
        self.paths
            .iter()
            .map(|path| path.len().saturating_sub(1))
            .max()
            .unwrap_or(0)
    }

    pub fn verify(&self, map: &Map, agents: &[Agent]) -> bool {
        if self.paths.len() != agents.len() {
            debug!(
                "solution has {} paths for {} agents",
                self.paths.len(),
                agents.len()
            );
            return false;
        }

        for (agent, path) in agents.iter().zip(&self.paths) {
            if path.first() != Some(&agent.start) || path.last() != Some(&agent.goal) {
                debug!("agent {} path does not connect start and goal", agent.id);
                return false;
            }
            for step in path.windows(2) {
                if !map.get_neighbors(step[0].0, step[0].1).contains(&step[1]) {
                    debug!("agent {} makes invalid move {:?}", agent.id, step);
                    return false;
                }
            }
        }

        let cost: usize = self.paths.iter().map(|path| path.len() - 1).sum();
        if cost != self.cost {
            debug!("solution cost {} does not match paths {cost}", self.cost);
            return false;
        }

        let conflicts = detect_all_conflicts(&self.paths);
        if let Some(first) = conflicts.first() {
            debug!(
                "solution still has {} conflicts, first {first:?}",
                conflicts.len()
            );
            return false;
        }

        true
    }

    pub fn write_json(&self, path: &str) -> anyhow::Result<()> {
        let file =
            File::create(path).with_context(|| format!("cannot create solution file {path}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
