use super::{position_at, Cell, Constraint, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConflictType {
    Vertex {
        position: Cell,
        time_step: usize,
    },
    /// `agent_1` moves `u -> v` while `agent_2` moves `v -> u`, both arriving at `time_step`.
    Edge {
        u: Cell,
        v: Cell,
        time_step: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Conflict {
    pub agent_1: usize,
    pub agent_2: usize,
    pub conflict_type: ConflictType,
}

impl Conflict {
    /// The agent to re-plan and the constraint that keeps it out of this
    /// conflict. `resolve_first` picks `agent_1`, otherwise `agent_2`.
    pub fn constraint_for(&self, resolve_first: bool) -> (usize, Constraint) {
        let agent = if resolve_first {
            self.agent_1
        } else {
            self.agent_2
        };

        let constraint = match self.conflict_type {
            ConflictType::Vertex {
                position,
                time_step,
            } => Constraint::Vertex {
                position,
                time_step,
            },
            ConflictType::Edge { u, v, time_step } => {
                let (from_position, to_position) = if resolve_first { (u, v) } else { (v, u) };
                Constraint::Edge {
                    from_position,
                    to_position,
                    to_time_step: time_step,
                }
            }
        };

        (agent, constraint)
    }

    pub fn time_step(&self) -> usize {
        match self.conflict_type {
            ConflictType::Vertex { time_step, .. } | ConflictType::Edge { time_step, .. } => {
                time_step
            }
        }
    }
}

fn conflict_between(paths: &[Path], i: usize, j: usize, step: usize) -> Option<Conflict> {
    let pos1 = position_at(&paths[i], step);
    let pos2 = position_at(&paths[j], step);

    if pos1 == pos2 {
        return Some(Conflict {
            agent_1: i,
            agent_2: j,
            conflict_type: ConflictType::Vertex {
                position: pos1,
                time_step: step,
            },
        });
    }

    // Edge conflicts need a previous step.
    if step == 0 {
        return None;
    }

    let prev_pos1 = position_at(&paths[i], step - 1);
    let prev_pos2 = position_at(&paths[j], step - 1);
    if prev_pos1 == pos2 && prev_pos2 == pos1 {
        return Some(Conflict {
            agent_1: i,
            agent_2: j,
            conflict_type: ConflictType::Edge {
                u: prev_pos1,
                v: pos1,
                time_step: step,
            },
        });
    }

    None
}

fn scan(paths: &[Path]) -> impl Iterator<Item = Conflict> + '_ {
    let horizon = paths.iter().map(|path| path.len()).max().unwrap_or(0);
    let agents = paths.len();

    (0..horizon).flat_map(move |step| {
        (0..agents).flat_map(move |i| {
            ((i + 1)..agents).filter_map(move |j| conflict_between(paths, i, j, step))
        })
    })
}

/// First conflict by time step, then by agent pair in ascending order.
/// Agents past the end of their path are parked on their goal.
pub fn detect_first_conflict(paths: &[Path]) -> Option<Conflict> {
    scan(paths).next()
}

/// Every conflict, in the same order [`detect_first_conflict`] uses.
pub fn detect_all_conflicts(paths: &[Path]) -> Vec<Conflict> {
    scan(paths).collect()
}
