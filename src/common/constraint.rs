use super::{Cell, State};

use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Ord, PartialOrd)]
pub enum Constraint {
    /// The agent may not be at `position` at `time_step`.
    Vertex { position: Cell, time_step: usize },
    /// The agent may not move `from_position -> to_position` arriving at `to_time_step`.
    Edge {
        from_position: Cell,
        to_position: Cell,
        to_time_step: usize,
    },
}

impl Constraint {
    pub fn time_step(&self) -> usize {
        match self {
            Constraint::Vertex { time_step, .. } => *time_step,
            Constraint::Edge { to_time_step, .. } => *to_time_step,
        }
    }
}

#[derive(Debug)]
struct Link {
    constraint: Constraint,
    parent: Option<Arc<Link>>,
}

/// One agent's constraints, shared structurally between a tree node and its
/// descendants. Adding a constraint never touches the parent's set.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    head: Option<Arc<Link>>,
    len: usize,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(&self, constraint: Constraint) -> Self {
        ConstraintSet {
            head: Some(Arc::new(Link {
                constraint,
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Newest constraint first.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    pub fn table(&self) -> ConstraintTable {
        let mut table = ConstraintTable::default();
        for constraint in self.iter() {
            table.insert(*constraint);
        }
        table
    }
}

pub struct Iter<'a> {
    next: Option<&'a Link>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Constraint;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.next?;
        self.next = link.parent.as_deref();
        Some(&link.constraint)
    }
}

/// Hashed index over a [`ConstraintSet`], built once per low-level search.
#[derive(Debug, Default)]
pub struct ConstraintTable {
    vertex: HashSet<(Cell, usize)>,
    edge: HashSet<(Cell, Cell, usize)>,
    latest_time_step: usize,
}

impl ConstraintTable {
    fn insert(&mut self, constraint: Constraint) {
        match constraint {
            Constraint::Vertex {
                position,
                time_step,
            } => {
                self.vertex.insert((position, time_step));
            }
            Constraint::Edge {
                from_position,
                to_position,
                to_time_step,
            } => {
                self.edge.insert((from_position, to_position, to_time_step));
            }
        }
        self.latest_time_step = self.latest_time_step.max(constraint.time_step());
    }

    pub fn is_forbidden(&self, state: State) -> bool {
        self.vertex.contains(&(state.position, state.time_step))
    }

    pub fn is_forbidden_transition(&self, from: State, to: State) -> bool {
        self.edge.contains(&(from.position, to.position, to.time_step))
    }

    /// Latest time step any constraint mentions, 0 when empty.
    pub fn latest_time_step(&self) -> usize {
        self.latest_time_step
    }

    /// Latest vertex constraint on `cell`, if any. An agent cannot finish on
    /// `cell` at or before it.
    pub fn latest_vertex_at(&self, cell: Cell) -> Option<usize> {
        self.vertex
            .iter()
            .filter(|(position, _)| *position == cell)
            .map(|&(_, time_step)| time_step)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branching_leaves_parent_untouched() {
        let root = ConstraintSet::new();
        let parent = root.with(Constraint::Vertex {
            position: (1, 1),
            time_step: 2,
        });
        let left = parent.with(Constraint::Vertex {
            position: (0, 1),
            time_step: 3,
        });
        let right = parent.with(Constraint::Edge {
            from_position: (0, 0),
            to_position: (0, 1),
            to_time_step: 1,
        });

        assert!(root.is_empty());
        assert_eq!(parent.len(), 1);
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 2);

        let from = State::new((0, 0), 0);
        let to = State::new((0, 1), 1);

        let left_table = left.table();
        assert!(left_table.is_forbidden(State::new((0, 1), 3)));
        assert!(left_table.is_forbidden(State::new((1, 1), 2)));
        assert!(!left_table.is_forbidden_transition(from, to));

        let right_table = right.table();
        assert!(!right_table.is_forbidden(State::new((0, 1), 3)));
        assert!(right_table.is_forbidden_transition(from, to));
        // Only the exact direction is forbidden.
        let back_from = State::new((0, 1), 0);
        let back_to = State::new((0, 0), 1);
        assert!(!right_table.is_forbidden_transition(back_from, back_to));
    }

    #[test]
    fn test_table_time_queries() {
        let set = ConstraintSet::new()
            .with(Constraint::Vertex {
                position: (2, 2),
                time_step: 4,
            })
            .with(Constraint::Vertex {
                position: (2, 2),
                time_step: 9,
            })
            .with(Constraint::Edge {
                from_position: (0, 0),
                to_position: (1, 0),
                to_time_step: 12,
            });
        let table = set.table();

        assert_eq!(table.latest_time_step(), 12);
        assert_eq!(table.latest_vertex_at((2, 2)), Some(9));
        assert_eq!(table.latest_vertex_at((0, 0)), None);
        assert_eq!(ConstraintSet::new().table().latest_time_step(), 0);
    }

    #[test]
    fn test_constraint_time_step() {
        let vertex = Constraint::Vertex {
            position: (1, 0),
            time_step: 2,
        };
        let edge = Constraint::Edge {
            from_position: (0, 0),
            to_position: (1, 0),
            to_time_step: 5,
        };
        assert_eq!(vertex.time_step(), 2);
        assert_eq!(edge.time_step(), 5);
    }
}
