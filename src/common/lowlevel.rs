use super::Cell;

use std::cmp::Ordering;

#[derive(Clone, Eq, Debug, PartialEq, Hash)]
pub(crate) struct LowLevelOpenNode {
    pub(crate) position: Cell,
    pub(crate) f_open_cost: usize,
    pub(crate) g_cost: usize,
    // Equals g_cost until the last constrained time step, then stays fixed.
    pub(crate) time_step: usize,
}

impl Ord for LowLevelOpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_open_cost
            .cmp(&other.f_open_cost)
            // Fewer steps taken (so fewer waits) first.
            .then_with(|| self.g_cost.cmp(&other.g_cost))
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.time_step.cmp(&other.time_step))
    }
}

impl PartialOrd for LowLevelOpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
