use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub costs: usize,
    pub time_us: usize,
    pub low_level_expand_nodes: usize,
    pub high_level_expand_nodes: usize,
    pub high_level_generate_nodes: usize,
}

impl Stats {
    pub(crate) fn merge_low_level(&mut self, other: &Stats) {
        self.low_level_expand_nodes += other.low_level_expand_nodes;
    }

    pub fn print(&self) {
        info!(
            "Cost {:?} Time(microseconds) {:?} High level expand nodes number: {:?} High level generate nodes number: {:?} Low level expand nodes number {:?}",
            self.costs, self.time_us, self.high_level_expand_nodes, self.high_level_generate_nodes, self.low_level_expand_nodes
        );
    }
}
