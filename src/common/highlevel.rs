use super::{detect_first_conflict, Agent, Conflict, ConstraintSet, Path};
use crate::algorithm::a_star_search;
use crate::error::PlannerError;
use crate::map::Map;
use crate::stat::Stats;

use std::cmp::Ordering;
use tracing::debug;

#[derive(Clone, Debug)]
pub(crate) struct HighLevelOpenNode {
    pub(crate) node_id: usize, // Insertion order, last tie-break
    pub(crate) depth: usize,
    pub(crate) constraints: Vec<ConstraintSet>, // Indexed by agent id
    pub(crate) paths: Vec<Path>,                // Indexed by agent id
    pub(crate) cost: usize, // Total moves of all paths under current constraints
}

impl PartialEq for HighLevelOpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HighLevelOpenNode {}

impl Ord for HighLevelOpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .cmp(&other.cost)
            .then_with(|| self.depth.cmp(&other.depth))
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

impl PartialOrd for HighLevelOpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl HighLevelOpenNode {
    /// Root of the constraint tree: every agent planned on its own.
    pub(crate) fn new(
        agents: &[Agent],
        map: &Map,
        horizon: usize,
        stats: &mut Stats,
    ) -> Result<Self, PlannerError> {
        let mut paths = Vec::with_capacity(agents.len());
        let mut total_cost = 0;

        for agent in agents {
            let path = a_star_search(map, agent, &ConstraintSet::new(), horizon, stats)?;
            // Notice: path include start node.
            total_cost += path.len() - 1;
            paths.push(path);
        }

        let root = HighLevelOpenNode {
            node_id: 0,
            depth: 0,
            constraints: vec![ConstraintSet::new(); agents.len()],
            paths,
            cost: total_cost,
        };
        debug!("High level start node {root:?}");
        Ok(root)
    }

    pub(crate) fn first_conflict(&self) -> Option<Conflict> {
        detect_first_conflict(&self.paths)
    }

    /// Child that forbids one side of `conflict` and re-plans only that
    /// agent. `None` when the agent has no path under its new constraints.
    pub(crate) fn update_constraint(
        &self,
        conflict: &Conflict,
        resolve_first: bool,
        agents: &[Agent],
        map: &Map,
        horizon: usize,
        node_id: usize,
        stats: &mut Stats,
    ) -> Option<HighLevelOpenNode> {
        let (agent_to_update, constraint) = conflict.constraint_for(resolve_first);

        let mut new_constraints = self.constraints.clone();
        new_constraints[agent_to_update] = self.constraints[agent_to_update].with(constraint);

        let new_path = match a_star_search(
            map,
            &agents[agent_to_update],
            &new_constraints[agent_to_update],
            horizon,
            stats,
        ) {
            Ok(path) => path,
            Err(err) => {
                debug!(
                    "Prune child of node {:?} for {constraint:?}: {err}",
                    self.node_id
                );
                return None;
            }
        };

        debug!(
            "Update agent {agent_to_update:?} with path {new_path:?} for conflict {conflict:?}"
        );

        // Notice: actually path include start point, calculation here counterbalance each other.
        let new_cost = self.cost + new_path.len() - self.paths[agent_to_update].len();
        let mut new_paths = self.paths.clone();
        new_paths[agent_to_update] = new_path;

        Some(HighLevelOpenNode {
            node_id,
            depth: self.depth + 1,
            constraints: new_constraints,
            paths: new_paths,
            cost: new_cost,
        })
    }
}
