use super::construct_path;
use crate::common::{Agent, ConstraintSet, LowLevelOpenNode, Path, State};
use crate::error::PlannerError;
use crate::map::{manhattan, same_cell, Map};
use crate::stat::Stats;

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument, trace};

/// Search horizon large enough for any single-agent detour: the longest
/// simple path on the map, or diameter times agent count when larger.
pub fn default_horizon(map: &Map, num_agents: usize) -> usize {
    map.free_cells()
        .len()
        .max(map.diameter() * num_agents.max(1))
}

/// Time-expanded A* for one agent under its constraints.
///
/// `horizon` is the latest time step a path may reach. Once the search is
/// past every constraint, time steps no longer matter and states collapse
/// onto a single layer, so an unreachable goal is detected without walking
/// out to the horizon.
///
/// The goal is accepted only when no vertex constraint keeps the agent off it
/// at a later step; otherwise the search keeps going past the naive arrival.
#[instrument(skip_all, name="a_star", fields(agent = agent.id, start = format!("{:?}", agent.start), goal = format!("{:?}", agent.goal)), level = "debug")]
pub fn a_star_search(
    map: &Map,
    agent: &Agent,
    constraints: &ConstraintSet,
    horizon: usize,
    stats: &mut Stats,
) -> Result<Path, PlannerError> {
    let table = constraints.table();
    let constraint_limit_time_step = table.latest_time_step();
    let goal_blocked_until = table.latest_vertex_at(agent.goal);
    debug!(
        "constraints: {}, limit time step: {constraint_limit_time_step}, goal blocked until: {goal_blocked_until:?}",
        constraints.len()
    );

    if table.is_forbidden(State::new(agent.start, 0)) {
        debug!("start is forbidden at time 0");
        return Err(PlannerError::NoPathExists { agent: agent.id });
    }

    let goal = State::new(agent.goal, 0);
    let mut open_list = BTreeSet::new();
    let mut closed_list = HashSet::new();
    let mut trace = HashMap::new();

    open_list.insert(LowLevelOpenNode {
        position: agent.start,
        f_open_cost: manhattan(agent.start, agent.goal),
        g_cost: 0,
        time_step: 0,
    });

    while let Some(current) = open_list.pop_first() {
        // After the constraint limit, one node per position is enough.
        if !closed_list.insert((current.position, current.time_step)) {
            continue;
        }
        trace!("expand node: {current:?}");
        stats.low_level_expand_nodes += 1;

        let from = State::new(current.position, current.g_cost);
        if same_cell(from, goal)
            && goal_blocked_until.map_or(true, |blocked| current.g_cost > blocked)
        {
            return Ok(construct_path(&trace, (current.position, current.g_cost)));
        }

        if current.g_cost >= horizon {
            continue;
        }

        // Assuming uniform cost, which also indicate the current time.
        let tentative_g_cost = current.g_cost + 1;
        let tentative_time_step = if current.time_step > constraint_limit_time_step {
            current.time_step
        } else {
            current.time_step + 1
        };

        for to in map.neighbors(from) {
            if closed_list.contains(&(to.position, tentative_time_step)) {
                continue;
            }

            if table.is_forbidden(to) || table.is_forbidden_transition(from, to) {
                continue; // This move is prohibited due to a constraint.
            }

            let h_open_cost = manhattan(to.position, agent.goal);

            // Keep the first predecessor found for an open node.
            if open_list.insert(LowLevelOpenNode {
                position: to.position,
                f_open_cost: tentative_g_cost + h_open_cost,
                g_cost: tentative_g_cost,
                time_step: tentative_time_step,
            }) {
                trace.insert(
                    (to.position, tentative_g_cost),
                    (current.position, current.g_cost),
                );
            }
        }
    }

    debug!("cannot find solution");
    Err(PlannerError::NoPathExists { agent: agent.id })
}
