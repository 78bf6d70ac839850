use super::Solver;
use crate::algorithm::default_horizon;
use crate::common::{Agent, Conflict, HighLevelOpenNode, Solution};
use crate::config::Config;
use crate::error::PlannerError;
use crate::map::Map;
use crate::stat::Stats;

use std::collections::{BTreeSet, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct CBS {
    agents: Vec<Agent>,
    map: Map,
    stats: Stats,
}

impl CBS {
    /// Checks the agent set against the map before any search runs.
    /// Agent ids must be `0..n` in order; starts and goals must be distinct.
    pub fn new(agents: Vec<Agent>, map: &Map) -> Result<Self, PlannerError> {
        let mut starts = HashSet::new();
        let mut goals = HashSet::new();

        for (index, agent) in agents.iter().enumerate() {
            if agent.id != index {
                return Err(PlannerError::invalid(format!(
                    "agent at position {index} has id {}",
                    agent.id
                )));
            }
            agent.verify(map)?;
            if !starts.insert(agent.start) {
                return Err(PlannerError::invalid(format!(
                    "agent {} shares start {:?} with another agent",
                    agent.id, agent.start
                )));
            }
            if !goals.insert(agent.goal) {
                return Err(PlannerError::invalid(format!(
                    "agent {} shares goal {:?} with another agent",
                    agent.id, agent.goal
                )));
            }
        }

        Ok(CBS {
            agents,
            map: map.clone(),
            stats: Stats::default(),
        })
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    fn expand(
        &mut self,
        node: &HighLevelOpenNode,
        conflict: &Conflict,
        horizon: usize,
        parallel: bool,
        first_id: usize,
    ) -> [Option<HighLevelOpenNode>; 2] {
        debug!(
            "Expand node {:?} (cost {}, depth {}) on conflict {conflict:?}",
            node.node_id, node.cost, node.depth
        );

        let agents = &self.agents;
        let map = &self.map;
        let child = |first: bool, id: usize, stats: &mut Stats| {
            node.update_constraint(conflict, first, agents, map, horizon, id, stats)
        };

        if parallel {
            let mut stats_1 = Stats::default();
            let mut stats_2 = Stats::default();
            let (child_1, child_2) = rayon::join(
                || child(true, first_id, &mut stats_1),
                || child(false, first_id + 1, &mut stats_2),
            );
            self.stats.merge_low_level(&stats_1);
            self.stats.merge_low_level(&stats_2);
            [child_1, child_2]
        } else {
            let child_1 = child(true, first_id, &mut self.stats);
            let child_2 = child(false, first_id + 1, &mut self.stats);
            [child_1, child_2]
        }
    }
}

impl Solver for CBS {
    fn solve(&mut self, config: &Config) -> Result<Solution, PlannerError> {
        let total_solve_start_time = Instant::now();
        let time_limit = config.time_limit_ms.map(Duration::from_millis);
        let horizon = config
            .horizon
            .unwrap_or_else(|| default_horizon(&self.map, self.agents.len()));
        self.stats = Stats::default();

        let root = HighLevelOpenNode::new(&self.agents, &self.map, horizon, &mut self.stats)?;
        let mut next_node_id = 1;
        let mut open = BTreeSet::new();
        open.insert(root);
        self.stats.high_level_generate_nodes += 1;

        while let Some(current_node) = open.pop_first() {
            let Some(conflict) = current_node.first_conflict() else {
                // No conflicts, return solution.
                self.stats.time_us = total_solve_start_time.elapsed().as_micros() as usize;
                self.stats.costs = current_node.cost;
                self.stats.print();

                return Ok(Solution {
                    paths: current_node.paths,
                    cost: current_node.cost,
                    high_level_expanded: self.stats.high_level_expand_nodes,
                });
            };

            let out_of_expansions = config
                .max_high_level_expansions
                .is_some_and(|max| self.stats.high_level_expand_nodes >= max);
            let out_of_time =
                time_limit.is_some_and(|limit| total_solve_start_time.elapsed() >= limit);
            if out_of_expansions || out_of_time {
                let elapsed = total_solve_start_time.elapsed();
                info!(
                    "Stop after {} high level expansions, {elapsed:?}",
                    self.stats.high_level_expand_nodes
                );
                return Err(PlannerError::Timeout {
                    expanded: self.stats.high_level_expand_nodes,
                    elapsed,
                });
            }

            self.stats.high_level_expand_nodes += 1;
            let children = self.expand(
                &current_node,
                &conflict,
                horizon,
                config.parallel_children,
                next_node_id,
            );
            next_node_id += 2;

            for child in children.into_iter().flatten() {
                open.insert(child);
                self.stats.high_level_generate_nodes += 1;
            }
        }

        info!(
            "Constraint tree exhausted after {} high level expansions",
            self.stats.high_level_expand_nodes
        );
        Err(PlannerError::NoSolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::detect_first_conflict;
    use crate::scenario::generate_random_agents;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // Helper function to setup tracing
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info")
            .with_test_writer()
            .try_init();
    }

    fn agents(routes: &[((usize, usize), (usize, usize))]) -> Vec<Agent> {
        routes
            .iter()
            .enumerate()
            .map(|(id, &(start, goal))| Agent { id, start, goal })
            .collect()
    }

    fn solve(map: &Map, agents: &[Agent], config: &Config) -> Result<Solution, PlannerError> {
        CBS::new(agents.to_vec(), map)?.solve(config)
    }

    #[test]
    fn test_single_agent_already_at_goal() {
        init_tracing();
        let map = Map::from_file("map_file/test/test.map").unwrap();
        let agents = agents(&[((0, 0), (0, 0))]);
        let solution = solve(&map, &agents, &Config::default()).unwrap();

        assert_eq!(solution.paths, vec![vec![(0, 0)]]);
        assert_eq!(solution.cost, 0);
        assert_eq!(solution.high_level_expanded, 0);
    }

    #[test]
    fn test_head_on_with_side_bay() {
        init_tracing();
        let map = "type octile\nheight 2\nwidth 3\nmap\n...\n@.@"
            .parse::<Map>()
            .unwrap();
        let agents = agents(&[((0, 0), (0, 2)), ((0, 2), (0, 0))]);
        let solution = solve(&map, &agents, &Config::default()).unwrap();

        assert!(solution.verify(&map, &agents));
        let mut lengths: Vec<usize> = solution.paths.iter().map(|path| path.len() - 1).collect();
        lengths.sort();
        assert_eq!(lengths, vec![3, 4]);
        assert_eq!(solution.cost, 7);
        assert!(solution.high_level_expanded >= 1);
    }

    #[test]
    fn test_head_on_in_corridor_times_out() {
        init_tracing();
        let map = Map::from_grid(vec![vec![true; 3]]).unwrap();
        let agents = agents(&[((0, 0), (0, 2)), ((0, 2), (0, 0))]);
        let config = Config {
            max_high_level_expansions: Some(200),
            time_limit_ms: None,
            horizon: Some(50),
            ..Config::default()
        };
        let result = solve(&map, &agents, &config);

        assert!(matches!(
            result,
            Err(PlannerError::Timeout { expanded: 200, .. })
        ));
    }

    #[test]
    fn test_deadline_reports_timeout() {
        init_tracing();
        let map = Map::from_grid(vec![vec![true; 3]]).unwrap();
        let agents = agents(&[((0, 0), (0, 2)), ((0, 2), (0, 0))]);
        let config = Config {
            max_high_level_expansions: None,
            time_limit_ms: Some(0),
            ..Config::default()
        };
        let result = solve(&map, &agents, &config);

        assert!(matches!(
            result,
            Err(PlannerError::Timeout { expanded: 0, .. })
        ));
    }

    #[test]
    fn test_walled_off_goal() {
        init_tracing();
        let map = "type octile\nheight 3\nwidth 5\nmap\n..@..\n..@..\n..@.."
            .parse::<Map>()
            .unwrap();
        let agents = agents(&[((0, 0), (2, 1)), ((1, 0), (1, 4))]);
        let result = solve(&map, &agents, &Config::default());

        assert_eq!(result, Err(PlannerError::NoPathExists { agent: 1 }));
    }

    #[test]
    fn test_exhausted_tree_is_no_solution() {
        init_tracing();
        // Two agents can never swap on a two-cell strip; the horizon keeps
        // the constraint tree finite.
        let map = Map::from_grid(vec![vec![true; 2]]).unwrap();
        let agents = agents(&[((0, 0), (0, 1)), ((0, 1), (0, 0))]);
        let config = Config {
            horizon: Some(3),
            max_high_level_expansions: None,
            time_limit_ms: None,
            ..Config::default()
        };
        let result = solve(&map, &agents, &config);

        assert_eq!(result, Err(PlannerError::NoSolution));
    }

    #[test]
    fn test_three_agents_through_one_cell() {
        init_tracing();
        let map = Map::from_grid(vec![vec![true; 3]; 3]).unwrap();
        let agents = agents(&[((0, 1), (2, 1)), ((1, 0), (1, 2)), ((2, 1), (0, 1))]);
        let solution = solve(&map, &agents, &Config::default()).unwrap();

        assert!(solution.verify(&map, &agents));
        assert_eq!(detect_first_conflict(&solution.paths), None);
        assert!(solution.high_level_expanded >= 1);
        // Each agent alone needs 2 moves.
        assert!(solution.cost > 6);
    }

    #[test]
    fn test_deterministic_and_parallel_agree() {
        init_tracing();
        let map = Map::from_file("map_file/test/warehouse.map").unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let agents = generate_random_agents(&map, 6, 4, &mut rng).unwrap();

        let config = Config::default();
        let first = solve(&map, &agents, &config).unwrap();
        let second = solve(&map, &agents, &config).unwrap();
        assert_eq!(first, second);

        let parallel = Config {
            parallel_children: true,
            ..Config::default()
        };
        let third = solve(&map, &agents, &parallel).unwrap();
        assert_eq!(first, third);
        assert!(first.verify(&map, &agents));
    }

    #[test]
    fn test_invalid_agent_sets() {
        init_tracing();
        let map = Map::from_file("map_file/test/test.map").unwrap();

        let shared_start = agents(&[((0, 0), (3, 3)), ((0, 0), (3, 0))]);
        assert!(matches!(
            CBS::new(shared_start, &map),
            Err(PlannerError::InvalidInput(_))
        ));

        let shared_goal = agents(&[((0, 0), (3, 3)), ((0, 1), (3, 3))]);
        assert!(matches!(
            CBS::new(shared_goal, &map),
            Err(PlannerError::InvalidInput(_))
        ));

        let blocked_goal = agents(&[((0, 0), (1, 1))]);
        assert!(matches!(
            CBS::new(blocked_goal, &map),
            Err(PlannerError::InvalidInput(_))
        ));

        let bad_id = vec![Agent {
            id: 4,
            start: (0, 0),
            goal: (3, 3),
        }];
        assert!(matches!(
            CBS::new(bad_id, &map),
            Err(PlannerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_expand_branches_on_given_conflict() {
        init_tracing();
        let map = Map::from_grid(vec![vec![true; 3]; 3]).unwrap();
        let agents = agents(&[((0, 1), (2, 1)), ((1, 0), (1, 2))]);
        let horizon = default_horizon(&map, agents.len());
        let mut solver = CBS::new(agents.clone(), &map).unwrap();
        let root = HighLevelOpenNode::new(&agents, &map, horizon, &mut Stats::default()).unwrap();
        let conflict = root.first_conflict().unwrap();

        for parallel in [false, true] {
            let children = solver.expand(&root, &conflict, horizon, parallel, 1);
            for (index, child) in children.iter().enumerate() {
                let child = child.as_ref().unwrap();
                let (agent, constraint) = conflict.constraint_for(index == 0);
                assert_eq!(child.node_id, 1 + index);
                assert_eq!(child.constraints[agent].iter().next(), Some(&constraint));
                assert!(child.constraints[1 - agent].is_empty());
            }
        }
        assert!(solver.stats().low_level_expand_nodes > 0);
    }

    #[test]
    fn test_stats_are_collected() {
        init_tracing();
        let map = Map::from_grid(vec![vec![true; 3]; 3]).unwrap();
        let agents = agents(&[((0, 1), (2, 1)), ((1, 0), (1, 2))]);
        let mut solver = CBS::new(agents, &map).unwrap();
        let solution = solver.solve(&Config::default()).unwrap();

        let stats = solver.stats();
        assert_eq!(stats.costs, solution.cost);
        assert_eq!(stats.high_level_expand_nodes, solution.high_level_expanded);
        assert!(stats.high_level_generate_nodes > stats.high_level_expand_nodes);
        assert!(stats.low_level_expand_nodes > 0);
    }
}
