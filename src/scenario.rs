use crate::common::{Agent, Cell};
use crate::map::{manhattan, Map};

use anyhow::{anyhow, bail, Context, Result};
use rand::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader, Write};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Route {
    pub start: Cell,
    pub goal: Cell,
}

type Bucket = Vec<Route>;

#[derive(Debug)]
pub struct Scenario {
    pub map: String,
    pub map_width: usize,
    pub map_height: usize,
    pub buckets: BTreeMap<usize, Bucket>,
}

fn parse_field(parts: &[&str], index: usize, line_number: usize) -> Result<usize> {
    parts
        .get(index)
        .ok_or_else(|| anyhow!("line {line_number}: missing column {index}"))?
        .parse()
        .with_context(|| format!("line {line_number}: bad number in column {index}"))
}

impl Scenario {
    /// Reads a MovingAI `.scen` file. Columns are
    /// `bucket map width height start_x start_y goal_x goal_y optimal`,
    /// where x is the column and y the row.
    pub fn load_from_scen(path: &str) -> Result<Scenario> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?;
        let mut lines = content.lines().enumerate();

        // First line is "version x.x" which we can skip
        lines.next();

        let mut scenario = Scenario {
            map: String::new(),
            map_width: 0,
            map_height: 0,
            buckets: BTreeMap::new(),
        };

        for (index, line) in lines {
            let line_number = index + 1;
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }

            let bucket_index = parse_field(&parts, 0, line_number)?;
            let route = Route {
                start: (
                    parse_field(&parts, 5, line_number)?,
                    parse_field(&parts, 4, line_number)?,
                ),
                goal: (
                    parse_field(&parts, 7, line_number)?,
                    parse_field(&parts, 6, line_number)?,
                ),
            };

            if scenario.map.is_empty() {
                // Initialize map details from the first route entry
                scenario.map = parts[1].to_string();
                scenario.map_width = parse_field(&parts, 2, line_number)?;
                scenario.map_height = parse_field(&parts, 3, line_number)?;
            }

            let bucket = scenario.buckets.entry(bucket_index).or_default();
            bucket.push(route);
        }

        Ok(scenario)
    }

    pub fn generate_agents_by_buckets<R: Rng + ?Sized>(
        &self,
        num_agents: usize,
        agent_buckets: &[usize],
        rng: &mut R,
    ) -> Result<Vec<Agent>> {
        if agent_buckets.len() != num_agents {
            bail!("Number of agents does not match the length of agent_buckets");
        }

        let mut starts = HashSet::new();
        let mut goals = HashSet::new();
        let mut agents: Vec<Agent> = Vec::new();

        for (agent_id, &bucket_index) in agent_buckets.iter().enumerate() {
            let bucket = self
                .buckets
                .get(&bucket_index)
                .ok_or_else(|| anyhow!("Bucket {bucket_index} not found"))?;

            // Routes whose start and goal are still free, in any bucket
            let available_routes: Vec<&Route> = bucket
                .iter()
                .filter(|route| !starts.contains(&route.start) && !goals.contains(&route.goal))
                .collect();

            let route = *available_routes
                .choose(rng)
                .ok_or_else(|| anyhow!("No available routes left in bucket {bucket_index}"))?;

            starts.insert(route.start);
            goals.insert(route.goal);
            agents.push(Agent {
                id: agent_id,
                start: route.start,
                goal: route.goal,
            });
        }

        info!("Generate scen: {agents:?}");
        Ok(agents)
    }

    /// Draws routes from all buckets, skipping any whose start or goal is
    /// already taken.
    pub fn generate_agents_randomly<R: Rng + ?Sized>(
        &self,
        num_agents: usize,
        rng: &mut R,
    ) -> Result<Vec<Agent>> {
        let mut available_routes: Vec<Route> = self.buckets.values().flatten().cloned().collect();
        available_routes.sort();
        available_routes.dedup();

        // Shuffle the available routes to randomize the route selection
        available_routes.shuffle(rng);

        let mut starts = HashSet::new();
        let mut goals = HashSet::new();
        let mut agents: Vec<Agent> = Vec::new();

        for route in available_routes {
            if agents.len() == num_agents {
                break;
            }
            if starts.contains(&route.start) || goals.contains(&route.goal) {
                continue;
            }
            starts.insert(route.start);
            goals.insert(route.goal);
            agents.push(Agent {
                id: agents.len(),
                start: route.start,
                goal: route.goal,
            });
        }

        if agents.len() < num_agents {
            bail!("Not enough unique routes available to match the number of agents");
        }

        info!("Generate scen: {agents:?}");
        Ok(agents)
    }

    pub fn load_agents_from_yaml(path: &str) -> Result<Vec<Agent>> {
        let file = File::open(path).with_context(|| format!("cannot open agents {path}"))?;
        let reader = BufReader::new(file);
        let agents = serde_yaml::from_reader(reader)?;
        Ok(agents)
    }

    pub fn write_agents_to_yaml(path: &str, agents: &[Agent]) -> Result<()> {
        let file = File::create(path).with_context(|| format!("cannot create agents {path}"))?;
        let mut writer = io::BufWriter::new(file);
        let yaml_data = serde_yaml::to_string(&agents)?;
        writer.write_all(yaml_data.as_bytes())?;

        Ok(())
    }
}

/// Random agents on free cells with distinct starts and distinct goals,
/// each start at least `min_distance` (Manhattan) away from its goal.
pub fn generate_random_agents<R: Rng + ?Sized>(
    map: &Map,
    num_agents: usize,
    min_distance: usize,
    rng: &mut R,
) -> Result<Vec<Agent>> {
    let free_cells = map.free_cells();
    if free_cells.len() < num_agents {
        bail!(
            "Map has {} free cells, cannot place {num_agents} agents",
            free_cells.len()
        );
    }

    let max_attempts = 1000 * num_agents.max(1);
    let mut starts = HashSet::new();
    let mut goals = HashSet::new();
    let mut agents: Vec<Agent> = Vec::new();

    for _ in 0..max_attempts {
        if agents.len() == num_agents {
            break;
        }

        let (Some(&start), Some(&goal)) = (free_cells.choose(rng), free_cells.choose(rng)) else {
            bail!("Map has no free cells");
        };
        if starts.contains(&start)
            || goals.contains(&goal)
            || manhattan(start, goal) < min_distance
        {
            continue;
        }

        starts.insert(start);
        goals.insert(goal);
        agents.push(Agent {
            id: agents.len(),
            start,
            goal,
        });
    }

    if agents.len() < num_agents {
        bail!(
            "Placed only {} of {num_agents} agents with minimum distance {min_distance}",
            agents.len()
        );
    }

    info!("Generate agents: {agents:?}");
    Ok(agents)
}
