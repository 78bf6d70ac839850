use anyhow::bail;
use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug, Default)]
#[command(
    name = "Rust MAPF",
    about = "Conflict-Based Search for multi-agent path planning on grid maps.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Path to the map file")]
    pub map_path: Option<String>,

    #[arg(long, help = "Path to a MovingAI scenario file")]
    pub scen_path: Option<String>,

    #[arg(long, help = "Path to a YAML agent list")]
    pub agents_path: Option<String>,

    #[arg(long, help = "Write the generated agents to this YAML file")]
    pub save_agents_path: Option<String>,

    #[arg(long, help = "Write the solution as JSON to this file")]
    pub output_path: Option<String>,

    #[arg(long, help = "Number of agents")]
    pub num_agents: Option<usize>,

    #[arg(long, help = "Buckets to draw agents from", value_delimiter = ',')]
    pub agents_dist: Vec<usize>,

    #[arg(long, help = "Minimum start-goal distance of random agents")]
    pub min_distance: Option<usize>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<usize>,

    #[arg(long, help = "Stop after this many high-level expansions")]
    pub max_high_level_expansions: Option<usize>,

    #[arg(long, help = "Stop after this many milliseconds")]
    pub time_limit_ms: Option<u64>,

    #[arg(long, help = "Latest time step a single-agent path may reach")]
    pub horizon: Option<usize>,

    #[arg(long, help = "Re-plan both children of a node in parallel")]
    pub parallel_children: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub map_path: String,
    pub scen_path: Option<String>,
    pub agents_path: Option<String>,
    pub save_agents_path: Option<String>,
    pub output_path: Option<String>,
    pub num_agents: usize,
    pub agents_dist: Vec<usize>,
    pub min_distance: usize,
    pub seed: usize,
    pub max_high_level_expansions: Option<usize>,
    pub time_limit_ms: Option<u64>,
    pub horizon: Option<usize>,
    pub parallel_children: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map_path: "map_file/test/warehouse.map".to_string(),
            scen_path: None,
            agents_path: None,
            save_agents_path: None,
            output_path: None,
            num_agents: 8,
            agents_dist: Vec::new(),
            min_distance: 5,
            seed: 0,
            max_high_level_expansions: Some(100_000),
            time_limit_ms: Some(60_000),
            horizon: None,
            parallel_children: false,
        }
    }
}

impl Config {
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(map_path) = &cli.map_path {
            self.map_path = map_path.clone();
        }
        if cli.scen_path.is_some() {
            self.scen_path = cli.scen_path.clone();
        }
        if cli.agents_path.is_some() {
            self.agents_path = cli.agents_path.clone();
        }
        if cli.save_agents_path.is_some() {
            self.save_agents_path = cli.save_agents_path.clone();
        }
        if cli.output_path.is_some() {
            self.output_path = cli.output_path.clone();
        }
        if let Some(num_agents) = cli.num_agents {
            self.num_agents = num_agents;
        }
        if !cli.agents_dist.is_empty() {
            self.agents_dist = cli.agents_dist.clone();
        }
        if let Some(min_distance) = cli.min_distance {
            self.min_distance = min_distance;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if cli.max_high_level_expansions.is_some() {
            self.max_high_level_expansions = cli.max_high_level_expansions;
        }
        if cli.time_limit_ms.is_some() {
            self.time_limit_ms = cli.time_limit_ms;
        }
        if cli.horizon.is_some() {
            self.horizon = cli.horizon;
        }
        self.parallel_children |= cli.parallel_children;

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scen_path.is_some() && self.agents_path.is_some() {
            bail!("Give either a scenario file or an agent list, not both");
        }

        if !self.agents_dist.is_empty() {
            if self.scen_path.is_none() {
                bail!("Agent buckets need a scenario file");
            }
            if self.agents_dist.len() != self.num_agents {
                bail!(
                    "Number of agents {} does not match the {} given buckets",
                    self.num_agents,
                    self.agents_dist.len()
                );
            }
        }

        if self.max_high_level_expansions == Some(0) {
            bail!("High-level expansion budget must be positive");
        }

        if self.horizon == Some(0) {
            bail!("Horizon must be positive");
        }

        Ok(())
    }
}
