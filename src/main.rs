use mapf_cbs::common::Agent;
use mapf_cbs::config::{Cli, Config};
use mapf_cbs::map::Map;
use mapf_cbs::scenario::{generate_random_agents, Scenario};
use mapf_cbs::solver::{Solver, CBS};

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn load_agents(config: &Config, map: &Map) -> anyhow::Result<Vec<Agent>> {
    let mut rng = StdRng::seed_from_u64(config.seed as u64);

    if let Some(agents_path) = &config.agents_path {
        return Scenario::load_agents_from_yaml(agents_path)
            .with_context(|| format!("error with agent file: {agents_path}"));
    }

    if let Some(scen_path) = &config.scen_path {
        let scenario = Scenario::load_from_scen(scen_path)
            .with_context(|| format!("error with scenario file: {scen_path}"))?;
        return if config.agents_dist.is_empty() {
            scenario.generate_agents_randomly(config.num_agents, &mut rng)
        } else {
            scenario.generate_agents_by_buckets(config.num_agents, &config.agents_dist, &mut rng)
        };
    }

    generate_random_agents(map, config.num_agents, config.min_distance, &mut rng)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let map = Map::from_file(&config.map_path)
        .with_context(|| format!("error with map file: {}", config.map_path))?;
    let agents = load_agents(&config, &map)?;

    if let Some(save_agents_path) = &config.save_agents_path {
        Scenario::write_agents_to_yaml(save_agents_path, &agents)?;
        info!("Agents written to {save_agents_path}");
    }

    let mut cbs_solver = CBS::new(agents.clone(), &map)?;
    match cbs_solver.solve(&config) {
        Ok(solution) => {
            anyhow::ensure!(
                solution.verify(&map, &agents),
                "cbs solution failed verification"
            );
            info!(
                "cbs solution: cost {} makespan {} after {} high level expansions",
                solution.cost,
                solution.makespan(),
                solution.high_level_expanded
            );
            if let Some(output_path) = &config.output_path {
                solution.write_json(output_path)?;
                info!("Solution written to {output_path}");
            }
        }
        Err(err) => {
            error!("cbs solve fails [{}]: {err}", err.code());
            return Err(err.into());
        }
    }

    Ok(())
}
