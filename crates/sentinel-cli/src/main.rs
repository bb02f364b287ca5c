mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config::Config;
use sentinel_sim::{Simulation, SimulationConfig};

#[derive(Parser)]
#[command(name = "sentinel", about = "Decentralized anomaly-detection testbed")]
struct Cli {
    /// Path to a TOML config file; defaults are used if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs a simulation for a number of steps and prints the final stats.
    Run {
        #[arg(long)]
        num_agents: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 10)]
        steps: u64,
        #[arg(long, default_value = "ledger_data")]
        data_dir: PathBuf,
    },
    /// Opens the ledger at the configured path and prints summary stats.
    Stats {
        #[arg(long, default_value = "ledger_data")]
        data_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { num_agents, seed, steps, data_dir } => run(config, num_agents, seed, steps, data_dir),
        Commands::Stats { data_dir } => stats(config, data_dir),
    }
}

fn run(config: Config, num_agents: Option<usize>, seed: Option<u64>, steps: u64, data_dir: PathBuf) -> anyhow::Result<()> {
    std::fs::create_dir_all(&data_dir)?;
    let mut ledger_config = config.ledger_config();
    ledger_config.path = data_dir.join("ledger.db").to_string_lossy().into_owned();

    let sim_config = SimulationConfig {
        num_agents: num_agents.unwrap_or(config.simulation.default_agents),
        seed,
        use_parallel_threshold: config.simulation.use_parallel_threshold,
        stop_on_error: config.simulation.stop_on_error,
        node_config: config.node_config(),
        ledger_config,
        blacklist_dir: data_dir.join("blacklists"),
    };

    let mut simulation = Simulation::new(sim_config)?;
    simulation.run(steps)?;
    print_stats(&simulation);
    simulation.close();
    Ok(())
}

fn stats(config: Config, data_dir: PathBuf) -> anyhow::Result<()> {
    let mut ledger_config = config.ledger_config();
    ledger_config.path = data_dir.join("ledger.db").to_string_lossy().into_owned();

    let sim_config = SimulationConfig {
        num_agents: config.simulation.default_agents,
        seed: None,
        use_parallel_threshold: config.simulation.use_parallel_threshold,
        stop_on_error: config.simulation.stop_on_error,
        node_config: config.node_config(),
        ledger_config,
        blacklist_dir: data_dir.join("blacklists"),
    };
    let simulation = Simulation::new(sim_config)?;
    print_stats(&simulation);
    Ok(())
}

fn print_stats(simulation: &Simulation) {
    let stats = simulation.stats();
    println!("step_count:    {}", stats.step_count);
    println!("num_agents:    {}", stats.num_agents);
    println!("threshold:     {}", stats.threshold);
    println!("use_parallel:  {}", stats.use_parallel);
    println!("runtime:       {:?}", stats.runtime);
    println!("avg_step_time: {:?}", stats.avg_step_time);
    println!("ledger_size:   {}", stats.ledger_size);
}
