mod sim;

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use fogwall_runtime::EngineConfig;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};

#[derive(Parser, Debug)]
#[command(
    name = "fogwall",
    about = "Headless simulator for the per-player fake border and dark light"
)]
struct Args {
    /// TOML engine config; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ticks to simulate
    #[arg(long, default_value_t = 400)]
    ticks: u64,
    /// Number of walking players
    #[arg(long, default_value_t = 2)]
    players: u32,
    /// Blocks each player walks per tick
    #[arg(long, default_value_t = 0.5)]
    speed: f64,
    /// Also write a debug log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Run the tick drivers on their own threads at wall-clock rate
    #[arg(long, default_value_t = false)]
    realtime: bool,
    /// Log every packet batch at info
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => {
            CombinedLogger::init(vec![
                TermLogger::new(
                    LevelFilter::Info,
                    Config::default(),
                    TerminalMode::Mixed,
                    ColorChoice::Auto,
                ),
                WriteLogger::new(LevelFilter::Debug, Config::default(), File::create(path)?),
            ])?;
        }
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    if args.verbose {
        config.verbose_logging = true;
    }
    log::info!(
        "fogwall: {} players, {} ticks, policy {:?}, radius {}",
        args.players,
        args.ticks,
        config.border_policy,
        config.border_radius
    );

    let params = sim::SimParams {
        ticks: args.ticks,
        players: args.players,
        speed: args.speed,
        realtime: args.realtime,
    };
    let summary = sim::run(config, &params)?;
    log::info!("{}", summary);
    Ok(())
}
