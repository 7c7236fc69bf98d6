//! # Delve Command-Line Driver
//!
//! Generates a level, prints it, and optionally plays a short simulation in
//! which the player stands still while the monsters act.

use clap::{Parser, ValueEnum};
use delve::generation::utils::{create_rng, place_stairs, random_floor};
use delve::{
    draw_river, DelveError, DelveResult, DungeonGenerator, EncounterGenerator, GameState,
    GenerationConfig, Generator, ItemGenerator, Map, TileType, TowerGenerator, TurnRunner,
    UnderwaterCaveGenerator,
};
use log::{error, info};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LevelKind {
    Dungeon,
    River,
    Tower,
    Caves,
}

/// Command line arguments for the Delve driver.
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Generates dungeon levels and runs monster turns on them")]
#[command(version)]
struct Args {
    /// Random seed for generation and play
    #[arg(short, long)]
    seed: Option<u64>,

    /// Map width including the border
    #[arg(long)]
    width: Option<u32>,

    /// Map height including the border
    #[arg(long)]
    height: Option<u32>,

    /// Kind of level to generate
    #[arg(short, long, value_enum, default_value_t = LevelKind::Dungeon)]
    kind: LevelKind,

    /// Turns to simulate after generation
    #[arg(short, long, default_value_t = 0)]
    turns: u64,

    /// Generation config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the generated levels as JSON instead of ASCII
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    initialize_logging(&args.log_level);
    info!("Starting Delve v{}", delve::VERSION);

    if let Err(e) = run(&args) {
        error!("{}", e);
        eprintln!("delve: {}", e);
        std::process::exit(1);
    }
}

/// Initializes the logging backend at the requested level.
fn initialize_logging(log_level: &str) {
    #[cfg(feature = "dev-tools")]
    {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level.to_lowercase()));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .format_timestamp(None)
            .init();
    }
}

fn load_config(args: &Args) -> DelveResult<GenerationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading generation config from {}", path.display());
            GenerationConfig::from_json_file(path)?
        }
        None => GenerationConfig::new(args.seed.unwrap_or(12345)),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    Ok(config)
}

fn generate(kind: LevelKind, config: &GenerationConfig) -> DelveResult<Vec<Map>> {
    let mut rng = create_rng(config);
    info!(
        "Generating {:?} of {}x{} with seed {}",
        kind, config.width, config.height, config.seed
    );
    let levels = match kind {
        LevelKind::Dungeon => vec![DungeonGenerator::default().generate(config, &mut rng)?],
        LevelKind::River => {
            let mut map = DungeonGenerator::default().generate(config, &mut rng)?;
            draw_river(&mut map, &mut rng, config)?;
            vec![map]
        }
        LevelKind::Tower => vec![TowerGenerator::default().generate(config, &mut rng)?],
        LevelKind::Caves => UnderwaterCaveGenerator::default().generate(config, &mut rng)?,
    };
    Ok(levels)
}

fn run(args: &Args) -> DelveResult<()> {
    let config = load_config(args)?;
    let levels = generate(args.kind, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&levels)?);
    } else {
        for (depth, level) in levels.iter().enumerate() {
            if levels.len() > 1 {
                println!("Level {}:", depth + 1);
            }
            println!("{}", level.to_ascii());
        }
    }

    if args.turns > 0 {
        let Some(level) = levels.into_iter().next() else {
            return Ok(());
        };
        simulate(level, &config, args.turns)?;
    }
    Ok(())
}

/// Puts the player on the up staircase, fills the level and plays it out.
fn simulate(mut level: Map, config: &GenerationConfig, turns: u64) -> DelveResult<()> {
    let mut rng = create_rng(config);
    let entry = match level.positions_where(|t| t == TileType::UpStairs).first() {
        Some(&stairs) => stairs,
        None => place_stairs(&mut level, &mut rng)?.0,
    };
    let entry = if level.is_passable(entry) {
        entry
    } else {
        random_floor(&level, &mut rng)
            .ok_or_else(|| DelveError::InvalidState("Level has no floor to start on".to_string()))?
    };

    let mut state = GameState::new(level, config.seed);
    state.spawn_player(entry);
    let monsters = EncounterGenerator::new(config.clone()).populate(&mut state, &mut rng)?;
    let items = ItemGenerator::new(config.clone()).scatter_items(&mut state, &mut rng)?;
    info!("Simulating {} monsters and {} items", monsters.len(), items.len());

    let mut runner = TurnRunner::new(state);
    let played = runner.run(turns)?;
    for message in &runner.state.messages {
        println!("{}", message);
    }
    println!(
        "{} turns played, {} actors left{}",
        played,
        runner.state.objects.actor_ids().len(),
        if runner.is_over() { ", the player died" } else { "" }
    );
    Ok(())
}
