//! Headless Conquest Simulation
//!
//! Plays a whole game with random winners and no delays, then prints a
//! summary (and optionally writes it as JSON).

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use map_conquest::atlas::Atlas;
use map_conquest::core::config::TimingConfig;
use map_conquest::core::types::RegionId;
use map_conquest::core::GameConfig;
use map_conquest::ledger::{Roster, TeamSnapshot};
use map_conquest::session::{FireOutcome, GameSession, MatchRound, MatchStateMachine};

/// Headless Conquest Simulation - auto-play a full game
#[derive(Parser, Debug)]
#[command(name = "conquest_sim")]
#[command(about = "Auto-play a conquest game with random winners")]
struct Args {
    /// SVG map with one <path> per region
    #[arg(long, default_value = "data/demo_map.svg")]
    map: PathBuf,

    /// JSON table of precomputed region centers
    #[arg(long)]
    coordinates: Option<PathBuf>,

    /// TOML roster of starting teams
    #[arg(long, default_value = "data/roster.toml")]
    roster: PathBuf,

    /// TOML game configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Neutral regions to split before the game starts
    #[arg(long = "split")]
    splits: Vec<String>,

    /// Stop after this many rounds even without a champion
    #[arg(long, default_value_t = 10_000)]
    max_rounds: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Write the summary as JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationSummary {
    seed: u64,
    rounds_played: u32,
    champion: Option<TeamSnapshot>,
    teams: Vec<TeamSnapshot>,
    recent_rounds: Vec<MatchRound>,
    elapsed_ms: f64,
}

fn main() -> map_conquest::core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("map_conquest=warn")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut atlas = Atlas::load(&args.map, args.coordinates.as_deref(), config.split.curve_segments)?;
    let machine = MatchStateMachine::new(&config).with_timing(TimingConfig::immediate());
    let mut session = GameSession::new(&config);

    for region in &args.splits {
        match machine.split_region(&mut session, &RegionId::new(region.as_str()), &mut atlas) {
            Ok(outcome) => println!(
                "Split {} into {} and {}",
                outcome.parent, outcome.children[0], outcome.children[1]
            ),
            Err(e) => eprintln!("Warning: could not split '{}': {}", region, e),
        }
    }

    let roster = Roster::load(&args.roster)?;
    machine.seed_from_roster(&mut session, &roster, &atlas, &config)?;

    println!("Starting Conquest Simulation");
    println!("============================");
    println!("Map: {} regions", atlas.len());
    println!("Teams: {}", session.ledger().len());
    println!("Seed: {}", seed);
    println!();

    let start = Instant::now();
    let mut next = Some(machine.start(&mut session, &mut rng)?);
    while let Some(scheduled) = next.take() {
        if session.round() > args.max_rounds {
            println!("Stopped after {} rounds without a champion", args.max_rounds);
            break;
        }
        match machine.fire(&mut session, scheduled.token, &atlas, &mut rng) {
            FireOutcome::OpponentDrawn { acting, opponent } => {
                let winner = if rng.gen_bool(0.5) { acting } else { opponent };
                let resolution = machine.declare_winner(&mut session, winner, &mut rng)?;
                next = Some(resolution.next);
            }
            FireOutcome::NextRound(scheduled) => next = Some(scheduled),
            FireOutcome::GameOver { .. } | FireOutcome::Stale => {}
        }
    }
    let elapsed = start.elapsed();

    let ledger = session.ledger();
    let champion = match ledger.active_count() {
        1 => ledger.active_teams().next().map(|t| t.snapshot()),
        _ => None,
    };
    let summary = SimulationSummary {
        seed,
        rounds_played: session.round() - 1,
        champion,
        teams: ledger.teams().iter().map(|t| t.snapshot()).collect(),
        recent_rounds: session.history().to_vec(),
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
    };

    println!("Rounds played: {}", summary.rounds_played);
    match &summary.champion {
        Some(champion) => println!("Champion: [{}] {} with {} regions", champion.id, champion.name, champion.region_count),
        None => println!("No champion"),
    }
    println!("\n--- Final Standings ---");
    let mut standings: Vec<&TeamSnapshot> = summary.teams.iter().collect();
    standings.sort_by_key(|t| (std::cmp::Reverse(t.score), t.id));
    for team in standings {
        println!("  [{}] {:<24} score {:>3}  regions {:>3}", team.id, team.name, team.score, team.region_count);
    }
    println!("Actual time: {:.2}ms", summary.elapsed_ms);

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)?;
        println!("\nFull output written to {}", path.display());
    }

    Ok(())
}
