//! Map Conquest - interactive terminal driver
//!
//! Reads commands from stdin, runs the match timers on a single-threaded
//! tokio runtime and saves the session after every change.

use std::path::PathBuf;

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{sleep_until, Instant};
use tracing_subscriber::EnvFilter;

use map_conquest::atlas::Atlas;
use map_conquest::core::error::Result;
use map_conquest::core::types::{RegionId, TeamId};
use map_conquest::core::GameConfig;
use map_conquest::ledger::Roster;
use map_conquest::session::{
    clear_snapshot, load_session, open_store, save_session, FireOutcome, GameSession, MatchStateMachine,
    ScheduledTransition, SnapshotStore,
};

#[derive(Parser, Debug)]
#[command(name = "map-conquest")]
#[command(about = "Play a territorial conquest game in the terminal")]
struct Args {
    /// SVG map with one <path> per region
    #[arg(long, default_value = "data/demo_map.svg")]
    map: PathBuf,

    /// JSON table of precomputed region centers
    #[arg(long)]
    coordinates: Option<PathBuf>,

    /// TOML roster used when no saved teams exist
    #[arg(long)]
    roster: Option<PathBuf>,

    /// TOML game configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the saved session
    #[arg(long, default_value = ".conquest")]
    save_dir: PathBuf,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,
}

/// The one outstanding timer
struct Timer {
    token: u64,
    deadline: Instant,
}

impl Timer {
    fn arm(scheduled: ScheduledTransition) -> Self {
        Self {
            token: scheduled.token,
            deadline: Instant::now() + scheduled.delay,
        }
    }
}

struct Game {
    config: GameConfig,
    atlas: Atlas,
    session: GameSession,
    machine: MatchStateMachine,
    store: Box<dyn SnapshotStore>,
    rng: ChaCha8Rng,
    timer: Option<Timer>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("map_conquest=info")))
        .init();

    let args = Args::parse();
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let mut atlas = Atlas::load(&args.map, args.coordinates.as_deref(), config.split.curve_segments)?;
    let store = open_store(&args.save_dir);
    let mut session = load_session(store.as_ref(), &mut atlas, &config);
    let machine = MatchStateMachine::new(&config);
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    if session.ledger().is_empty() {
        if let Some(path) = &args.roster {
            let roster = Roster::load(path)?;
            let created = machine.seed_from_roster(&mut session, &roster, &atlas, &config)?;
            tracing::info!(teams = created.len(), "roster loaded");
        }
    }

    let timer = machine.resume(&mut session, &mut rng).map(Timer::arm);
    let mut game = Game {
        config,
        atlas,
        session,
        machine,
        store,
        rng,
        timer,
    };

    println!("\n=== MAP CONQUEST ===");
    println!("{} regions, {} teams, seed {}", game.atlas.len(), game.session.ledger().len(), seed);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let deadline = game.timer.as_ref().map(|t| t.deadline);
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !game.handle_command(line.trim()) {
                    break;
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                game.on_timer();
            }
        }
        save_session(game.store.as_mut(), &game.session, &game.atlas);
    }

    save_session(game.store.as_mut(), &game.session, &game.atlas);
    println!("Goodbye.");
    Ok(())
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  teams                  - List teams");
    println!("  regions                - List regions and their owners");
    println!("  add <region> <name>    - Add a team with a home region");
    println!("  rename <id> <name>     - Rename a team");
    println!("  start                  - Start the game");
    println!("  reselect               - Draw a different opponent");
    println!("  win <id>               - Declare the winner of the current match");
    println!("  split <region>         - Split a neutral region in two");
    println!("  status                 - Show the current match");
    println!("  history                - Show recent rounds");
    println!("  clear                  - Wipe the session");
    println!("  quit / q               - Exit");
    println!();
}

impl Game {
    /// Returns false when the driver should exit
    fn handle_command(&mut self, input: &str) -> bool {
        let (command, rest) = input.split_once(' ').unwrap_or((input, ""));
        let rest = rest.trim();

        match command {
            "" => {}
            "quit" | "q" => return false,
            "help" | "h" => print_help(),
            "teams" => self.print_teams(),
            "regions" => self.print_regions(),
            "status" | "s" => self.print_status(),
            "history" => self.print_history(),
            "add" => self.add_team(rest),
            "rename" => self.rename_team(rest),
            "start" => match self.machine.start(&mut self.session, &mut self.rng) {
                Ok(scheduled) => {
                    println!("Drawing an opponent...");
                    self.timer = Some(Timer::arm(scheduled));
                }
                Err(e) => println!("Cannot start: {}", e),
            },
            "reselect" => match self.machine.reselect_opponent(&mut self.session) {
                Ok(scheduled) => {
                    println!("Drawing a new opponent...");
                    self.timer = Some(Timer::arm(scheduled));
                }
                Err(e) => println!("Cannot reselect: {}", e),
            },
            "win" => self.declare_winner(rest),
            "split" => self.split_region(rest),
            "clear" => {
                self.machine.clear(&mut self.session);
                self.timer = None;
                if let Err(e) = clear_snapshot(self.store.as_mut()) {
                    tracing::warn!(error = %e, "failed to clear saved session");
                }
                println!("Session cleared.");
            }
            other => println!("Unknown command '{}'. Type 'help' for commands.", other),
        }
        true
    }

    fn on_timer(&mut self) {
        let Some(timer) = self.timer.take() else {
            return;
        };
        match self.machine.fire(&mut self.session, timer.token, &self.atlas, &mut self.rng) {
            FireOutcome::Stale => {}
            FireOutcome::OpponentDrawn { acting, opponent } => {
                println!(
                    "Round {}: {} vs {}  (win <id> to decide)",
                    self.session.round(),
                    self.team_label(acting),
                    self.team_label(opponent)
                );
            }
            FireOutcome::NextRound(scheduled) => {
                println!("Next round, drawing an opponent...");
                self.timer = Some(Timer::arm(scheduled));
            }
            FireOutcome::GameOver { champion } => match champion {
                Some(id) => println!("Game over! {} conquered the map.", self.team_label(id)),
                None => println!("Game over."),
            },
        }
    }

    fn team_label(&self, id: TeamId) -> String {
        match self.session.ledger().team(id) {
            Some(team) => format!("[{}] {}", team.id, team.name),
            None => format!("[{}]", id),
        }
    }

    /// Split "<region words...> <name words...>" at the longest known region
    fn add_team(&mut self, rest: &str) {
        let words: Vec<&str> = rest.split_whitespace().collect();
        let found = (1..words.len()).rev().find_map(|k| {
            let region = RegionId::new(words[..k].join(" "));
            let region = RegionId::new(self.config.resolve_alias(region.as_str()));
            self.atlas.contains(&region).then(|| (region, words[k..].join(" ")))
        });
        let Some((region, name)) = found else {
            println!("Usage: add <region> <name> (region must exist)");
            return;
        };

        match self.machine.add_team(&mut self.session, &name, &region, &self.atlas) {
            Ok(id) => println!("Added {} in {}", self.team_label(id), region),
            Err(e) => println!("Cannot add team: {}", e),
        }
    }

    fn rename_team(&mut self, rest: &str) {
        let (id, name) = rest.split_once(' ').unwrap_or((rest, ""));
        let Ok(id) = id.parse::<u32>() else {
            println!("Usage: rename <id> <name>");
            return;
        };
        match self.machine.rename_team(&mut self.session, TeamId(id), name) {
            Ok(()) => println!("Renamed to {}", self.team_label(TeamId(id))),
            Err(e) => println!("Cannot rename: {}", e),
        }
    }

    fn declare_winner(&mut self, rest: &str) {
        let Ok(id) = rest.parse::<u32>() else {
            println!("Usage: win <id>");
            return;
        };
        match self.machine.declare_winner(&mut self.session, TeamId(id), &mut self.rng) {
            Ok(resolution) => {
                match &resolution.transfer.region {
                    Some(region) => println!(
                        "{} takes {} from {}",
                        self.team_label(resolution.winner),
                        region,
                        self.team_label(resolution.loser)
                    ),
                    None => println!("{} wins, nothing left to take", self.team_label(resolution.winner)),
                }
                if resolution.transfer.loser_eliminated {
                    println!("{} has been eliminated!", self.team_label(resolution.loser));
                }
                self.timer = Some(Timer::arm(resolution.next));
            }
            Err(e) => println!("Cannot declare winner: {}", e),
        }
    }

    fn split_region(&mut self, rest: &str) {
        if rest.is_empty() {
            println!("Usage: split <region>");
            return;
        }
        let region = RegionId::new(rest);
        match self.machine.split_region(&mut self.session, &region, &mut self.atlas) {
            Ok(outcome) => println!(
                "Split {} into {} and {} (axis {}°)",
                outcome.parent,
                outcome.children[0],
                outcome.children[1],
                outcome.axis.degrees()
            ),
            Err(e) => println!("Cannot split {}: {}", region, e),
        }
    }

    fn print_teams(&self) {
        let teams = self.session.ledger().teams();
        if teams.is_empty() {
            println!("No teams yet. Use 'add <region> <name>'.");
            return;
        }
        println!("{:>4}  {:<24} {:<8} {:>5} {:>7}", "id", "name", "color", "score", "regions");
        for team in teams {
            println!(
                "{:>4}  {:<24} {:<8} {:>5} {:>7}{}",
                team.id,
                team.name,
                team.color,
                team.score,
                team.region_count(),
                if team.eliminated { "  (eliminated)" } else { "" }
            );
        }
    }

    fn print_regions(&self) {
        for region in self.atlas.region_ids() {
            let owner = self
                .session
                .ledger()
                .owner_of(region)
                .map(|id| self.team_label(id))
                .unwrap_or_else(|| "neutral".to_string());
            println!("  {:<28} {}", region.as_str(), owner);
        }
    }

    fn print_status(&self) {
        println!(
            "Round {} | {:?} | {} of {} teams in play",
            self.session.round(),
            self.session.stage(),
            self.session.ledger().active_count(),
            self.session.ledger().len()
        );
        if let Some(pair) = self.session.pair() {
            match pair.opponent {
                Some(opponent) => println!("  {} vs {}", self.team_label(pair.acting), self.team_label(opponent)),
                None => println!("  {} is looking for an opponent", self.team_label(pair.acting)),
            }
        }
    }

    fn print_history(&self) {
        if self.session.history().is_empty() {
            println!("No rounds played yet.");
        }
        for round in self.session.history().iter() {
            let [first, second] = &round.participants;
            println!(
                "  Round {:>3}: {} vs {} -> winner [{}]{}",
                round.round,
                first.name,
                second.name,
                round.winner,
                round
                    .transferred
                    .as_ref()
                    .map(|r| format!(", took {}", r))
                    .unwrap_or_default()
            );
        }
    }
}
