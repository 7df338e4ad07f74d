use std::env;
use std::net::SocketAddr;

use contracts::{RunPhase, RunStatus, ScenarioConfig};
use sim_api::{serve, EngineApi};
use sim_core::run::RunSetup;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("sim-cli <command>");
    println!("commands:");
    println!("  serve [addr]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  simulate <run_id> <seed> [rounds] [teams] [sqlite_path]");
    println!("    plays every round with default decisions and persists to sqlite");
    println!("  replay <sqlite_path> <run_id>");
    println!("    rebuilds a stored run from its export and verifies determinism");
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn parse_seed(value: Option<&String>) -> Result<u64, String> {
    let raw = value.ok_or_else(|| "missing seed".to_string())?;
    raw.parse::<u64>()
        .map_err(|_| format!("invalid seed: {raw}"))
}

fn default_sqlite_path() -> String {
    std::env::var("SIM_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "sim_runs.sqlite".to_string())
}

fn parse_sqlite_path(value: Option<&String>) -> String {
    value
        .map(String::to_string)
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path)
}

fn print_leaderboard(api: &EngineApi) {
    for entry in api.leaderboard() {
        println!(
            "  #{} {} ({}) round={} total={:.1}",
            entry.rank, entry.name, entry.team_id, entry.round, entry.scorecard.total
        );
    }
}

fn run_simulation(args: &[String]) -> Result<RunStatus, String> {
    let run_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing run_id".to_string())?;
    let seed = parse_seed(args.get(3))?;
    let rounds = args
        .get(4)
        .map(|value| {
            value
                .parse::<u32>()
                .map_err(|_| format!("invalid rounds: {value}"))
        })
        .transpose()?;
    let teams = args
        .get(5)
        .map(|value| {
            value
                .parse::<u32>()
                .map_err(|_| format!("invalid teams: {value}"))
        })
        .transpose()?
        .unwrap_or(1)
        .max(1);
    let sqlite_path = parse_sqlite_path(args.get(6));

    let mut scenario = ScenarioConfig::default();
    if let Some(rounds) = rounds {
        scenario.max_rounds = rounds.max(1);
    }
    let max_rounds = scenario.max_rounds;

    let mut api = EngineApi::from_setup(RunSetup {
        run_id: run_id.clone(),
        seed,
        scenario,
    });
    api.attach_sqlite_store(&sqlite_path)
        .map_err(|err| format!("failed to attach sqlite store: {err}"))?;
    api.initialize_run_storage(true)
        .map_err(|err| format!("failed to initialize run storage: {err}"))?;

    for index in 1..=teams {
        let team_id = format!("team-{index:02}");
        api.add_team(team_id.clone(), team_id)
            .map_err(|err| format!("failed to add team: {err}"))?;
    }
    api.start().map_err(|err| format!("failed to start: {err}"))?;

    while api.status().phase == RunPhase::Running {
        api.advance_all()
            .map_err(|err| format!("failed to advance: {err}"))?;
    }

    if let Some(error) = api.last_persistence_error() {
        return Err(format!("persistence error after simulation: {error}"));
    }

    println!(
        "simulated run_id={} seed={} rounds={} teams={} sqlite={}",
        run_id, seed, max_rounds, teams, sqlite_path
    );
    print_leaderboard(&api);
    Ok(api.status())
}

fn run_replay(args: &[String]) -> Result<(), String> {
    let sqlite_path = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing sqlite_path".to_string())?;
    let run_id = args
        .get(3)
        .cloned()
        .ok_or_else(|| "missing run_id".to_string())?;

    // Shell engine exists only to reach the store; the replayed run replaces it.
    let mut shell = EngineApi::from_setup(RunSetup {
        run_id: run_id.clone(),
        seed: 0,
        scenario: ScenarioConfig::default(),
    });
    shell
        .attach_sqlite_store(&sqlite_path)
        .map_err(|err| format!("failed to attach sqlite store: {err}"))?;
    let export = shell
        .load_replay(&run_id)
        .map_err(|err| format!("failed to load run: {err}"))?;

    let replayed =
        EngineApi::from_export(export.clone()).map_err(|err| format!("replay failed: {err}"))?;
    let mut verified = replayed.export_replay() == export;

    // Rebuilt states must also match the snapshots and event rows the
    // store wrote while the run was live.
    for team in &export.teams {
        let state = replayed
            .team_state(&team.team_id)
            .map_err(|err| format!("missing replayed team: {err}"))?;
        match shell
            .load_stored_team_state(&run_id, &team.team_id)
            .map_err(|err| format!("failed to load stored snapshot: {err}"))?
        {
            Some(stored) if &stored == state => {}
            Some(_) => {
                eprintln!("snapshot mismatch for team {}", team.team_id);
                verified = false;
            }
            None => {}
        }
        let stored_events = shell
            .load_stored_events(&run_id, &team.team_id, 1, state.round)
            .map_err(|err| format!("failed to load stored events: {err}"))?;
        if stored_events != state.event_history {
            eprintln!("event history mismatch for team {}", team.team_id);
            verified = false;
        }
    }

    println!(
        "replayed run_id={} seed={} teams={} deterministic={}",
        run_id,
        export.seed,
        export.teams.len(),
        verified
    );
    print_leaderboard(&replayed);

    if verified {
        Ok(())
    } else {
        Err("replayed run diverged from stored export".to_string())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                println!("serving api on http://{addr}");
                if let Err(err) = serve(addr).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                eprintln!("error: {}", err);
                print_usage();
                std::process::exit(2);
            }
        },
        Some("simulate") => {
            if let Err(err) = run_simulation(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("replay") => {
            if let Err(err) = run_replay(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        _ => {
            print_usage();
        }
    }
}
