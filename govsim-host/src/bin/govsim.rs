use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use govsim_core::outcome::{OutcomeClassifier, StandardClassifier, victory};
use govsim_core::scenario::{Difficulty, Scenario, StartingCondition, initial_state};
use govsim_core::scoring::Scorecard;
use govsim_core::selectors::degraded_assumptions_with;
use govsim_core::{Reducer, SimConfig, State};
use govsim_host::{ActionLog, ChoiceInput, Session, standard_milestones};

fn print_usage() {
    println!("govsim <command>");
    println!("commands:");
    println!("  init <scenario.json> [difficulty] [condition]");
    println!("    prints the turn-0 state as JSON");
    println!("  replay <initial_state.json> <actions.json>");
    println!("    re-runs an action log and prints the final metrics and audit trail");
    println!("  play <scenario.json> <choices.json> [difficulty] [condition]");
    println!("    plays a choice transcript through a session with the standard milestones");
    println!("  inspect <state.json>");
    println!("    prints indices, loss warnings and degraded assumptions");
    println!("env:");
    println!("  GOVSIM_CONFIG   path to a TOML config (optional)");
    println!("  RUST_LOG        log filter, overrides the config's log level");
}

fn load_config() -> Result<SimConfig> {
    match env::var("GOVSIM_CONFIG").ok().filter(|v| !v.trim().is_empty()) {
        Some(path) => SimConfig::from_file(Path::new(&path))
            .with_context(|| format!("failed to load config from {path}")),
        None => Ok(SimConfig::default()),
    }
}

fn init_tracing(config: &SimConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn arg_path(args: &[String], index: usize, label: &str) -> Result<PathBuf> {
    args.get(index)
        .map(PathBuf::from)
        .with_context(|| format!("missing {label}"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Parse a snake_case variant name the same way the content files spell it.
fn parse_variant<T: DeserializeOwned + Default>(value: Option<&String>, label: &str) -> Result<T> {
    match value {
        None => Ok(T::default()),
        Some(raw) => serde_json::from_value(serde_json::Value::String(raw.clone()))
            .with_context(|| format!("invalid {label}: {raw}")),
    }
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Scenario::from_json(&raw)?)
}

fn print_summary<C: OutcomeClassifier>(state: &State, reducer: &Reducer<C>) {
    let m = &state.metrics;
    println!("turn={} node={} phase={}", state.turn, state.current_node_id, state.phase_id);
    println!(
        "measured: efficiency={:.3} cost={:.3} incidents={:.3} adoption={:.3}",
        m.measured.production_efficiency,
        m.measured.cost_per_unit,
        m.measured.welfare_incident_rate,
        m.measured.welfare_standard_adoption
    );
    println!(
        "unmeasured: debt={:.3} gap={:.3} capture={:.3} knowledge={:.3} irreversibility={:.3}",
        m.unmeasured.welfare_debt,
        m.unmeasured.enforcement_gap,
        m.unmeasured.regulatory_capture,
        m.unmeasured.sentience_knowledge_gap,
        m.unmeasured.system_irreversibility
    );
    println!("audit trail:");
    for record in &state.audit_trail {
        println!(
            "  [{}] {} {} -> {:?} ({})",
            record.turn, record.node_id, record.choice_id, record.chosen_label, record.unmeasured_impact
        );
    }
    println!("transitions: {}", reducer.monitor().percentiles().summary());
}

fn print_inspection(state: &State, config: &SimConfig) {
    let card = Scorecard::of(state);
    println!("turn={} node={}", state.turn, state.current_node_id);
    println!("measured success index: {:.3}", card.measured_success);
    println!("governance debt index:  {:.3}", card.governance_debt);
    match card.average_region {
        Some(avg) => println!("average region value:   {avg:.3}"),
        None => println!("average region value:   n/a (no tracked regions)"),
    }
    let warnings = StandardClassifier.loss_warnings(state);
    if warnings.is_empty() {
        println!("loss warnings: none");
    } else {
        println!("loss warnings:");
        for w in warnings {
            println!("  {:?} {}", w.severity, w.kind);
        }
    }
    if let Some(kind) = victory(state) {
        println!("victory reached: {kind:?}");
    }
    let degraded = degraded_assumptions_with(state, config.memory.degraded_threshold);
    println!("degraded assumptions: {}", degraded.len());
    for a in degraded {
        println!("  {:.2} {:?} (since turn {})", a.strength, a.text, a.created_turn);
    }
}

fn run(args: &[String]) -> Result<()> {
    let config = load_config()?;
    config.validate()?;
    init_tracing(&config);

    match args.get(1).map(String::as_str) {
        Some("init") => {
            let scenario = load_scenario(&arg_path(args, 2, "scenario path")?)?;
            let difficulty: Difficulty = parse_variant(args.get(3), "difficulty")?;
            let condition: StartingCondition = parse_variant(args.get(4), "condition")?;
            let state = initial_state(&scenario, difficulty, condition);
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Some("replay") => {
            let initial: State = read_json(&arg_path(args, 2, "initial state path")?)?;
            let log = ActionLog::load(&arg_path(args, 3, "action log path")?)?;
            let reducer = Reducer::new(config);
            let state = log.replay(&initial, &reducer);
            println!("replayed {} actions", log.len());
            print_summary(&state, &reducer);
        }
        Some("play") => {
            let scenario = load_scenario(&arg_path(args, 2, "scenario path")?)?;
            let transcript: Vec<ChoiceInput> = read_json(&arg_path(args, 3, "choices path")?)?;
            let difficulty: Difficulty = parse_variant(args.get(4), "difficulty")?;
            let condition: StartingCondition = parse_variant(args.get(5), "condition")?;
            let state = initial_state(&scenario, difficulty, condition);
            let session = Session::replay(
                scenario,
                state,
                Reducer::new(config),
                standard_milestones(),
                &transcript,
            )?;
            let state = session.state();
            print_summary(state, session.reducer());
            println!("complete: {}", state.flags.is_complete);
            println!("achievements: {:?}", state.achievements);
            println!("wonders: {:?}", state.completed_wonders);
            let people: Vec<&str> = state.great_people.iter().map(|p| p.title.as_str()).collect();
            println!("great people: {people:?}");
        }
        Some("inspect") => {
            let state: State = read_json(&arg_path(args, 2, "state path")?)?;
            print_inspection(&state, &config);
        }
        Some(other) => {
            print_usage();
            bail!("unknown command: {other}");
        }
        None => print_usage(),
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if let Err(err) = run(&args) {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}
