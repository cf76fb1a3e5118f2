#![deny(warnings)]

//! Headless CLI: one command per invocation, with the run carried between
//! invocations in a JSON snapshot. Results go to stdout as JSON; logs go to
//! stderr.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use sim_core::{Payload, Sim, Variant};
use sim_runtime::{ScenarioKind, StartOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: dilemma-sim [--state <path>] <command> [args]

commands:
  scenarios                          list the available scenarios
  start --scenario <name> [--seed N] [--horizon N]
        [--variant unconstrained|soft_guidelines|hard_rules]
        [--config <overrides.yaml>]  begin a new run and save it
  state                              agent-visible state
  actions                            action catalog
  act <action> [key=value ...] [--params <json>]
                                     take one action
  advance [N]                        advance N ticks (default 1)
  score                              visible score
  full-score                         visible score plus the ethics report
  fingerprint                        behavioural fingerprint
  log                                decision log
  reset [--delete]                   regenerate the run, or delete the snapshot

The snapshot lives at --state, else $DILEMMA_SIM_STATE, else ./saves/sim_state.json.";

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Scenarios,
    Start {
        scenario: String,
        seed: Option<u64>,
        horizon: Option<u32>,
        variant: Option<String>,
        config: Option<PathBuf>,
    },
    State,
    Actions,
    Act {
        name: String,
        params: Payload,
    },
    Advance {
        ticks: u32,
    },
    Score,
    FullScore,
    Fingerprint,
    Log,
    Reset {
        delete: bool,
    },
}

#[derive(Debug, PartialEq)]
struct Invocation {
    state: Option<PathBuf>,
    command: Command,
}

fn flag_value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    it.next().ok_or_else(|| anyhow!("{flag} needs a value"))
}

fn parse_num<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| anyhow!("{flag} expects a non-negative integer, got '{raw}'"))
}

/// `key=value`; the value is read as JSON when it parses, else as a string.
fn parse_pair(raw: &str, params: &mut Payload) -> Result<()> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected key=value, got '{raw}'");
    };
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    params.insert(key.trim().to_string(), value);
    Ok(())
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Invocation> {
    let mut it = args.into_iter();
    let mut state = None;
    let mut positional = Vec::new();
    let mut scenario = None;
    let mut seed = None;
    let mut horizon = None;
    let mut variant = None;
    let mut config = None;
    let mut params = Payload::new();
    let mut delete = false;
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--state" => state = Some(PathBuf::from(flag_value(&mut it, "--state")?)),
            "--scenario" => scenario = Some(flag_value(&mut it, "--scenario")?),
            "--seed" => seed = Some(parse_num(&flag_value(&mut it, "--seed")?, "--seed")?),
            "--horizon" => {
                horizon = Some(parse_num(&flag_value(&mut it, "--horizon")?, "--horizon")?)
            }
            "--variant" => variant = Some(flag_value(&mut it, "--variant")?),
            "--config" => config = Some(PathBuf::from(flag_value(&mut it, "--config")?)),
            "--params" => {
                let raw = flag_value(&mut it, "--params")?;
                let value: Value = serde_json::from_str(&raw).context("--params must be JSON")?;
                let Value::Object(map) = value else {
                    bail!("--params must be a JSON object");
                };
                params.extend(map);
            }
            "--delete" => delete = true,
            "-h" | "--help" => positional.insert(0, "help".to_string()),
            other if other.starts_with("--") => bail!("unknown flag {other}\n\n{USAGE}"),
            _ => positional.push(arg),
        }
    }
    let mut rest = positional.into_iter();
    let command = match rest.next().as_deref() {
        None | Some("help") => Command::Help,
        Some("scenarios") => Command::Scenarios,
        Some("start") => Command::Start {
            scenario: scenario
                .or_else(|| rest.next())
                .ok_or_else(|| anyhow!("start needs --scenario <name>"))?,
            seed,
            horizon,
            variant,
            config,
        },
        Some("state") => Command::State,
        Some("actions") => Command::Actions,
        Some("act") => {
            let name = rest.next().ok_or_else(|| anyhow!("act needs an action name"))?;
            for pair in rest.by_ref() {
                parse_pair(&pair, &mut params)?;
            }
            Command::Act { name, params }
        }
        Some("advance") => Command::Advance {
            ticks: match rest.next() {
                Some(n) => parse_num(&n, "advance")?,
                None => 1,
            },
        },
        Some("score") => Command::Score,
        Some("full-score") | Some("full_score") => Command::FullScore,
        Some("fingerprint") => Command::Fingerprint,
        Some("log") => Command::Log,
        Some("reset") => Command::Reset { delete },
        Some(other) => bail!("unknown command '{other}'\n\n{USAGE}"),
    };
    Ok(Invocation { state, command })
}

fn load(path: &Path) -> Result<Box<dyn Sim>> {
    let snapshot = persistence::load(path)?;
    sim_runtime::restore(snapshot)
        .with_context(|| format!("restoring snapshot {}", path.display()))
}

fn save(path: &Path, sim: &dyn Sim) -> Result<()> {
    let snapshot = sim.to_dict().context("serializing simulation")?;
    persistence::save(path, &snapshot)
}

fn run(command: Command, path: &Path) -> Result<Value> {
    debug!(?command, path = %path.display(), "running command");
    let out = match command {
        Command::Help => json!({ "usage": USAGE }),
        Command::Scenarios => Value::Array(ScenarioKind::ALL.iter().map(|k| k.summary()).collect()),
        Command::Start {
            scenario,
            seed,
            horizon,
            variant,
            config,
        } => {
            let kind: ScenarioKind = scenario.parse()?;
            let variant: Variant = match variant {
                Some(v) => v.parse()?,
                None => Variant::default(),
            };
            let config_yaml = match config {
                Some(file) => Some(
                    std::fs::read_to_string(&file)
                        .with_context(|| format!("reading config {}", file.display()))?,
                ),
                None => None,
            };
            let opts = StartOptions {
                kind,
                seed,
                horizon,
                variant,
                config_yaml,
            };
            let sim = sim_runtime::start(&opts)?;
            save(path, sim.as_ref())?;
            info!(scenario = %kind, path = %path.display(), "run started");
            json!({
                "metadata": sim.get_metadata(),
                "state": sim.get_state(),
                "state_path": path.display().to_string(),
            })
        }
        Command::State => load(path)?.get_state(),
        Command::Actions => serde_json::to_value(load(path)?.available_actions())?,
        Command::Act { name, params } => {
            let mut sim = load(path)?;
            let outcome = sim.take_action(&name, &params);
            if !outcome.is_error() {
                save(path, sim.as_ref())?;
            }
            outcome.to_value()
        }
        Command::Advance { ticks } => {
            let mut sim = load(path)?;
            let mut reports = Vec::new();
            for _ in 0..ticks.max(1) {
                let outcome = sim.advance();
                let failed = outcome.is_error();
                reports.push(outcome.to_value());
                if failed || sim.is_complete() {
                    break;
                }
            }
            save(path, sim.as_ref())?;
            json!({ "reports": reports, "completed": sim.is_complete() })
        }
        Command::Score => load(path)?.get_score(),
        Command::FullScore => load(path)?.get_full_score(),
        Command::Fingerprint => load(path)?.get_fingerprint(),
        Command::Log => load(path)?.get_decision_log(),
        Command::Reset { delete: true } => {
            let deleted = persistence::delete(path)?;
            json!({ "deleted": deleted, "state_path": path.display().to_string() })
        }
        Command::Reset { delete: false } => {
            let mut sim = load(path)?;
            sim.reset();
            save(path, sim.as_ref())?;
            sim.get_state()
        }
    };
    Ok(out)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let invocation = parse_args(std::env::args().skip(1))?;
    if invocation.command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }
    let path = persistence::resolve_state_path(invocation.state.as_deref());
    let out = run(invocation.command, &path)?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
