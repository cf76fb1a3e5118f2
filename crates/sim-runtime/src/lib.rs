#![deny(warnings)]

//! Scenario registry: builds a fresh run from start options, or resumes one
//! from a persisted snapshot, behind the object-safe [`Sim`] surface.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sim_core::{
    EngineError, RunConfig, Scenario, ScenarioProfile, Sim, Simulation, Tick, Variant,
};
use sim_intel::Agency;
use sim_market::Market;
use sim_supply::SupplyChain;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("invalid scenario config: {0}")]
    Config(String),
    #[error("horizon {horizon} must be later than the first tick {first_tick}")]
    Horizon { horizon: Tick, first_tick: Tick },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    FlashCrash,
    IntelMosaic,
    SupplyChain,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::FlashCrash,
        ScenarioKind::IntelMosaic,
        ScenarioKind::SupplyChain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioKind::FlashCrash => "flash_crash",
            ScenarioKind::IntelMosaic => "intel_mosaic",
            ScenarioKind::SupplyChain => "supply_chain",
        }
    }

    pub fn default_horizon(self) -> Tick {
        match self {
            ScenarioKind::FlashCrash => Market::profile().default_horizon,
            ScenarioKind::IntelMosaic => Agency::profile().default_horizon,
            ScenarioKind::SupplyChain => SupplyChain::profile().default_horizon,
        }
    }

    /// Catalog entry for listing: name, clock, horizon, dimensions and action count.
    pub fn summary(self) -> Value {
        match self {
            ScenarioKind::FlashCrash => summarize::<Market>(),
            ScenarioKind::IntelMosaic => summarize::<Agency>(),
            ScenarioKind::SupplyChain => summarize::<SupplyChain>(),
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| EngineError::UnknownScenario(s.trim().to_string()))
    }
}

fn summarize<S: Scenario>() -> Value {
    let p: &ScenarioProfile<S::Category> = S::profile();
    json!({
        "name": p.name,
        "tick_unit": p.tick_unit,
        "first_tick": p.first_tick,
        "default_horizon": p.default_horizon,
        "dimensions": p.dimensions.iter().map(|d| json!({"name": d.name, "weight": d.weight})).collect::<Vec<_>>(),
        "hard_rules_denied": p.hard_rules_denied.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
        "actions": S::catalog().len(),
    })
}

/// Everything `start` needs; `seed` is drawn at random when absent.
#[derive(Clone, Debug)]
pub struct StartOptions {
    pub kind: ScenarioKind,
    pub seed: Option<u64>,
    pub horizon: Option<Tick>,
    pub variant: Variant,
    /// YAML document overriding fields of the scenario's config.
    pub config_yaml: Option<String>,
}

impl StartOptions {
    pub fn new(kind: ScenarioKind) -> Self {
        Self {
            kind,
            seed: None,
            horizon: None,
            variant: Variant::default(),
            config_yaml: None,
        }
    }
}

fn parse_config<C: DeserializeOwned + Default>(
    yaml: Option<&str>,
) -> Result<C, RuntimeError> {
    match yaml {
        None => Ok(C::default()),
        Some(text) if text.trim().is_empty() => Ok(C::default()),
        Some(text) => serde_yaml::from_str(text).map_err(|e| RuntimeError::Config(e.to_string())),
    }
}

fn build<S: Scenario + 'static>(
    opts: &StartOptions,
    seed: u64,
) -> Result<Box<dyn Sim>, RuntimeError> {
    let profile = S::profile();
    let horizon = opts.horizon.unwrap_or(profile.default_horizon);
    if horizon <= profile.first_tick {
        return Err(RuntimeError::Horizon {
            horizon,
            first_tick: profile.first_tick,
        });
    }
    let config: S::Config = parse_config(opts.config_yaml.as_deref())?;
    S::validate_config(&config).map_err(RuntimeError::Config)?;
    let run = RunConfig::new(seed, horizon, opts.variant);
    Ok(Box::new(Simulation::<S>::with_config(run, config)))
}

/// Generates a fresh run.
pub fn start(opts: &StartOptions) -> Result<Box<dyn Sim>, RuntimeError> {
    let seed = opts.seed.unwrap_or_else(rand::random);
    info!(scenario = %opts.kind, seed, variant = %opts.variant, "starting simulation");
    match opts.kind {
        ScenarioKind::FlashCrash => build::<Market>(opts, seed),
        ScenarioKind::IntelMosaic => build::<Agency>(opts, seed),
        ScenarioKind::SupplyChain => build::<SupplyChain>(opts, seed),
    }
}

/// Resumes a run from its snapshot; the snapshot's `scenario` key selects the kind.
pub fn restore(snapshot: Value) -> Result<Box<dyn Sim>, RuntimeError> {
    let kind: ScenarioKind = snapshot
        .get("scenario")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::CorruptSnapshot("snapshot has no scenario name".into()))?
        .parse()?;
    debug!(scenario = %kind, "restoring simulation");
    Ok(match kind {
        ScenarioKind::FlashCrash => Box::new(Simulation::<Market>::from_value(snapshot)?),
        ScenarioKind::IntelMosaic => Box::new(Simulation::<Agency>::from_value(snapshot)?),
        ScenarioKind::SupplyChain => Box::new(Simulation::<SupplyChain>::from_value(snapshot)?),
    })
}
