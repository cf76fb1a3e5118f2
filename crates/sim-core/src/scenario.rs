use crate::{
    ActionError, DecisionLogEntry, DimensionSpec, EthicsTracker, Fingerprint, Outcome, Payload,
    Tick, TickUnit, Variant,
};
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Display};

/// One entry of the action catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionDescriptor {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub description: &'static str,
}

/// Static data describing a scenario.
#[derive(Debug)]
pub struct ScenarioProfile<C: 'static> {
    pub name: &'static str,
    pub tick_unit: TickUnit,
    pub first_tick: Tick,
    pub default_horizon: Tick,
    /// Calendar date of tick 0.
    pub epoch: (i32, u32, u32),
    /// Weights sum to 1.0.
    pub dimensions: &'static [DimensionSpec],
    /// Ethically loaded categories refused under `hard_rules`.
    pub hard_rules_denied: &'static [C],
    pub guidelines: &'static str,
    pub rules: &'static str,
}

/// A typed action of one scenario.
pub trait ScenarioAction: Clone + Debug + Serialize {
    type Category: Copy + Debug + PartialEq + Display + 'static;

    fn name(&self) -> &'static str;

    /// `Some` when the action is ethically loaded.
    fn category(&self) -> Option<Self::Category>;
}

/// Mutable view handed to scenario hooks.
pub struct Context<'a, C> {
    pub tick: Tick,
    pub variant: Variant,
    pub config: &'a C,
    pub ethics: &'a mut EthicsTracker,
}

/// The data and effect functions a concrete scenario supplies to [`crate::Simulation`].
///
/// The implementing type is the scenario's entity store plus its visible metrics;
/// it is serialized whole into snapshots.
pub trait Scenario: Clone + Debug + Serialize + DeserializeOwned {
    /// Immutable tuning constants, fixed at construction.
    type Config: Clone + Debug + Default + Serialize + DeserializeOwned;
    type Category: Copy + Debug + PartialEq + Display + 'static;
    type Action: ScenarioAction<Category = Self::Category>;

    fn profile() -> &'static ScenarioProfile<Self::Category>;

    fn catalog() -> Vec<ActionDescriptor>;

    /// Rejects tuning values the scenario cannot run with.
    fn validate_config(_config: &Self::Config) -> Result<(), String> {
        Ok(())
    }

    /// Builds the fixed entity set. Pure function of `seed` and `config`.
    fn generate(seed: u64, config: &Self::Config) -> Self;

    /// `Ok(None)` when `name` is not in the catalog.
    fn parse_action(name: &str, params: &Payload) -> Result<Option<Self::Action>, ActionError>;

    /// Validates then mutates; an `Err` must leave `self` and the tracker untouched.
    fn apply(
        &mut self,
        action: &Self::Action,
        ctx: &mut Context<'_, Self::Config>,
    ) -> Result<Outcome, ActionError>;

    /// Fires scheduled events whose trigger equals `ctx.tick`; returns their descriptions.
    fn fire_events(&mut self, ctx: &mut Context<'_, Self::Config>) -> Vec<String>;

    /// Whether time-based drift runs during `tick`.
    fn is_active(&self, tick: Tick) -> bool;

    fn drift(&mut self, ctx: &mut Context<'_, Self::Config>, rng: &mut ChaCha8Rng);

    /// Recomputes metrics that are pure functions of entity state.
    fn recompute(&mut self, config: &Self::Config);

    /// Variant-enforced automatic effects.
    fn auto_effects(&mut self, _ctx: &mut Context<'_, Self::Config>) -> Vec<String> {
        Vec::new()
    }

    fn phase(&self, tick: Tick) -> String;

    /// Visible metrics. Never carries an ethics dimension.
    fn metrics(&self) -> Payload;

    /// Agent-visible score, a subset of [`Scenario::metrics`].
    fn visible_score(&self) -> Payload;

    /// Entity sections visible at `tick` (future-dated entries filtered out).
    fn observe(&self, tick: Tick) -> Payload;

    fn fingerprint(&self, ethics: &EthicsTracker, decisions: &[DecisionLogEntry]) -> Fingerprint;
}
