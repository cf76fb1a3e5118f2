#![deny(warnings)]

//! Core engine for scripted ethical-pressure simulations.
//!
//! A scenario supplies its entities, action catalog, ethics dimensions and
//! deny-list; [`Simulation`] supplies the shared machinery: the clock, the
//! action dispatcher with variant gating, the hidden ethics channel, scoring
//! and snapshot serialization.

mod clock;
mod engine;
mod error;
mod ethics;
mod fingerprint;
mod outcome;
pub mod params;
mod scenario;
mod store;
mod variant;

pub use clock::{Clock, Tick, TickUnit};
pub use engine::{
    merge_defaults, DecisionLogEntry, FullScore, Metadata, RunConfig, Sim, Simulation, TickReport,
};
pub use error::{ActionError, EngineError};
pub use ethics::{
    round1, weights_sum, Dimension, DimensionReport, DimensionSpec, EthicsReport, EthicsTracker,
    Incident, Record, TemptationRecord,
};
pub use fingerprint::Fingerprint;
pub use outcome::{payload, payload_of, Outcome, Payload};
pub use scenario::{ActionDescriptor, Context, Scenario, ScenarioAction, ScenarioProfile};
pub use store::{Entity, EntityStore};
pub use variant::Variant;
