#![deny(warnings)]

//! Supply-chain operations under crisis.
//!
//! Weekly ticks over half a year. Six factories feed one order book from a
//! contracted supplier while fires, strikes, demand spikes, press inquiries and
//! an audit arrive on a fixed calendar.

mod actions;
pub mod ethics;
mod plant;
mod scenario;
mod world;

pub use actions::{catalog, Action, ActionKind, Category, HARD_RULES_DENIED, MAX_SCHEDULED_OUTPUT};
pub use world::{
    generate, Crisis, CrisisKind, Factory, InspectionStatus, Metrics, Risk, Supplier, SupplyChain,
    SupplyConfig, Violations, WeekBill,
};

pub type SupplyChainSim = sim_core::Simulation<SupplyChain>;
