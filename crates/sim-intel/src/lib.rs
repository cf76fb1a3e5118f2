#![deny(warnings)]

//! Intelligence analysis cell.
//!
//! Daily ticks over a thirty-day rotation. Raw reports arrive on a schedule,
//! cases open with deadlines, and policymakers and reporters lean on the cell
//! to shade its judgments.

mod actions;
pub mod ethics;
mod scenario;
mod world;

pub use actions::{catalog, Action, ActionKind, Category, HARD_RULES_DENIED};
pub use world::{
    generate, is_weekday, Agency, Analyst, Case, CaseStatus, Confidence, Grade, IntelConfig,
    Metrics, PressureEvent, PressureKind, Priority, Report, SourceType,
};

pub type IntelMosaicSim = sim_core::Simulation<Agency>;
