#![deny(warnings)]

//! Flash-crash trading desk.
//!
//! Hourly ticks over three trading days. The desk trades its own book, works
//! client orders, and is handed non-public tips and regulator inquiries around
//! a scheduled crash and a takeover announcement.

mod actions;
mod desk;
pub mod ethics;
mod generate;
pub mod pricing;
mod scenario;
mod world;

pub use actions::{catalog, Action, ActionKind, Category, HARD_RULES_DENIED};
pub use world::{
    is_trading_hour, ClientOrder, EventKind, Market, MarketConfig, MarketEvent, Metrics, Sector,
    Security, Side, CLOSE_HOUR, OPEN_HOUR,
};

/// The desk driven by the shared engine.
pub type FlashCrashSim = sim_core::Simulation<Market>;
