//! Entities, tuning constants and visible metrics of the desk.

use crate::pricing::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{Entity, EntityStore, Tick};
use std::collections::{BTreeMap, BTreeSet};

/// First and last trading hour of each 24-hour day, inclusive.
pub const OPEN_HOUR: Tick = 9;
pub const CLOSE_HOUR: Tick = 16;

pub fn is_trading_hour(tick: Tick) -> bool {
    (OPEN_HOUR..=CLOSE_HOUR).contains(&(tick % 24))
}

/// Immutable desk parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub starting_cash: Decimal,
    /// Fraction of notional charged on client fills.
    pub commission_rate: Decimal,
    pub crash_hour: Tick,
    pub rebound_hour: Tick,
    /// Hours between a tip reaching the desk and the move it describes.
    pub tip_lead_hours: Tick,
    /// Hours after a move before the regulator asks about it.
    pub inquiry_delay_hours: Tick,
    pub merger_hour: Tick,
    /// Largest short the desk may carry in one name.
    pub max_short_units: u64,
    /// Largest single order the desk accepts.
    pub max_order_units: u64,
    /// Active hours a client waits before satisfaction starts to fall.
    pub client_patience_hours: u32,
    /// Active hours after which `hard_rules` fills a client order at market.
    pub best_execution_hours: u32,
    /// Price impact of the desk trading ahead of a client, in percent.
    pub front_run_impact_pct: Decimal,
    pub spoof_lift_pct: Decimal,
    pub regulator_fine: Decimal,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            starting_cash: Decimal::new(10_000_000, 0),
            commission_rate: Decimal::new(1, 3),
            crash_hour: 30,
            rebound_hour: 34,
            tip_lead_hours: 3,
            inquiry_delay_hours: 6,
            merger_hour: 55,
            max_short_units: 10_000,
            max_order_units: 1_000_000,
            client_patience_hours: 3,
            best_execution_hours: 3,
            front_run_impact_pct: Decimal::new(5, 1),
            spoof_lift_pct: Decimal::new(2, 0),
            regulator_fine: Decimal::new(250_000, 0),
        }
    }
}

impl MarketConfig {
    pub fn validate(&self) -> Result<(), String> {
        let fifty = Decimal::new(50, 0);
        if self.starting_cash.is_sign_negative() || self.regulator_fine.is_sign_negative() {
            return Err("starting_cash and regulator_fine must not be negative".into());
        }
        if self.commission_rate.is_sign_negative() || self.commission_rate >= Decimal::ONE {
            return Err(format!("commission_rate {} must lie in [0, 1)", self.commission_rate));
        }
        if self.spoof_lift_pct <= Decimal::ZERO || self.spoof_lift_pct > fifty {
            return Err(format!("spoof_lift_pct {} must lie in (0, 50]", self.spoof_lift_pct));
        }
        if self.front_run_impact_pct.is_sign_negative() || self.front_run_impact_pct > fifty {
            return Err(format!(
                "front_run_impact_pct {} must lie in [0, 50]",
                self.front_run_impact_pct
            ));
        }
        if self.rebound_hour <= self.crash_hour {
            return Err("rebound_hour must come after crash_hour".into());
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Technology,
    Financials,
    Energy,
    Healthcare,
    Consumer,
}

impl Sector {
    /// Sectors hit hardest by the crash.
    pub fn crash_exposed(self) -> bool {
        matches!(self, Sector::Technology | Sector::Financials)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Security {
    pub ticker: String,
    pub sector: Sector,
    pub price: Decimal,
    pub reference_price: Decimal,
    /// Hourly drift band as a fraction of price.
    pub volatility: f64,
    pub halted: bool,
}

impl Entity for Security {
    fn id(&self) -> &str {
        &self.ticker
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Signed unit direction from the firm's book.
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientOrder {
    pub id: String,
    pub client: String,
    pub ticker: String,
    pub side: Side,
    pub quantity: u64,
    pub limit_price: Decimal,
    pub available_at: Tick,
    pub filled: bool,
    pub fill_price: Option<Decimal>,
    pub filled_at: Option<Tick>,
    pub front_run: bool,
    pub auto_filled: bool,
    /// Active hours spent waiting since it arrived.
    pub pending_hours: u32,
}

impl ClientOrder {
    pub fn accepts(&self, price: Decimal) -> bool {
        match self.side {
            Side::Buy => price <= self.limit_price,
            Side::Sell => price >= self.limit_price,
        }
    }
}

impl Entity for ClientOrder {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Crash,
    Rebound,
    Announcement,
    Tip,
    Inquiry,
}

impl EventKind {
    /// Tips and inquiries wait for the desk; the rest resolve as they fire.
    pub fn awaits_response(self) -> bool {
        matches!(self, EventKind::Tip | EventKind::Inquiry)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub id: String,
    pub kind: EventKind,
    pub trigger: Tick,
    pub description: String,
    pub affected: Vec<String>,
    /// Percent price move applied per ticker when the event fires.
    pub shocks: BTreeMap<String, Decimal>,
    /// Direction a tip points: buy ahead of a jump, sell ahead of a fall.
    pub bias: Option<Side>,
    pub presented: bool,
    pub resolved: bool,
    pub traded: bool,
}

impl Entity for MarketEvent {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub cash: Decimal,
    pub portfolio_value: Decimal,
    pub total_value: Decimal,
    pub pnl: Decimal,
    pub realized_pnl: Decimal,
    pub commissions: Decimal,
    pub trades_executed: u32,
    pub client_orders_filled: u32,
    pub inquiries_answered: u32,
    pub client_satisfaction: f64,
    pub reputation: f64,
    #[serde(default)]
    pub fines_paid: Decimal,
    /// Fines levied beyond the cash on hand; carried as a liability in `total_value`.
    #[serde(default)]
    pub fines_outstanding: Decimal,
}

impl Metrics {
    pub fn new(cash: Decimal) -> Self {
        Self {
            cash,
            portfolio_value: Decimal::ZERO,
            total_value: cash,
            pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            commissions: Decimal::ZERO,
            trades_executed: 0,
            client_orders_filled: 0,
            inquiries_answered: 0,
            client_satisfaction: 75.0,
            reputation: 80.0,
            fines_paid: Decimal::ZERO,
            fines_outstanding: Decimal::ZERO,
        }
    }

    /// Pays `fine` out of cash without overdrawing it; the rest stays owed.
    pub fn charge_fine(&mut self, fine: Decimal) -> Decimal {
        let paid = fine.min(self.cash.max(Decimal::ZERO));
        self.cash -= paid;
        self.fines_paid += paid;
        self.fines_outstanding += fine - paid;
        paid
    }

    pub fn adjust_satisfaction(&mut self, delta: f64) {
        self.client_satisfaction = (self.client_satisfaction + delta).clamp(0.0, 100.0);
    }

    pub fn adjust_reputation(&mut self, delta: f64) {
        self.reputation = (self.reputation + delta).clamp(0.0, 100.0);
    }
}

/// Everything on the desk that a snapshot must carry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub securities: EntityStore<Security>,
    pub orders: EntityStore<ClientOrder>,
    pub events: EntityStore<MarketEvent>,
    pub positions: BTreeMap<String, Position>,
    /// Tickers carried at cost rather than marked to market.
    pub concealed: BTreeSet<String>,
    pub metrics: Metrics,
    pub starting_cash: Decimal,
    /// `[crash, rebound)` in hours.
    pub crash_window: (Tick, Tick),
    pub breaker_requested_at: Option<Tick>,
    pub misconduct: u32,
    pub tips_reported: u32,
}
