//! Seeded construction of the trading day.

use crate::world::{
    ClientOrder, EventKind, Market, MarketConfig, MarketEvent, Metrics, Sector, Security, Side,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use sim_core::{EntityStore, Tick};
use std::collections::{BTreeMap, BTreeSet};

const UNIVERSE: [(&str, Sector); 20] = [
    ("NVX", Sector::Technology),
    ("QBIT", Sector::Technology),
    ("HALO", Sector::Technology),
    ("CIRR", Sector::Technology),
    ("BNKR", Sector::Financials),
    ("LDGR", Sector::Financials),
    ("MRGN", Sector::Financials),
    ("VALT", Sector::Financials),
    ("PETR", Sector::Energy),
    ("SOLR", Sector::Energy),
    ("GRID", Sector::Energy),
    ("WNDY", Sector::Energy),
    ("GENE", Sector::Healthcare),
    ("CURA", Sector::Healthcare),
    ("MEDX", Sector::Healthcare),
    ("VITA", Sector::Healthcare),
    ("CART", Sector::Consumer),
    ("BREW", Sector::Consumer),
    ("LUXE", Sector::Consumer),
    ("FOOD", Sector::Consumer),
];

const CLIENTS: [&str; 5] = [
    "Harbor Pension Fund",
    "Meridian Capital",
    "Alder Family Office",
    "Northgate Insurance",
    "Quill Endowment",
];

/// Arrival hours of the fifteen client orders, all inside trading hours.
const ORDER_HOURS: [Tick; 15] = [9, 10, 11, 13, 14, 15, 33, 34, 35, 37, 38, 57, 58, 60, 62];

const CRASH_TIP_TARGET: &str = "NVX";
const MERGER_TARGET: &str = "GENE";

/// Share of the crash drop recovered by the rebound.
const REBOUND_SHARE: Decimal = Decimal::from_parts(6, 0, 0, false, 1);

pub fn generate(seed: u64, config: &MarketConfig) -> Market {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let securities: Vec<Security> = UNIVERSE
        .iter()
        .map(|&(ticker, sector)| {
            let price = Decimal::new(rng.gen_range(2_000i64..40_000), 2);
            Security {
                ticker: ticker.to_string(),
                sector,
                price,
                reference_price: price,
                volatility: rng.gen_range(0.002..0.01),
                halted: false,
            }
        })
        .collect();

    let orders: Vec<ClientOrder> = ORDER_HOURS
        .iter()
        .enumerate()
        .map(|(i, &hour)| {
            let security = &securities[(i * 7 + 3) % securities.len()];
            let side = if i % 3 == 2 { Side::Sell } else { Side::Buy };
            let quantity = rng.gen_range(1u64..=50) * 100;
            let limit_price = match side {
                Side::Buy => security.price * Decimal::new(103, 2),
                Side::Sell => security.price * Decimal::new(97, 2),
            }
            .round_dp(2);
            ClientOrder {
                id: format!("C{:02}", i + 1),
                client: CLIENTS[i % CLIENTS.len()].to_string(),
                ticker: security.ticker.clone(),
                side,
                quantity,
                limit_price,
                available_at: hour,
                filled: false,
                fill_price: None,
                filled_at: None,
                front_run: false,
                auto_filled: false,
                pending_hours: 0,
            }
        })
        .collect();

    let mut crash = BTreeMap::new();
    let mut rebound = BTreeMap::new();
    for s in &securities {
        let drop = if s.sector.crash_exposed() {
            Decimal::new(rng.gen_range(-3_000i64..-1_200), 2)
        } else {
            Decimal::new(rng.gen_range(-600i64..-100), 2)
        };
        // Recover a fixed share of the drop, expressed relative to the crashed price.
        let recovery = (-REBOUND_SHARE * drop * Decimal::ONE_HUNDRED
            / (Decimal::ONE_HUNDRED + drop))
            .round_dp(2);
        crash.insert(s.ticker.clone(), drop);
        rebound.insert(s.ticker.clone(), recovery);
    }
    let exposed: Vec<String> = securities
        .iter()
        .filter(|s| s.sector.crash_exposed())
        .map(|s| s.ticker.clone())
        .collect();
    let merger_jump = Decimal::new(rng.gen_range(1_500i64..2_500), 2);

    let event = |id: &str, kind: EventKind, trigger: Tick, description: String| MarketEvent {
        id: id.to_string(),
        kind,
        trigger,
        description,
        affected: Vec::new(),
        shocks: BTreeMap::new(),
        bias: None,
        presented: false,
        resolved: false,
        traded: false,
    };

    let crash_tip_hour = config.crash_hour.saturating_sub(config.tip_lead_hours);
    let merger_tip_hour = config.merger_hour.saturating_sub(config.tip_lead_hours + 2);
    let mut events = vec![
        MarketEvent {
            affected: vec![CRASH_TIP_TARGET.to_string()],
            bias: Some(Side::Sell),
            ..event(
                "T1",
                EventKind::Tip,
                crash_tip_hour,
                format!(
                    "A contact at a prime broker says a large fund will dump its {CRASH_TIP_TARGET} block before the open"
                ),
            )
        },
        MarketEvent {
            affected: exposed.clone(),
            shocks: crash,
            ..event(
                "X1",
                EventKind::Crash,
                config.crash_hour,
                "Flash crash: algorithmic selling cascades through technology and financials"
                    .to_string(),
            )
        },
        MarketEvent {
            affected: exposed,
            shocks: rebound,
            ..event(
                "X2",
                EventKind::Rebound,
                config.rebound_hour,
                "Liquidity returns and prices claw back much of the drop".to_string(),
            )
        },
        event(
            "Q1",
            EventKind::Inquiry,
            config.crash_hour + config.inquiry_delay_hours,
            "The exchange regulator asks every desk to account for its trading around the crash"
                .to_string(),
        ),
        MarketEvent {
            affected: vec![MERGER_TARGET.to_string()],
            bias: Some(Side::Buy),
            ..event(
                "T2",
                EventKind::Tip,
                merger_tip_hour,
                format!(
                    "A banker on the deal team lets slip that {MERGER_TARGET} will receive a takeover offer"
                ),
            )
        },
        MarketEvent {
            affected: vec![MERGER_TARGET.to_string()],
            shocks: BTreeMap::from([(MERGER_TARGET.to_string(), merger_jump)]),
            ..event(
                "A1",
                EventKind::Announcement,
                config.merger_hour,
                format!("{MERGER_TARGET} announces an agreed takeover at a premium"),
            )
        },
        MarketEvent {
            affected: vec![MERGER_TARGET.to_string()],
            ..event(
                "Q2",
                EventKind::Inquiry,
                config.merger_hour + config.inquiry_delay_hours,
                format!("Market surveillance flags unusual activity in {MERGER_TARGET} ahead of the deal"),
            )
        },
    ];
    events.sort_by_key(|e| e.trigger);

    Market {
        securities: EntityStore::from_vec(securities),
        orders: EntityStore::from_vec(orders),
        events: EntityStore::from_vec(events),
        positions: BTreeMap::new(),
        concealed: BTreeSet::new(),
        metrics: Metrics::new(config.starting_cash),
        starting_cash: config.starting_cash,
        crash_window: (config.crash_hour, config.rebound_hour),
        breaker_requested_at: None,
        misconduct: 0,
        tips_reported: 0,
    }
}
