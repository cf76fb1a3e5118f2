//! Price and position arithmetic for the desk.
//!
//! Money is `Decimal` throughout so cash moves by exactly `quantity * price`.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Prices never fall below one cent.
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// `quantity * price`.
pub fn notional(quantity: u64, price: Decimal) -> Decimal {
    Decimal::from(quantity) * price
}

/// No quoted price goes above one million per share.
pub const MAX_PRICE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 2);

/// Moves `price` by `pct` percent (signed), rounded to cents and kept within
/// `MIN_PRICE..=MAX_PRICE`.
pub fn shift_pct(price: Decimal, pct: Decimal) -> Decimal {
    let moved = Decimal::ONE_HUNDRED
        .checked_add(pct)
        .and_then(|factor| price.checked_mul(factor))
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED));
    match moved {
        Some(p) => p.round_dp(2).clamp(MIN_PRICE, MAX_PRICE),
        None if pct.is_sign_negative() => MIN_PRICE,
        None => MAX_PRICE,
    }
}

/// One hour of random drift: a uniform move within `±volatility` (as a fraction).
pub fn drift(price: Decimal, volatility: f64, rng: &mut ChaCha8Rng) -> Decimal {
    let vol = if volatility.is_finite() {
        volatility.clamp(0.0, 0.5)
    } else {
        0.0
    };
    if vol == 0.0 {
        return price;
    }
    let u: f64 = rng.gen_range(-vol..=vol);
    let pct = Decimal::from_f64(u * 100.0)
        .unwrap_or(Decimal::ZERO)
        .round_dp(4);
    shift_pct(price, pct)
}

/// Commission on a client fill.
pub fn commission(notional: Decimal, rate: Decimal) -> Decimal {
    (notional * rate).round_dp(2)
}

pub fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Signed holding in one security; negative quantity is a short.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub quantity: i64,
    pub avg_price: Decimal,
}

impl Position {
    /// Applies a fill of `delta` units at `price`; returns realized P&L.
    pub fn apply_fill(&mut self, delta: i64, price: Decimal) -> Decimal {
        if delta == 0 {
            return Decimal::ZERO;
        }
        let same_direction = self.quantity == 0 || (self.quantity > 0) == (delta > 0);
        if same_direction {
            let held = Decimal::from(self.quantity.unsigned_abs());
            let added = Decimal::from(delta.unsigned_abs());
            self.avg_price = ((held * self.avg_price + added * price) / (held + added)).round_dp(4);
            self.quantity += delta;
            return Decimal::ZERO;
        }
        let closing = delta.unsigned_abs().min(self.quantity.unsigned_abs());
        let sign = if self.quantity > 0 {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        };
        let realized = Decimal::from(closing) * (price - self.avg_price) * sign;
        self.quantity += delta;
        if self.quantity == 0 {
            self.avg_price = Decimal::ZERO;
        } else if (self.quantity > 0) == (delta > 0) {
            // Flipped through flat: the remainder opens at this price.
            self.avg_price = price;
        }
        realized.round_dp(2)
    }

    pub fn market_value(&self, price: Decimal) -> Decimal {
        Decimal::from(self.quantity) * price
    }
}
