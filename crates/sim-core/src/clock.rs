use crate::ActionError;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// One discrete simulation step.
pub type Tick = u32;

/// What a tick represents in scenario time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickUnit {
    Hour,
    Day,
    Week,
}

impl TickUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TickUnit::Hour => "hour",
            TickUnit::Day => "day",
            TickUnit::Week => "week",
        }
    }

    pub fn span(self, ticks: Tick) -> Duration {
        let n = i64::from(ticks);
        match self {
            TickUnit::Hour => Duration::hours(n),
            TickUnit::Day => Duration::days(n),
            TickUnit::Week => Duration::weeks(n),
        }
    }

    /// Calendar label for `tick`, counted from a scenario epoch `(year, month, day)`.
    pub fn label(self, epoch: (i32, u32, u32), tick: Tick) -> String {
        let Some(start) = NaiveDate::from_ymd_opt(epoch.0, epoch.1, epoch.2)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        else {
            return format!("{} {tick}", self.as_str());
        };
        let at: NaiveDateTime = start + self.span(tick);
        match self {
            TickUnit::Hour => format!("{} {:02}:00", at.date(), at.hour()),
            TickUnit::Day | TickUnit::Week => at.date().to_string(),
        }
    }
}

/// Monotonic tick counter with a fixed horizon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub tick: Tick,
    pub horizon: Tick,
    pub completed: bool,
}

impl Clock {
    pub fn new(first_tick: Tick, horizon: Tick) -> Self {
        Self {
            tick: first_tick,
            horizon,
            completed: first_tick >= horizon,
        }
    }

    /// Moves to the next tick. Completion is settled separately, after the tick's effects.
    pub fn advance(&mut self) -> Result<Tick, ActionError> {
        if self.completed {
            return Err(ActionError::AlreadyComplete);
        }
        self.tick = self.tick.saturating_add(1);
        Ok(self.tick)
    }

    /// A clock read back from storage must sit inside `first_tick..=horizon`
    /// and be completed exactly when it has reached the horizon.
    pub fn validate(&self, first_tick: Tick) -> Result<(), String> {
        if self.tick < first_tick {
            return Err(format!("tick {} precedes the first tick {first_tick}", self.tick));
        }
        if self.tick > self.horizon {
            return Err(format!("tick {} is past the horizon {}", self.tick, self.horizon));
        }
        let reached = self.tick >= self.horizon || first_tick >= self.horizon;
        if self.completed != reached {
            return Err(format!(
                "completed={} disagrees with tick {} of horizon {}",
                self.completed, self.tick, self.horizon
            ));
        }
        Ok(())
    }

    pub fn settle(&mut self) {
        if self.tick >= self.horizon {
            self.completed = true;
        }
    }

    pub fn remaining(&self) -> Tick {
        self.horizon.saturating_sub(self.tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_at_horizon() {
        let mut c = Clock::new(0, 2);
        assert_eq!(c.advance().unwrap(), 1);
        c.settle();
        assert!(!c.completed);
        assert_eq!(c.advance().unwrap(), 2);
        c.settle();
        assert!(c.completed);
        assert_eq!(c.advance(), Err(ActionError::AlreadyComplete));
        assert_eq!(c.tick, 2);
    }

    #[test]
    fn labels_follow_unit() {
        assert_eq!(TickUnit::Hour.label((2024, 3, 4), 33), "2024-03-05 09:00");
        assert_eq!(TickUnit::Day.label((2024, 3, 4), 1), "2024-03-05");
        assert_eq!(TickUnit::Week.label((2024, 1, 1), 2), "2024-01-15");
    }
}
