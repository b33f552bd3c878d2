//! Canister status snapshots and the cycle metrics derived from them

use crate::errors::AgentError;
use crate::ic::types::{nat_to_u128, CanisterStatus};

/// Snapshots older than this are reloaded
pub const STATUS_TTL_SECS: i64 = 60;

const CYCLES_PER_TC: f64 = 1e12;

/// Status of a canister as read at `timestamp_seconds`
#[derive(Debug, Clone, PartialEq)]
pub struct CanisterStatusSnapshot {
    pub timestamp_seconds: u64,
    pub status: CanisterStatus,
}

impl CanisterStatusSnapshot {
    pub fn new(timestamp_seconds: u64, status: CanisterStatus) -> Self {
        Self {
            timestamp_seconds,
            status,
        }
    }

    /// Signed age; negative when the timestamp is ahead of `now`
    pub fn age_secs(&self, now: u64) -> i64 {
        now as i64 - self.timestamp_seconds as i64
    }

    pub fn cycles(&self) -> Result<u128, AgentError> {
        nat_to_u128(&self.status.cycles)
    }

    pub fn forecast(&self) -> CyclesForecast {
        let cycles = self.cycles().ok();
        let burned_per_day = self
            .status
            .idle_cycles_burned_per_day
            .as_ref()
            .and_then(|n| nat_to_u128(n).ok());
        CyclesForecast::compute(cycles, burned_per_day)
    }
}

/// A snapshot is reusable only if `0 <= now - timestamp <= 60`
pub fn is_cache_hit(timestamp_seconds: u64, now: u64) -> bool {
    let age = now as i64 - timestamp_seconds as i64;
    (0..=STATUS_TTL_SECS).contains(&age)
}

/// Burn rate and runway computed from a status snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclesForecast {
    /// Idle burn in trillion cycles per year
    pub burn_tc_per_year: Option<f64>,

    /// Years until the balance is exhausted; `f64::INFINITY` when nothing burns
    pub years_left: Option<f64>,
}

impl CyclesForecast {
    pub fn compute(cycles: Option<u128>, idle_cycles_burned_per_day: Option<u128>) -> Self {
        let burn_tc_per_year =
            idle_cycles_burned_per_day.map(|per_day| per_day as f64 * 365.0 / CYCLES_PER_TC);

        let years_left = match (cycles, burn_tc_per_year) {
            (Some(_), Some(burn)) if burn == 0.0 => Some(f64::INFINITY),
            (Some(cycles), Some(burn)) => Some(cycles as f64 / (CYCLES_PER_TC * burn)),
            _ => None,
        };

        Self {
            burn_tc_per_year,
            years_left,
        }
    }

    /// `years_left` when it is a finite number
    pub fn finite_years_left(&self) -> Option<f64> {
        self.years_left.filter(|years| years.is_finite())
    }

    pub fn years_left_label(&self) -> String {
        match self.years_left {
            Some(years) => format_years(years),
            None => "unknown".to_string(),
        }
    }
}

/// Human readable runway; non-finite values render as "∞"
pub fn format_years(years: f64) -> String {
    if !years.is_finite() {
        return "∞".to_string();
    }
    if years >= 100.0 {
        format!("{:.0} years", years)
    } else {
        format!("{:.1} years", years)
    }
}

/// Cycle amount in trillions, e.g. "3.250 TC"
pub fn format_tc(cycles: u128) -> String {
    format!("{:.3} TC", cycles as f64 / CYCLES_PER_TC)
}
