//! Summary statistics derived from the history store.

use std::fmt;

/// Aggregate statistics over the monitor's observed lifetime.
///
/// Totals, success rate and average latency cover every measurement since
/// the last clear. `min_latency` and `max_latency` only cover the successful
/// measurements still held in the bounded window, so they can move when old
/// entries are evicted even though the totals do not.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary {
    pub total_pings: u64,
    pub successful: u64,
    pub failed: u64,
    /// Percentage of successful probes, `0.0` when nothing has been recorded.
    pub success_rate: f64,
    /// Lifetime mean of successful latencies in milliseconds.
    pub avg_latency: f64,
    /// Windowed minimum successful latency in milliseconds.
    pub min_latency: f64,
    /// Windowed maximum successful latency in milliseconds.
    pub max_latency: f64,
    pub consecutive_failures: u64,
}

impl Summary {
    /// True when no measurement has been recorded since the last clear.
    pub fn is_empty(&self) -> bool {
        self.total_pings == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total pings:          {}", self.total_pings)?;
        writeln!(f, "Successful:           {}", self.successful)?;
        writeln!(f, "Failed:               {}", self.failed)?;
        writeln!(f, "Success rate:         {:.1}%", self.success_rate)?;
        writeln!(f, "Average latency:      {:.2} ms", self.avg_latency)?;
        writeln!(f, "Min latency:          {:.2} ms", self.min_latency)?;
        writeln!(f, "Max latency:          {:.2} ms", self.max_latency)?;
        write!(f, "Consecutive failures: {}", self.consecutive_failures)
    }
}
