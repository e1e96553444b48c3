//! Lightweight counters for profiling solver behavior.

use std::fmt;

/// Running totals of solver activity.
///
/// Counters accumulate across calls until [`Metrics::clear`] and cost nothing
/// beyond an integer increment, so they stay on in release builds.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Calls to the top-level minimize entry points.
    pub minimizations: u64,
    /// Constraints accepted into the system.
    pub constraints_added: u64,
    /// Constraints that arrived as a direct `variable = constant` definition.
    pub simple_definitions: u64,
    /// Constraints removed from the system.
    pub constraints_removed: u64,
    /// Simplex pivots performed, across optimization and cleanup passes.
    pub pivots: u64,
    /// Pivots spent restoring feasibility after a constraint change.
    pub feasibility_pivots: u64,
    /// Iterations of the optimization loop, including ones that bail out.
    pub optimize_iterations: u64,
    /// Rows that simplified to a trivially true statement and were dropped.
    pub redundant_rows: u64,
    /// Variables handed back to the registry's free pool.
    pub variables_recycled: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "minimizations: {}", self.minimizations)?;
        writeln!(f, "constraints added: {}", self.constraints_added)?;
        writeln!(f, "simple definitions: {}", self.simple_definitions)?;
        writeln!(f, "constraints removed: {}", self.constraints_removed)?;
        writeln!(f, "pivots: {}", self.pivots)?;
        writeln!(f, "feasibility pivots: {}", self.feasibility_pivots)?;
        writeln!(f, "optimize iterations: {}", self.optimize_iterations)?;
        writeln!(f, "redundant rows: {}", self.redundant_rows)?;
        write!(f, "variables recycled: {}", self.variables_recycled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_counters() {
        let mut metrics = Metrics::new();
        metrics.pivots = 12;
        metrics.minimizations = 3;
        metrics.clear();
        assert_eq!(metrics.pivots, 0);
        assert_eq!(metrics.minimizations, 0);
    }
}
