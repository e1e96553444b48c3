//! Error types for the tableau solver.

use crate::types::VarId;
use thiserror::Error;

/// Errors surfaced by the linear system.
///
/// All of these are local to one solver instance; after a failure the
/// instance can be `reset` and reused for the next pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// Hard constraints cannot be simultaneously satisfied. The solver never
    /// resolves this on its own; deciding which constraint to drop belongs
    /// to the caller.
    #[error("constraints are unsatisfiable")]
    Unsatisfiable,

    /// The objective can be driven to infinity, which indicates a modeling
    /// defect upstream rather than a runtime condition to recover from.
    #[error("objective is unbounded")]
    Unbounded,

    /// An operation referenced a variable identity unknown to the current
    /// system (e.g. after a reset). Failing loudly here keeps upstream bugs
    /// from being masked by a silent 0.
    #[error("unknown variable {0}")]
    UnknownVariable(VarId),

    /// `remove_constraint` was called with an identifier that was never
    /// added, was already removed, or names a required constraint that was
    /// folded into the tableau and cannot be removed individually.
    #[error("no removable constraint with this identifier")]
    UnknownConstraint,
}
