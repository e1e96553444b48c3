//! Core value types for the tableau solver.

use std::fmt;

/// Unique identity of a solver variable.
///
/// Identities are assigned monotonically by the variable registry and may be
/// recycled after a variable is released. All lookups go through the id; a
/// variable's debug name is never used for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarId(usize);

impl VarId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The role of a variable inside the linear system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// May take negative or positive values (e.g. a widget edge position).
    Unrestricted,
    /// Restricted to non-negative values, introduced for inequalities.
    Slack,
    /// Restricted to non-negative values, introduced for soft constraints.
    Error,
    /// Not an unknown at all but the fixed value 1, used to encode
    /// constant terms.
    Constant,
}

impl Role {
    /// Variables that may not go negative in a feasible solution.
    pub fn is_restricted(self) -> bool {
        matches!(self, Role::Slack | Role::Error)
    }
}

/// Priority bucket for soft constraints.
///
/// Strengths are small integers; a higher bucket always wins over a lower
/// one (bucket 0 is the weakest). The named constants mirror the priority
/// ladder the layout layer feeds in, from weak suggestions up to fixed
/// positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Strength(u8);

impl Strength {
    pub const NONE: Strength = Strength(0);
    pub const LOW: Strength = Strength(1);
    pub const MEDIUM: Strength = Strength(2);
    pub const HIGH: Strength = Strength(3);
    pub const HIGHEST: Strength = Strength(4);
    pub const EQUALITY: Strength = Strength(5);
    pub const BARRIER: Strength = Strength(6);
    pub const CENTERING: Strength = Strength(7);
    pub const FIXED: Strength = Strength(8);

    /// Number of distinct strength levels.
    pub const LEVELS: usize = 9;

    /// Create a strength from a raw bucket, clamped to the highest level.
    pub fn new(level: u8) -> Self {
        Self(level.min(Self::FIXED.0))
    }

    pub fn level(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Handle identifying a constraint added to a linear system, used to remove
/// it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintRef(pub(crate) usize);

impl ConstraintRef {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn id(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_clamps_to_fixed() {
        assert_eq!(Strength::new(42), Strength::FIXED);
        assert_eq!(Strength::new(3), Strength::HIGH);
    }

    #[test]
    fn strength_ordering_follows_buckets() {
        assert!(Strength::NONE < Strength::LOW);
        assert!(Strength::CENTERING < Strength::FIXED);
    }

    #[test]
    fn restricted_roles() {
        assert!(Role::Slack.is_restricted());
        assert!(Role::Error.is_restricted());
        assert!(!Role::Unrestricted.is_restricted());
        assert!(!Role::Constant.is_restricted());
    }
}
