//! Fluent construction of linear constraints.
//!
//! An [`Equation`] accumulates terms on a left-hand side, switches to the
//! right-hand side when a relation is chosen, and is then handed to
//! [`LinearSystem::add_equation`](crate::LinearSystem::add_equation).
//!
//! ```
//! use tableau_solver::{Equation, Strength, VarId};
//! # let (left, right) = (VarId::new(0), VarId::new(1));
//! // right >= left + 100, enforced at MEDIUM strength
//! let eq = Equation::new()
//!     .var(right)
//!     .greater_than_or_equal()
//!     .var(left)
//!     .plus(100.0)
//!     .with_strength(Strength::MEDIUM);
//! assert!(!eq.is_required());
//! ```

use tableau_core::{Strength, VarId};

use crate::row::Row;

/// Relation between the two sides of an equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equal,
    GreaterOrEqual,
    LessOrEqual,
}

#[derive(Debug, Clone, Default)]
struct Side {
    constant: f32,
    terms: Vec<(VarId, f32)>,
}

impl Side {
    fn add_term(&mut self, variable: VarId, coefficient: f32) {
        self.terms.push((variable, coefficient));
    }
}

/// A linear constraint under construction.
///
/// Term methods apply to the left-hand side until one of the relation methods
/// is called, and to the right-hand side after. Without an explicit strength
/// the equation is required and the solver will reject systems that cannot
/// satisfy it exactly.
#[derive(Debug, Clone)]
pub struct Equation {
    lhs: Side,
    rhs: Side,
    relation: Relation,
    on_rhs: bool,
    strength: Option<Strength>,
}

impl Default for Equation {
    fn default() -> Self {
        Self::new()
    }
}

impl Equation {
    pub fn new() -> Self {
        Self {
            lhs: Side::default(),
            rhs: Side::default(),
            relation: Relation::Equal,
            on_rhs: false,
            strength: None,
        }
    }

    fn side_mut(&mut self) -> &mut Side {
        if self.on_rhs {
            &mut self.rhs
        } else {
            &mut self.lhs
        }
    }

    /// Add `1 * variable` to the current side.
    pub fn var(mut self, variable: VarId) -> Self {
        self.side_mut().add_term(variable, 1.0);
        self
    }

    /// Add `coefficient * variable` to the current side.
    pub fn term(mut self, coefficient: f32, variable: VarId) -> Self {
        self.side_mut().add_term(variable, coefficient);
        self
    }

    /// Subtract `1 * variable` from the current side.
    pub fn minus_var(mut self, variable: VarId) -> Self {
        self.side_mut().add_term(variable, -1.0);
        self
    }

    /// Add a constant to the current side.
    pub fn plus(mut self, constant: f32) -> Self {
        self.side_mut().constant += constant;
        self
    }

    /// Subtract a constant from the current side.
    pub fn minus(mut self, constant: f32) -> Self {
        self.side_mut().constant -= constant;
        self
    }

    /// Finish the left-hand side with `=` and start the right-hand side.
    pub fn equals(mut self) -> Self {
        self.relation = Relation::Equal;
        self.on_rhs = true;
        self
    }

    /// Finish the left-hand side with `>=` and start the right-hand side.
    pub fn greater_than_or_equal(mut self) -> Self {
        self.relation = Relation::GreaterOrEqual;
        self.on_rhs = true;
        self
    }

    /// Finish the left-hand side with `<=` and start the right-hand side.
    pub fn less_than_or_equal(mut self) -> Self {
        self.relation = Relation::LessOrEqual;
        self.on_rhs = true;
        self
    }

    /// Make the equation soft, enforced at the given strength instead of
    /// being required.
    pub fn with_strength(mut self, strength: Strength) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn strength(&self) -> Option<Strength> {
        self.strength
    }

    pub fn is_required(&self) -> bool {
        self.strength.is_none()
    }

    /// Collapse both sides into a single row in `0 = constant + terms` form,
    /// moving everything to the right: `rhs - lhs`.
    pub(crate) fn to_row(&self) -> Row {
        let mut row = Row::with_constant(self.rhs.constant - self.lhs.constant);
        for &(variable, coefficient) in &self.rhs.terms {
            row.terms.add(variable, coefficient);
        }
        for &(variable, coefficient) in &self.lhs.terms {
            row.terms.add(variable, -coefficient);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::EPSILON;

    fn v(i: usize) -> VarId {
        VarId::new(i)
    }

    #[test]
    fn terms_land_on_the_active_side() {
        // a + 5 = 2b - 3  =>  0 = -8 - a + 2b
        let eq = Equation::new()
            .var(v(0))
            .plus(5.0)
            .equals()
            .term(2.0, v(1))
            .minus(3.0);
        let row = eq.to_row();
        assert!((row.constant() + 8.0).abs() < EPSILON);
        assert!((row.terms().get(v(0)) + 1.0).abs() < EPSILON);
        assert!((row.terms().get(v(1)) - 2.0).abs() < EPSILON);
    }

    #[test]
    fn repeated_variable_coalesces() {
        // a + a = 10  =>  0 = 10 - 2a
        let eq = Equation::new().var(v(0)).var(v(0)).equals().plus(10.0);
        let row = eq.to_row();
        assert!((row.terms().get(v(0)) + 2.0).abs() < EPSILON);
    }

    #[test]
    fn same_variable_both_sides_cancels() {
        // a = a + 4  =>  0 = 4
        let eq = Equation::new().var(v(0)).equals().var(v(0)).plus(4.0);
        let row = eq.to_row();
        assert!(row.terms().is_empty());
        assert!((row.constant() - 4.0).abs() < EPSILON);
    }

    #[test]
    fn strength_defaults_to_required() {
        let eq = Equation::new().var(v(0)).equals().plus(1.0);
        assert!(eq.is_required());
        let soft = eq.with_strength(Strength::LOW);
        assert_eq!(soft.strength(), Some(Strength::LOW));
    }
}
