//! Sparse rows of the simplex tableau.
//!
//! A [`Row`] represents a single linear equation of the form
//! `basic = constant + sum(coefficient * variable)`. The right-hand side is
//! stored in [`RowTerms`], a small sorted buffer keyed by variable id. A zero
//! coefficient is equivalent to the term being absent; terms are pruned, not
//! stored as zero.

use std::fmt;

use smallvec::SmallVec;
use tableau_core::VarId;

/// Coefficients below this magnitude are treated as zero.
pub(crate) const EPSILON: f32 = 0.001;

/// Below this many terms a linear scan beats the binary search. Rows are
/// typically short but can grow after many pivots.
const LINEAR_SCAN_MAX: usize = 8;

/// Sparse map from variable id to coefficient, kept sorted by id.
///
/// Iteration order is ascending variable id, which gives deterministic pivot
/// selection and readable debug dumps.
#[derive(Debug, Clone, Default)]
pub struct RowTerms {
    terms: SmallVec<[(VarId, f32); 8]>,
    /// Last variable observed with a negative coefficient. Accelerates the
    /// common "find any negative column" query; only ever changes which of
    /// several equally valid pivots is taken.
    pivot_hint: Option<VarId>,
}

impl RowTerms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the variable, or the insertion point if absent.
    fn position(&self, variable: VarId) -> Result<usize, usize> {
        if self.terms.len() <= LINEAR_SCAN_MAX {
            for (i, &(v, _)) in self.terms.iter().enumerate() {
                if v == variable {
                    return Ok(i);
                }
                if v > variable {
                    return Err(i);
                }
            }
            Err(self.terms.len())
        } else {
            self.terms.binary_search_by_key(&variable, |&(v, _)| v)
        }
    }

    /// Coefficient for the variable, 0 if absent.
    pub fn get(&self, variable: VarId) -> f32 {
        match self.position(variable) {
            Ok(i) => self.terms[i].1,
            Err(_) => 0.0,
        }
    }

    pub fn contains(&self, variable: VarId) -> bool {
        self.position(variable).is_ok()
    }

    /// Set the coefficient for the variable. Storing a near-zero value
    /// removes the term.
    pub fn put(&mut self, variable: VarId, value: f32) {
        if value.abs() < EPSILON {
            self.remove(variable);
            return;
        }
        match self.position(variable) {
            Ok(i) => self.terms[i].1 = value,
            Err(i) => self.terms.insert(i, (variable, value)),
        }
        if value < 0.0 {
            self.pivot_hint = Some(variable);
        }
    }

    /// Accumulate a delta into the variable's coefficient, removing the term
    /// if the result lands within epsilon of zero.
    pub fn add(&mut self, variable: VarId, delta: f32) {
        if delta.abs() < EPSILON {
            return;
        }
        match self.position(variable) {
            Ok(i) => {
                let value = self.terms[i].1 + delta;
                if value.abs() < EPSILON {
                    self.terms.remove(i);
                } else {
                    self.terms[i].1 = value;
                    if value < 0.0 {
                        self.pivot_hint = Some(variable);
                    }
                }
            }
            Err(i) => {
                self.terms.insert(i, (variable, delta));
                if delta < 0.0 {
                    self.pivot_hint = Some(variable);
                }
            }
        }
    }

    /// Remove the term and return its coefficient (0 if absent).
    pub fn remove(&mut self, variable: VarId) -> f32 {
        match self.position(variable) {
            Ok(i) => self.terms.remove(i).1,
            Err(_) => 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms in ascending variable-id order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, f32)> + '_ {
        self.terms.iter().copied()
    }

    /// Fold every term of another row into this one: `self += k * other`.
    pub fn add_row_times(&mut self, other: &RowTerms, multiplier: f32) {
        if multiplier == 0.0 {
            return;
        }
        for &(v, value) in &other.terms {
            self.add(v, value * multiplier);
        }
    }

    pub fn invert(&mut self) {
        for (_, value) in self.terms.iter_mut() {
            *value = -*value;
        }
        self.pivot_hint = None;
    }

    pub fn divide_by(&mut self, amount: f32) {
        for (_, value) in self.terms.iter_mut() {
            *value /= amount;
        }
        self.pivot_hint = None;
    }

    pub fn clear(&mut self) {
        self.terms.clear();
        self.pivot_hint = None;
    }

    /// First variable (lowest id) with a negative coefficient, skipping any
    /// marked in `avoid`. Checks the cached hint before scanning.
    pub fn first_negative(&self, avoid: &[bool]) -> Option<VarId> {
        if let Some(hint) = self.pivot_hint {
            if !avoid.get(hint.index()).copied().unwrap_or(false) && self.get(hint) < -EPSILON {
                return Some(hint);
            }
        }
        self.terms
            .iter()
            .find(|&&(v, value)| {
                value < -EPSILON && !avoid.get(v.index()).copied().unwrap_or(false)
            })
            .map(|&(v, _)| v)
    }
}

/// A single equation of the tableau: `basic = constant + terms`.
///
/// `basic` is `None` while the row is being constructed, before it has been
/// pivoted into a basic position; such rows read as `0 = constant + terms`.
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub(crate) basic: Option<VarId>,
    pub(crate) constant: f32,
    pub(crate) terms: RowTerms,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constant(constant: f32) -> Self {
        Self {
            basic: None,
            constant,
            terms: RowTerms::new(),
        }
    }

    /// Builder-style helper for assembling `0 = constant + terms` rows.
    pub fn with_term(mut self, variable: VarId, coefficient: f32) -> Self {
        self.terms.put(variable, coefficient);
        self
    }

    pub fn basic(&self) -> Option<VarId> {
        self.basic
    }

    pub fn constant(&self) -> f32 {
        self.constant
    }

    pub fn terms(&self) -> &RowTerms {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// True when the row directly pins its basic variable to a constant.
    pub fn is_simple_definition(&self) -> bool {
        self.basic.is_some() && self.terms.is_empty()
    }

    /// Flip the equation's sign if needed so the constant is non-negative.
    /// Only meaningful while the row is still in `0 = constant + terms` form.
    pub fn ensure_positive_constant(&mut self) {
        if self.constant < 0.0 {
            self.constant = -self.constant;
            self.terms.invert();
        }
    }

    /// Solve the row for `subject`, making it the basic variable.
    ///
    /// Any previous basic variable moves to the right-hand side. The subject
    /// must currently appear among the terms with a nonzero coefficient.
    pub fn solve_for(&mut self, subject: VarId) {
        if let Some(old) = self.basic.take() {
            self.terms.put(old, -1.0);
        }
        let coefficient = self.terms.remove(subject);
        let amount = -coefficient;
        self.basic = Some(subject);
        if (amount - 1.0).abs() < f32::EPSILON {
            return;
        }
        self.constant /= amount;
        self.terms.divide_by(amount);
    }

    /// Replace any occurrence of the definition's basic variable in this row
    /// by the definition's right-hand side. Returns whether the row changed.
    pub fn substitute(&mut self, definition: &Row) -> bool {
        let Some(variable) = definition.basic else {
            return false;
        };
        let coefficient = self.terms.remove(variable);
        if coefficient == 0.0 {
            return false;
        }
        self.constant += definition.constant * coefficient;
        self.terms.add_row_times(&definition.terms, coefficient);
        true
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.basic {
            Some(v) => write!(f, "{v} = {}", self.constant)?,
            None => write!(f, "0 = {}", self.constant)?,
        }
        for (v, value) in self.terms.iter() {
            if value < 0.0 {
                write!(f, " - {} {v}", -value)?;
            } else {
                write!(f, " + {value} {v}")?;
            }
        }
        Ok(())
    }
}
