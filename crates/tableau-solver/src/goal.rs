//! Objectives driving the simplex minimization.
//!
//! The main objective is [`PriorityGoal`]: every error variable contributes a
//! vector of per-strength-level coefficients, and candidate columns are
//! compared lexicographically from the highest strength level down. A plain
//! [`Row`] can also serve as an objective (temporary goals for artificial
//! variables, caller-supplied goals); there the usual negative-coefficient
//! rule applies.

use std::fmt;

use tableau_core::{Strength, VarId};

use crate::row::Row;

/// Tolerance for goal coefficient pruning, tighter than the row store's.
const GOAL_EPSILON: f32 = 0.0001;

pub(crate) type StrengthVector = [f32; Strength::LEVELS];

/// Objective seam between the linear system and whatever goal it minimizes.
pub(crate) trait Objective {
    /// Next entering column: a variable whose increase improves the goal,
    /// skipping any marked in `avoid`. `None` means the goal is optimal.
    fn pivot_candidate(&self, avoid: &[bool]) -> Option<VarId>;

    /// Fold a freshly pivoted row into the goal so it stays consistent with
    /// the live system: the definition's basic variable leaves the goal and
    /// its right-hand side takes over its contribution.
    fn fold_definition(&mut self, definition: &Row);

    /// Per-strength cost of letting this variable enter the basis, used by
    /// the dual ratio test when restoring feasibility.
    fn candidate_cost(&self, variable: VarId) -> StrengthVector;

    fn is_empty(&self) -> bool;
}

/// True when, scanning from the highest strength level down, the first
/// nonzero entry is negative.
fn is_negative(vector: &StrengthVector) -> bool {
    for level in (0..Strength::LEVELS).rev() {
        let value = vector[level];
        if value > 0.0 {
            return false;
        }
        if value < 0.0 {
            return true;
        }
    }
    false
}

/// Lexicographic comparison from the highest strength level down.
pub(crate) fn is_smaller(vector: &StrengthVector, other: &StrengthVector) -> bool {
    for level in (0..Strength::LEVELS).rev() {
        if vector[level] == other[level] {
            continue;
        }
        return vector[level] < other[level];
    }
    false
}

/// The multi-level priority objective.
///
/// Entries are kept sorted by variable id so candidate scans are
/// deterministic; ties between equal vectors resolve to the lowest id.
#[derive(Debug, Default)]
pub struct PriorityGoal {
    entries: Vec<(VarId, StrengthVector)>,
}

impl PriorityGoal {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, variable: VarId) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&variable, |&(v, _)| v)
    }

    /// Register an error variable: a unit contribution at its strength level.
    pub fn add_error(&mut self, variable: VarId, strength: Strength) {
        let mut vector = [0.0; Strength::LEVELS];
        vector[strength.level()] = 1.0;
        match self.position(variable) {
            Ok(i) => self.entries[i].1 = vector,
            Err(i) => self.entries.insert(i, (variable, vector)),
        }
    }

    /// Accumulate `multiplier` times `vector` into the variable's entry,
    /// pruning near-zero levels and dropping the entry if it empties.
    fn accumulate(&mut self, variable: VarId, vector: &StrengthVector, multiplier: f32) {
        match self.position(variable) {
            Ok(i) => {
                let mut empty = true;
                for level in 0..Strength::LEVELS {
                    let value = self.entries[i].1[level] + vector[level] * multiplier;
                    self.entries[i].1[level] = if value.abs() < GOAL_EPSILON { 0.0 } else { value };
                    if self.entries[i].1[level] != 0.0 {
                        empty = false;
                    }
                }
                if empty {
                    self.entries.remove(i);
                }
            }
            Err(i) => {
                let mut entry = [0.0; Strength::LEVELS];
                let mut empty = true;
                for level in 0..Strength::LEVELS {
                    let value = vector[level] * multiplier;
                    entry[level] = if value.abs() < GOAL_EPSILON { 0.0 } else { value };
                    if entry[level] != 0.0 {
                        empty = false;
                    }
                }
                if !empty {
                    self.entries.insert(i, (variable, entry));
                }
            }
        }
    }

    pub fn remove(&mut self, variable: VarId) {
        if let Ok(i) = self.position(variable) {
            self.entries.remove(i);
        }
    }

    pub fn contains(&self, variable: VarId) -> bool {
        self.position(variable).is_ok()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Objective for PriorityGoal {
    fn pivot_candidate(&self, avoid: &[bool]) -> Option<VarId> {
        let mut pivot: Option<usize> = None;
        for (i, (variable, vector)) in self.entries.iter().enumerate() {
            if avoid.get(variable.index()).copied().unwrap_or(false) {
                continue;
            }
            match pivot {
                None => {
                    if is_negative(vector) {
                        pivot = Some(i);
                    }
                }
                Some(best) => {
                    if is_smaller(vector, &self.entries[best].1) {
                        pivot = Some(i);
                    }
                }
            }
        }
        pivot.map(|i| self.entries[i].0)
    }

    fn fold_definition(&mut self, definition: &Row) {
        let Some(basic) = definition.basic() else {
            return;
        };
        let Ok(i) = self.position(basic) else {
            // The pivoted variable contributed nothing to the goal.
            return;
        };
        let vector = self.entries[i].1;
        for (variable, value) in definition.terms().iter() {
            self.accumulate(variable, &vector, value);
        }
        self.remove(basic);
    }

    fn candidate_cost(&self, variable: VarId) -> StrengthVector {
        match self.position(variable) {
            Ok(i) => self.entries[i].1,
            Err(_) => [0.0; Strength::LEVELS],
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for PriorityGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goal:")?;
        for (variable, vector) in &self.entries {
            write!(f, " {variable}[")?;
            for (level, value) in vector.iter().enumerate() {
                if level > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{value}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl Objective for Row {
    fn pivot_candidate(&self, avoid: &[bool]) -> Option<VarId> {
        self.terms().first_negative(avoid)
    }

    fn fold_definition(&mut self, definition: &Row) {
        self.substitute(definition);
    }

    fn candidate_cost(&self, variable: VarId) -> StrengthVector {
        let mut vector = [0.0; Strength::LEVELS];
        vector[0] = self.terms().get(variable);
        vector
    }

    fn is_empty(&self) -> bool {
        self.terms().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: usize) -> VarId {
        VarId::new(i)
    }

    #[test]
    fn fresh_error_is_not_a_candidate() {
        let mut goal = PriorityGoal::new();
        goal.add_error(v(0), Strength::MEDIUM);
        goal.add_error(v(1), Strength::HIGH);
        let avoid = vec![false; 4];
        assert_eq!(goal.pivot_candidate(&avoid), None);
    }

    #[test]
    fn higher_level_dominates_comparison() {
        let mut low = [0.0; Strength::LEVELS];
        low[Strength::LOW.level()] = -5.0;
        let mut high = [0.0; Strength::LEVELS];
        high[Strength::HIGH.level()] = -1.0;
        assert!(is_negative(&low));
        assert!(is_negative(&high));
        // -1 at HIGH is lexicographically smaller than -5 at LOW.
        assert!(is_smaller(&high, &low));
        assert!(!is_smaller(&low, &high));
    }

    #[test]
    fn positive_top_level_masks_negative_below() {
        let mut vector = [0.0; Strength::LEVELS];
        vector[Strength::LOW.level()] = -10.0;
        vector[Strength::HIGH.level()] = 1.0;
        assert!(!is_negative(&vector));
    }

    #[test]
    fn fold_definition_moves_contribution_to_rhs() {
        let mut goal = PriorityGoal::new();
        goal.add_error(v(0), Strength::MEDIUM);

        // v0 = 4 + v1 - v2
        let mut def = Row::with_constant(4.0);
        def.terms.put(v(1), 1.0);
        def.terms.put(v(2), -1.0);
        def.basic = Some(v(0));

        goal.fold_definition(&def);
        assert!(!goal.contains(v(0)));
        assert!(goal.contains(v(1)));
        assert!(goal.contains(v(2)));

        // v2 now carries -1 at MEDIUM and is the only improving column.
        let avoid = vec![false; 4];
        assert_eq!(goal.pivot_candidate(&avoid), Some(v(2)));
    }

    #[test]
    fn cancelled_contribution_drops_entry() {
        let mut goal = PriorityGoal::new();
        goal.add_error(v(0), Strength::LOW);
        let mut unit = [0.0; Strength::LEVELS];
        unit[Strength::LOW.level()] = 1.0;
        goal.accumulate(v(0), &unit, -1.0);
        assert!(goal.is_empty());
    }

    #[test]
    fn equal_vectors_tie_break_to_lowest_id() {
        let mut goal = PriorityGoal::new();
        let mut vector = [0.0; Strength::LEVELS];
        vector[Strength::MEDIUM.level()] = 1.0;
        goal.accumulate(v(3), &vector, -1.0);
        goal.accumulate(v(1), &vector, -1.0);
        let avoid = vec![false; 8];
        assert_eq!(goal.pivot_candidate(&avoid), Some(v(1)));
    }
}
