//! The incremental linear system.
//!
//! [`LinearSystem`] keeps a tableau of sparse rows in reduced row-echelon
//! discipline: every basic variable is defined by exactly one row and never
//! appears on any right-hand side. Constraints arrive as [`Equation`]s (or
//! raw rows), are substituted into the current basis, and installed by
//! pivoting. [`LinearSystem::minimize`] restores feasibility, runs the
//! priority objective to optimality and publishes variable values.

use std::fmt;

use indexmap::IndexMap;
use tableau_core::{ConstraintRef, Role, SolveError, Strength, VarId};

use crate::equation::{Equation, Relation};
use crate::goal::{is_smaller, Objective, PriorityGoal, StrengthVector};
use crate::metrics::Metrics;
use crate::row::{Row, EPSILON};
use crate::vars::VariableRegistry;

/// Private variables backing a removable constraint.
#[derive(Debug, Clone, Copy)]
struct ConstraintSlot {
    /// The variable removal pivots around: the slack of an inequality, or
    /// the positive error of a soft equality.
    marker: VarId,
    /// Companion error variable, deleted along with the marker.
    extra: Option<VarId>,
}

/// An incremental solver over linear equalities and inequalities with
/// multi-level soft-constraint priorities.
#[derive(Debug, Default)]
pub struct LinearSystem {
    vars: VariableRegistry,
    rows: Vec<Row>,
    goal: PriorityGoal,
    /// Debug-name interning. Names never participate in identity.
    names: IndexMap<String, VarId>,
    constraints: IndexMap<usize, ConstraintSlot>,
    next_constraint: usize,
    metrics: Metrics,
}

impl LinearSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh unrestricted variable.
    pub fn new_variable(&mut self) -> VarId {
        self.vars.create(Role::Unrestricted, Strength::NONE)
    }

    /// Intern a named unrestricted variable. Repeated calls with the same
    /// name return the same id until the next `reset`.
    pub fn variable_named(&mut self, name: &str) -> VarId {
        if let Some(&variable) = self.names.get(name) {
            return variable;
        }
        let variable = self.vars.create(Role::Unrestricted, Strength::NONE);
        let _ = self.vars.set_name(variable, name);
        self.names.insert(name.to_string(), variable);
        variable
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Value of a variable as of the last `minimize`. Non-basic variables
    /// read 0; released or foreign ids are an error.
    pub fn value_of(&self, variable: VarId) -> Result<f32, SolveError> {
        self.vars.value(variable)
    }

    /// Add a constraint built by the fluent [`Equation`] API.
    ///
    /// Returns a [`ConstraintRef`] for every constraint that can later be
    /// removed individually. Required equalities are folded straight into
    /// the tableau and return `None`; they can only be undone by `reset`.
    pub fn add_equation(&mut self, equation: &Equation) -> Result<Option<ConstraintRef>, SolveError> {
        let mut row = equation.to_row();
        self.check_references(&row)?;
        let slot = match (equation.relation(), equation.strength()) {
            (Relation::Equal, None) => None,
            (Relation::Equal, Some(strength)) => {
                let plus = self.vars.create(Role::Error, strength);
                let minus = self.vars.create(Role::Error, strength);
                row.terms.put(plus, 1.0);
                row.terms.put(minus, -1.0);
                self.goal.add_error(plus, strength);
                self.goal.add_error(minus, strength);
                Some(ConstraintSlot {
                    marker: plus,
                    extra: Some(minus),
                })
            }
            (Relation::GreaterOrEqual, strength) => {
                let slack = self.vars.create(Role::Slack, Strength::NONE);
                row.terms.put(slack, 1.0);
                let extra = strength.map(|strength| {
                    let error = self.vars.create(Role::Error, strength);
                    row.terms.put(error, -1.0);
                    self.goal.add_error(error, strength);
                    error
                });
                Some(ConstraintSlot {
                    marker: slack,
                    extra,
                })
            }
            (Relation::LessOrEqual, strength) => {
                let slack = self.vars.create(Role::Slack, Strength::NONE);
                row.terms.put(slack, -1.0);
                let extra = strength.map(|strength| {
                    let error = self.vars.create(Role::Error, strength);
                    row.terms.put(error, 1.0);
                    self.goal.add_error(error, strength);
                    error
                });
                Some(ConstraintSlot {
                    marker: slack,
                    extra,
                })
            }
        };
        self.integrate(row)?;
        self.metrics.constraints_added += 1;
        Ok(slot.map(|slot| {
            let id = self.next_constraint;
            self.next_constraint += 1;
            self.constraints.insert(id, slot);
            ConstraintRef::new(id)
        }))
    }

    /// Add a raw required row in `0 = constant + terms` form.
    pub fn add_constraint(&mut self, row: Row) -> Result<(), SolveError> {
        self.check_references(&row)?;
        self.integrate(row)?;
        self.metrics.constraints_added += 1;
        Ok(())
    }

    /// Remove a previously added constraint, its private variables and its
    /// contribution to the goal.
    ///
    /// Unknown, already-removed or non-removable identifiers are a reported
    /// error; the system is left untouched in that case.
    pub fn remove_constraint(&mut self, reference: ConstraintRef) -> Result<(), SolveError> {
        let slot = self
            .constraints
            .shift_remove(&reference.id())
            .ok_or(SolveError::UnknownConstraint)?;
        if let Some(index) = self.vars.definition(slot.marker) {
            // The marker owns its row; the row leaves with the constraint.
            let _ = self.take_row(index);
        } else if let Some(index) = self.leaving_row_for(slot.marker) {
            let mut row = self.take_row(index);
            row.solve_for(slot.marker);
            self.eliminate(&row);
        }
        self.purge_variable(slot.marker);
        if let Some(extra) = slot.extra {
            self.pivot_out(extra);
            self.purge_variable(extra);
        }
        self.rebuild_goal();
        self.metrics.constraints_removed += 1;
        Ok(())
    }

    /// Restore feasibility, minimize the priority goal and publish values.
    /// Idempotent once at the optimum.
    pub fn minimize(&mut self) -> Result<(), SolveError> {
        self.metrics.minimizations += 1;
        let mut goal = std::mem::take(&mut self.goal);
        let mut result = self.enforce_feasibility(&mut goal);
        if result.is_ok() {
            result = self.optimize(&mut goal, false);
        }
        self.goal = goal;
        result?;
        self.compute_values();
        Ok(())
    }

    /// Minimize an explicit row objective instead of the priority goal.
    ///
    /// The goal row is rewritten in terms of the current non-basic variables
    /// as a side effect. A cost column no row can limit is reported as
    /// [`SolveError::Unbounded`].
    pub fn minimize_row_goal(&mut self, goal: &mut Row) -> Result<(), SolveError> {
        self.check_references(goal)?;
        self.metrics.minimizations += 1;
        self.reduce(goal);
        self.enforce_feasibility(goal)?;
        self.optimize(goal, true)?;
        self.compute_values();
        Ok(())
    }

    /// Drop everything and return to the empty system. The instance stays
    /// reusable; allocations are kept as capacity.
    pub fn reset(&mut self) {
        self.vars.reset();
        self.rows.clear();
        self.goal.clear();
        self.names.clear();
        self.constraints.clear();
        self.next_constraint = 0;
        self.metrics.clear();
    }

    /// Reject rows referencing dead or fabricated variable ids before they
    /// reach the table, so the failure surfaces as an error rather than a
    /// panic deep in the pivot machinery.
    fn check_references(&self, row: &Row) -> Result<(), SolveError> {
        for (variable, _) in row.terms().iter() {
            if !self.vars.is_live(variable) {
                return Err(SolveError::UnknownVariable(variable));
            }
        }
        Ok(())
    }

    /// Substitute every current basic variable out of the row, leaving only
    /// non-basic variables on its right-hand side.
    fn reduce(&self, row: &mut Row) {
        loop {
            let mut definition = None;
            for (variable, _) in row.terms().iter() {
                if let Some(index) = self.vars.definition(variable) {
                    definition = Some(index);
                    break;
                }
            }
            match definition {
                Some(index) => {
                    row.substitute(&self.rows[index]);
                }
                None => break,
            }
        }
    }

    /// Core insertion: reduce, detect trivial rows, pick a subject and
    /// install the new definition (via an artificial variable if no direct
    /// subject exists).
    fn integrate(&mut self, mut row: Row) -> Result<(), SolveError> {
        self.reduce(&mut row);
        if row.terms().is_empty() {
            if row.constant().abs() > EPSILON {
                return Err(SolveError::Unsatisfiable);
            }
            self.metrics.redundant_rows += 1;
            return Ok(());
        }
        row.ensure_positive_constant();
        match self.choose_subject(&row) {
            Some(subject) => {
                row.solve_for(subject);
                if row.is_simple_definition() {
                    self.metrics.simple_definitions += 1;
                }
                self.install_definition(row);
                Ok(())
            }
            None => self.add_with_artificial(row),
        }
    }

    /// Subject selection for a reduced row: the lowest-id unrestricted
    /// variable, else the lowest-id restricted variable with a negative
    /// coefficient. `None` forces the artificial path.
    fn choose_subject(&self, row: &Row) -> Option<VarId> {
        let mut restricted = None;
        for (variable, coefficient) in row.terms().iter() {
            match self.vars.role(variable) {
                Role::Unrestricted => return Some(variable),
                Role::Slack | Role::Error => {
                    if restricted.is_none() && coefficient < -EPSILON {
                        restricted = Some(variable);
                    }
                }
                Role::Constant => {}
            }
        }
        restricted
    }

    /// No direct subject: make a fresh restricted variable basic for the row
    /// and minimize it to zero with a temporary row objective.
    fn add_with_artificial(&mut self, mut row: Row) -> Result<(), SolveError> {
        let artificial = self.vars.create(Role::Slack, Strength::NONE);
        let mut goal = Row::with_constant(row.constant());
        goal.terms = row.terms().clone();
        row.basic = Some(artificial);
        self.install_row(row);
        self.optimize(&mut goal, false)?;
        if let Some(index) = self.vars.definition(artificial) {
            if self.rows[index].constant().abs() > EPSILON {
                // The contradictory row must leave with the artificial, or
                // a later variable recycling its id would alias it.
                let _ = self.take_row(index);
                self.purge_variable(artificial);
                return Err(SolveError::Unsatisfiable);
            }
            // Degenerate zero row: pivot the artificial out, or drop the
            // row if it pinned nothing.
            let mut row = self.take_row(index);
            let subject = row.terms().iter().next().map(|(variable, _)| variable);
            match subject {
                Some(subject) => {
                    row.solve_for(subject);
                    self.install_definition(row);
                }
                None => {
                    self.metrics.redundant_rows += 1;
                }
            }
        }
        self.purge_variable(artificial);
        Ok(())
    }

    /// Primal loop: pick an entering column from the goal, an exiting row by
    /// the ratio test, and pivot until the goal has no candidate left.
    fn optimize<G: Objective>(&mut self, goal: &mut G, strict: bool) -> Result<(), SolveError> {
        let mut avoid = vec![false; self.vars.slot_count()];
        let limit = 2 * (self.vars.slot_count() + self.rows.len() + 1);
        for _ in 0..limit {
            self.metrics.optimize_iterations += 1;
            let Some(entering) = goal.pivot_candidate(&avoid) else {
                return Ok(());
            };
            let mut leaving: Option<(usize, VarId, f32)> = None;
            for (index, row) in self.rows.iter().enumerate() {
                let Some(basic) = row.basic() else { continue };
                if !self.vars.role(basic).is_restricted() {
                    continue;
                }
                let coefficient = row.terms().get(entering);
                if coefficient >= -EPSILON {
                    continue;
                }
                let ratio = -row.constant() / coefficient;
                let better = match leaving {
                    None => true,
                    Some((_, best_basic, best_ratio)) => {
                        // Ratios within epsilon count as tied; the lowest
                        // basic id keeps the choice deterministic.
                        if (ratio - best_ratio).abs() < EPSILON {
                            basic < best_basic
                        } else {
                            ratio < best_ratio
                        }
                    }
                };
                if better {
                    leaving = Some((index, basic, ratio));
                }
            }
            match leaving {
                Some((index, _, _)) => {
                    let mut row = self.take_row(index);
                    row.solve_for(entering);
                    self.apply_definition(&row, goal);
                    self.install_row(row);
                    self.metrics.pivots += 1;
                }
                None => {
                    if strict {
                        return Err(SolveError::Unbounded);
                    }
                    // No row limits this column; set it aside and look for
                    // another candidate.
                    avoid[entering.index()] = true;
                }
            }
        }
        Ok(())
    }

    /// Dual pass: while a restricted basic variable sits at a negative
    /// value, pivot in the column with the cheapest per-unit cost, compared
    /// lexicographically from the highest strength level down.
    fn enforce_feasibility<G: Objective>(&mut self, goal: &mut G) -> Result<(), SolveError> {
        let limit = 2 * (self.vars.slot_count() + self.rows.len() + 1);
        for _ in 0..limit {
            let mut infeasible: Option<(usize, VarId)> = None;
            for (index, row) in self.rows.iter().enumerate() {
                let Some(basic) = row.basic() else { continue };
                if !self.vars.role(basic).is_restricted() {
                    continue;
                }
                if row.constant() >= -EPSILON {
                    continue;
                }
                let better = match infeasible {
                    None => true,
                    Some((_, best)) => basic < best,
                };
                if better {
                    infeasible = Some((index, basic));
                }
            }
            let Some((index, _)) = infeasible else {
                return Ok(());
            };
            let mut entering: Option<(VarId, StrengthVector)> = None;
            for (variable, coefficient) in self.rows[index].terms().iter() {
                if coefficient <= EPSILON {
                    continue;
                }
                let mut ratio = goal.candidate_cost(variable);
                for value in ratio.iter_mut() {
                    *value /= coefficient;
                }
                let better = match &entering {
                    None => true,
                    Some((_, best)) => is_smaller(&ratio, best),
                };
                if better {
                    entering = Some((variable, ratio));
                }
            }
            let Some((entering, _)) = entering else {
                return Err(SolveError::Unsatisfiable);
            };
            let mut row = self.take_row(index);
            row.solve_for(entering);
            self.apply_definition(&row, goal);
            self.install_row(row);
            self.metrics.pivots += 1;
            self.metrics.feasibility_pivots += 1;
        }
        Ok(())
    }

    /// Install a solved definition during constraint insertion: substitute
    /// it into every row and the priority goal, then add it to the table.
    fn install_definition(&mut self, row: Row) {
        for other in &mut self.rows {
            other.substitute(&row);
        }
        self.goal.fold_definition(&row);
        self.install_row(row);
    }

    /// Substitute a pivoted definition into every row, the priority goal
    /// and the active objective, without installing it.
    fn apply_definition<G: Objective>(&mut self, definition: &Row, goal: &mut G) {
        for other in &mut self.rows {
            other.substitute(definition);
        }
        self.goal.fold_definition(definition);
        goal.fold_definition(definition);
    }

    /// Substitute a definition everywhere and discard it. Used when a
    /// marker row leaves the table for good.
    fn eliminate(&mut self, definition: &Row) {
        for other in &mut self.rows {
            other.substitute(definition);
        }
        self.goal.fold_definition(definition);
    }

    fn install_row(&mut self, row: Row) {
        let index = self.rows.len();
        if let Some(basic) = row.basic() {
            self.vars.set_definition(basic, Some(index));
        }
        self.rows.push(row);
    }

    /// Detach a row from the table, keeping the moved row's definition
    /// index in sync with the `swap_remove`.
    fn take_row(&mut self, index: usize) -> Row {
        let row = self.rows.swap_remove(index);
        if let Some(basic) = row.basic() {
            self.vars.set_definition(basic, None);
        }
        if index < self.rows.len() {
            if let Some(moved) = self.rows[index].basic() {
                self.vars.set_definition(moved, Some(index));
            }
        }
        row
    }

    /// Best row to sacrifice when a non-basic marker has to leave: prefer
    /// restricted rows the marker can grow in (smallest ratio), then any
    /// restricted row mentioning it, then any row at all.
    fn leaving_row_for(&self, marker: VarId) -> Option<usize> {
        let mut exit: Option<(usize, f32)> = None;
        for (index, row) in self.rows.iter().enumerate() {
            let Some(basic) = row.basic() else { continue };
            if !self.vars.role(basic).is_restricted() {
                continue;
            }
            let coefficient = row.terms().get(marker);
            if coefficient < -EPSILON {
                let ratio = -row.constant() / coefficient;
                if exit.map_or(true, |(_, best)| ratio < best) {
                    exit = Some((index, ratio));
                }
            }
        }
        if let Some((index, _)) = exit {
            return Some(index);
        }
        let mut exit: Option<(usize, f32)> = None;
        for (index, row) in self.rows.iter().enumerate() {
            let Some(basic) = row.basic() else { continue };
            if !self.vars.role(basic).is_restricted() {
                continue;
            }
            let coefficient = row.terms().get(marker);
            if coefficient.abs() > EPSILON {
                let ratio = row.constant() / coefficient;
                if exit.map_or(true, |(_, best)| ratio < best) {
                    exit = Some((index, ratio));
                }
            }
        }
        if let Some((index, _)) = exit {
            return Some(index);
        }
        self.rows.iter().position(|row| row.terms().contains(marker))
    }

    /// Force a basic variable out of the basis ahead of its deletion.
    fn pivot_out(&mut self, variable: VarId) {
        if let Some(index) = self.vars.definition(variable) {
            let mut row = self.take_row(index);
            let subject = row.terms().iter().next().map(|(variable, _)| variable);
            match subject {
                Some(subject) => {
                    row.solve_for(subject);
                    self.install_definition(row);
                }
                None => {
                    self.metrics.redundant_rows += 1;
                }
            }
        }
    }

    /// Erase every trace of a variable and recycle its id. Callers must
    /// have pivoted it out of the basis first.
    fn purge_variable(&mut self, variable: VarId) {
        for row in &mut self.rows {
            row.terms.remove(variable);
        }
        self.goal.remove(variable);
        self.vars.release(variable);
        self.metrics.variables_recycled += 1;
    }

    /// Recompute the goal from scratch out of the live error variables and
    /// the current basis. Used after structural removal.
    fn rebuild_goal(&mut self) {
        self.goal.clear();
        let errors: Vec<(VarId, Strength)> = self
            .vars
            .live_vars()
            .filter(|&v| self.vars.role(v) == Role::Error)
            .map(|v| (v, self.vars.strength(v)))
            .collect();
        for (error, strength) in errors {
            self.goal.add_error(error, strength);
            if let Some(index) = self.vars.definition(error) {
                let definition = self.rows[index].clone();
                self.goal.fold_definition(&definition);
            }
        }
    }

    /// Publish basic-variable values; non-basic variables rest at 0.
    fn compute_values(&mut self) {
        self.vars.clear_values();
        for row in &self.rows {
            if let Some(basic) = row.basic() {
                self.vars.set_value(basic, row.constant());
            }
        }
    }
}

impl fmt::Display for LinearSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows:", self.rows.len())?;
        for row in &self.rows {
            writeln!(f, "  {row}")?;
        }
        write!(f, "  {}", self.goal)
    }
}
