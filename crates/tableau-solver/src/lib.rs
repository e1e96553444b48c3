//! Incremental linear constraint solving with multi-level priorities.
//!
//! The solver maintains a tableau of sparse linear rows and accepts
//! equalities and inequalities incrementally, at hard (required) or soft
//! (prioritized) strength. Soft constraints are backed by error variables
//! whose deviations are minimized lexicographically, so a stronger
//! constraint always wins over any number of weaker ones.
//!
//! # Example
//!
//! ```
//! use tableau_solver::{Equation, LinearSystem, Strength};
//!
//! let mut system = LinearSystem::new();
//! let left = system.variable_named("left");
//! let right = system.variable_named("right");
//!
//! // left = 0, right >= left + 100, and a medium preference for right = 120
//! let _ = system.add_equation(&Equation::new().var(left).equals().plus(0.0))?;
//! let _ = system.add_equation(
//!     &Equation::new()
//!         .var(right)
//!         .greater_than_or_equal()
//!         .var(left)
//!         .plus(100.0),
//! )?;
//! let _ = system.add_equation(
//!     &Equation::new()
//!         .var(right)
//!         .equals()
//!         .plus(120.0)
//!         .with_strength(Strength::MEDIUM),
//! )?;
//!
//! system.minimize()?;
//! assert_eq!(system.value_of(right)?, 120.0);
//! # Ok::<(), tableau_solver::SolveError>(())
//! ```

mod equation;
mod goal;
mod metrics;
mod row;
mod system;
mod vars;

pub use equation::{Equation, Relation};
pub use goal::PriorityGoal;
pub use metrics::Metrics;
pub use row::{Row, RowTerms};
pub use system::LinearSystem;
pub use vars::VariableRegistry;

pub use tableau_core::{ConstraintRef, Role, SolveError, Strength, VarId};
