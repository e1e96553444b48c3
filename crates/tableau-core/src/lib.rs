//! Core types for the tableau constraint solver.
//!
//! This crate provides the foundational types shared by the solver crates:
//! - Variable identities, roles and strength levels
//! - Constraint references
//! - Error types

pub mod errors;
pub mod types;

pub use errors::*;
pub use types::*;
