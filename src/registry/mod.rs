// src/registry/mod.rs

//! Expression registry.
//!
//! Maps expression ids to their status and final result. API callers only
//! ever read from it; the task graph store writes terminal transitions when
//! an expression's root task resolves.

pub mod expression;

pub use expression::{ExpressionId, ExpressionNode, ExpressionRegistry, ExpressionStatus};
