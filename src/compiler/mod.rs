// src/compiler/mod.rs

//! Expression compiler.
//!
//! Turns an infix arithmetic string into a [`CompiledExpression`]: a list of
//! primitive binary tasks in emission order, where every operand is either a
//! literal or a reference to an earlier task, plus the root operand.
//!
//! - [`lexer`] splits the input into numbers, operators and parentheses.
//! - [`parser`] runs the operator-precedence (shunting-yard) reduction.
//! - [`operator`] defines the four supported binary operators.

pub mod lexer;
pub mod operator;
pub mod parser;

use thiserror::Error;

pub use lexer::{Token, tokenize};
pub use operator::Operator;
pub use parser::{CompiledExpression, OperandSpec, TaskSpec, compile};

/// Reasons an expression cannot be turned into a task graph.
///
/// No tasks are ever created for an expression that fails to compile.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("mismatched parentheses at position {position}")]
    MismatchedParentheses { position: usize },

    #[error("malformed expression: {0}")]
    MalformedExpression(String),

    #[error("invalid character '{ch}' at position {position}")]
    InvalidCharacter { ch: char, position: usize },
}
