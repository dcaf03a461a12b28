// src/compiler/parser.rs

//! Operator-precedence reduction of a token stream into binary tasks.
//!
//! Every time an operator is reduced, exactly one [`TaskSpec`] is emitted.
//! It consumes the two most recently produced operands and pushes a reference
//! to itself back onto the operand stack, so tasks come out in dependency
//! order: a task only ever references tasks emitted before it.

use std::fmt;

use tracing::trace;

use crate::compiler::lexer::{Token, tokenize};
use crate::compiler::{CompileError, Operator};
use crate::dag::TaskFailure;

/// Operand of a compiled task: a literal value or the index of an earlier task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperandSpec {
    Literal(f64),
    Task(usize),
}

impl fmt::Display for OperandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandSpec::Literal(v) => write!(f, "{v}"),
            OperandSpec::Task(idx) => write!(f, "t{idx}"),
        }
    }
}

/// One primitive binary operation produced by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub operator: Operator,
    pub left: OperandSpec,
    pub right: OperandSpec,
    /// Failure already known at compile time (a literal divided by a literal
    /// zero). Such a task is registered directly as failed.
    pub fault: Option<TaskFailure>,
}

/// Output of [`compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    /// Tasks in emission order.
    pub tasks: Vec<TaskSpec>,
    /// The final operand. `OperandSpec::Literal` means the expression is a
    /// single number and needs no tasks at all.
    pub root: OperandSpec,
}

impl CompiledExpression {
    /// `Some(value)` when the expression is a bare literal.
    pub fn literal_value(&self) -> Option<f64> {
        match self.root {
            OperandSpec::Literal(v) => Some(v),
            OperandSpec::Task(_) => None,
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, task) in self.tasks.iter().enumerate() {
            write!(f, "t{idx} = {} {} {}", task.left, task.operator, task.right)?;
            if let Some(fault) = &task.fault {
                write!(f, "    [fails: {fault}]")?;
            }
            writeln!(f)?;
        }
        write!(f, "root = {}", self.root)
    }
}

/// Entry on the operator stack.
#[derive(Debug, Clone, Copy)]
enum Pending {
    Op { op: Operator, position: usize },
    Open { position: usize },
}

#[derive(Debug, Default)]
struct Reducer {
    operands: Vec<OperandSpec>,
    tasks: Vec<TaskSpec>,
}

impl Reducer {
    fn reduce(&mut self, op: Operator, position: usize) -> Result<(), CompileError> {
        let right = self.operands.pop();
        let left = self.operands.pop();

        let (Some(left), Some(right)) = (left, right) else {
            return Err(CompileError::MalformedExpression(format!(
                "operator '{op}' at position {position} is missing an operand"
            )));
        };

        let fault = match (op, left, right) {
            (Operator::Divide, OperandSpec::Literal(_), OperandSpec::Literal(d)) if d == 0.0 => {
                Some(TaskFailure::DivisionByZero)
            }
            _ => None,
        };

        trace!(task = self.tasks.len(), %left, %op, %right, "emitting task");

        self.tasks.push(TaskSpec {
            operator: op,
            left,
            right,
            fault,
        });
        self.operands.push(OperandSpec::Task(self.tasks.len() - 1));
        Ok(())
    }
}

/// Compile an infix expression into its task graph.
pub fn compile(input: &str) -> Result<CompiledExpression, CompileError> {
    if input.trim().is_empty() {
        return Err(CompileError::MalformedExpression(
            "expression is empty".to_string(),
        ));
    }

    let tokens = tokenize(input)?;
    let mut stack: Vec<Pending> = Vec::new();
    let mut reducer = Reducer::default();

    for (position, token) in tokens {
        match token {
            Token::Number(value) => reducer.operands.push(OperandSpec::Literal(value)),
            Token::LeftParen => stack.push(Pending::Open { position }),
            Token::RightParen => {
                if !stack.iter().any(|p| matches!(p, Pending::Open { .. })) {
                    return Err(CompileError::MismatchedParentheses { position });
                }
                while let Some(pending) = stack.pop() {
                    match pending {
                        Pending::Op { op, position } => reducer.reduce(op, position)?,
                        Pending::Open { .. } => break,
                    }
                }
            }
            Token::Operator(op) => {
                // Left associativity: reduce everything of equal or higher
                // precedence before pushing.
                while let Some(&Pending::Op { op: top, position: top_pos }) = stack.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    stack.pop();
                    reducer.reduce(top, top_pos)?;
                }
                stack.push(Pending::Op { op, position });
            }
        }
    }

    if let Some(&Pending::Open { position }) = stack
        .iter()
        .find(|p| matches!(p, Pending::Open { .. }))
    {
        return Err(CompileError::MismatchedParentheses { position });
    }

    while let Some(pending) = stack.pop() {
        if let Pending::Op { op, position } = pending {
            reducer.reduce(op, position)?;
        }
    }

    match reducer.operands.as_slice() {
        [root] => Ok(CompiledExpression {
            root: *root,
            tasks: reducer.tasks,
        }),
        operands => Err(CompileError::MalformedExpression(format!(
            "expected a single result, found {} operands",
            operands.len()
        ))),
    }
}
