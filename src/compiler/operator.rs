// src/compiler/operator.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four binary arithmetic operators a task can perform.
///
/// On the wire an operator is its symbol (`"+"`, `"-"`, `"*"`, `"/"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl Operator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Subtract),
            '*' => Some(Operator::Multiply),
            '/' => Some(Operator::Divide),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }

    /// Binding strength: `*` and `/` bind tighter than `+` and `-`.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Add | Operator::Subtract => 1,
            Operator::Multiply | Operator::Divide => 2,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplicative_operators_bind_tighter() {
        assert!(Operator::Multiply.precedence() > Operator::Add.precedence());
        assert!(Operator::Divide.precedence() > Operator::Subtract.precedence());
        assert_eq!(Operator::Add.precedence(), Operator::Subtract.precedence());
    }

    #[test]
    fn operators_serialize_as_symbols() {
        let json = serde_json::to_string(&Operator::Divide).unwrap();
        assert_eq!(json, "\"/\"");
        let op: Operator = serde_json::from_str("\"*\"").unwrap();
        assert_eq!(op, Operator::Multiply);
    }
}
