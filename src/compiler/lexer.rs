// src/compiler/lexer.rs

//! Tokenizer for infix arithmetic.
//!
//! Accepts digits, `.`, the four binary operators, parentheses and
//! whitespace. Anything else is rejected with
//! [`CompileError::InvalidCharacter`].

use crate::compiler::{CompileError, Operator};

/// A lexical token together with the character position where it starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Number(f64),
    Operator(Operator),
    LeftParen,
    RightParen,
}

/// Split `input` into `(position, token)` pairs.
///
/// Positions are character offsets into `input`, used for error reporting.
pub fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, CompileError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            let value = literal.parse::<f64>().map_err(|_| {
                CompileError::MalformedExpression(format!(
                    "invalid number '{literal}' at position {start}"
                ))
            })?;
            if !value.is_finite() {
                return Err(CompileError::MalformedExpression(format!(
                    "number out of range at position {start}"
                )));
            }
            tokens.push((start, Token::Number(value)));
            continue;
        }

        let token = match c {
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            other => match Operator::from_char(other) {
                Some(op) => Token::Operator(op),
                None => {
                    return Err(CompileError::InvalidCharacter {
                        ch: other,
                        position: i,
                    });
                }
            },
        };
        tokens.push((i, token));
        i += 1;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|(_, t)| t)
            .collect()
    }

    #[test]
    fn splits_numbers_operators_and_parens() {
        assert_eq!(
            kinds("(12 + 3.5)*4"),
            vec![
                Token::LeftParen,
                Token::Number(12.0),
                Token::Operator(Operator::Add),
                Token::Number(3.5),
                Token::RightParen,
                Token::Operator(Operator::Multiply),
                Token::Number(4.0),
            ]
        );
    }

    #[test]
    fn records_start_positions() {
        let tokens = tokenize(" 10 /2").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![1, 4, 5]);
    }

    #[test]
    fn rejects_letters() {
        assert_eq!(
            tokenize("2 + x"),
            Err(CompileError::InvalidCharacter {
                ch: 'x',
                position: 4
            })
        );
    }

    #[test]
    fn rejects_numbers_with_two_dots() {
        match tokenize("1.2.3 + 1") {
            Err(CompileError::MalformedExpression(msg)) => assert!(msg.contains("1.2.3")),
            other => panic!("expected MalformedExpression, got {other:?}"),
        }
    }

    #[test]
    fn rejects_numbers_that_overflow_f64() {
        let huge = "9".repeat(400);
        match tokenize(&format!("{huge}+1")) {
            Err(CompileError::MalformedExpression(msg)) => {
                assert!(msg.contains("out of range"), "unexpected message: {msg}")
            }
            other => panic!("expected MalformedExpression, got {other:?}"),
        }
    }
}
