//! Command Parser
//!
//! Turns one received frame into a [`Command`].
//!
//! ## Rules
//!
//! 1. The frame is decoded as UTF-8 (invalid sequences are replaced, not rejected).
//! 2. It is split on every single space. Nothing is trimmed, so `"add 1 2\n"`
//!    carries the operand `"2\n"` and `"add  1 2"` carries an empty operand.
//! 3. The first token is matched case-sensitively:
//!    - `add` needs exactly two base-10 `i32` operands
//!    - `getall` takes nothing else
//!    - anything else (including the empty frame) is [`Command::Unknown`]
//!
//! A recognised label with the wrong operands is a [`ParseError`], not an
//! unknown command. The connection handler answers both the same way and
//! keeps the connection open.

use crate::protocol::{ADD, GET_ALL};
use std::borrow::Cow;
use std::num::ParseIntError;
use thiserror::Error;

/// A command received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add <a> <b>`: store `a + b`
    Add(i32, i32),
    /// `getall`: list every stored record
    ListAll,
    /// Any other first token
    Unknown(String),
}

impl Command {
    /// The label a record produced by this command is stored under.
    pub fn label(&self) -> &str {
        match self {
            Command::Add(..) => ADD,
            Command::ListAll => GET_ALL,
            Command::Unknown(raw) => raw,
        }
    }
}

/// Errors for frames that name a known command but misuse it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Wrong number of tokens after the label
    #[error("'{command}' expects {expected} argument(s), got {got}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    /// An operand is not a base-10 integer in range
    #[error("invalid operand '{operand}': {reason}")]
    InvalidOperand { operand: String, reason: String },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses one frame.
///
/// # Example
///
/// ```
/// use calc_server::protocol::{parse_frame, Command};
///
/// assert_eq!(parse_frame(b"add 2 3").unwrap(), Command::Add(2, 3));
/// assert_eq!(parse_frame(b"getall").unwrap(), Command::ListAll);
/// assert_eq!(parse_frame(b"mul 2 3").unwrap(), Command::Unknown("mul".into()));
/// assert!(parse_frame(b"add 3").is_err());
/// ```
pub fn parse_frame(frame: &[u8]) -> ParseResult<Command> {
    let text: Cow<'_, str> = String::from_utf8_lossy(frame);
    let mut tokens = text.split(' ');

    // split always yields at least one item, even for ""
    let label = tokens.next().unwrap_or_default();
    let args: Vec<&str> = tokens.collect();

    match label {
        ADD => {
            if args.len() != 2 {
                return Err(ParseError::WrongArity {
                    command: ADD,
                    expected: 2,
                    got: args.len(),
                });
            }
            let a = parse_operand(args[0])?;
            let b = parse_operand(args[1])?;
            Ok(Command::Add(a, b))
        }
        GET_ALL => {
            if !args.is_empty() {
                return Err(ParseError::WrongArity {
                    command: GET_ALL,
                    expected: 0,
                    got: args.len(),
                });
            }
            Ok(Command::ListAll)
        }
        other => Ok(Command::Unknown(other.to_string())),
    }
}

fn parse_operand(token: &str) -> ParseResult<i32> {
    token
        .parse::<i32>()
        .map_err(|e: ParseIntError| ParseError::InvalidOperand {
            operand: token.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        assert_eq!(parse_frame(b"add 1 2").unwrap(), Command::Add(1, 2));
        assert_eq!(parse_frame(b"add -7 +3").unwrap(), Command::Add(-7, 3));
        assert_eq!(
            parse_frame(b"add 2147483647 -2147483648").unwrap(),
            Command::Add(i32::MAX, i32::MIN)
        );
    }

    #[test]
    fn test_parse_getall() {
        assert_eq!(parse_frame(b"getall").unwrap(), Command::ListAll);
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        assert_eq!(
            parse_frame(b"ADD 1 2").unwrap(),
            Command::Unknown("ADD".to_string())
        );
        assert_eq!(
            parse_frame(b"GetAll").unwrap(),
            Command::Unknown("GetAll".to_string())
        );
    }

    #[test]
    fn test_empty_frame_is_unknown() {
        assert_eq!(parse_frame(b"").unwrap(), Command::Unknown(String::new()));
    }

    #[test]
    fn test_unknown_keeps_raw_label() {
        assert_eq!(
            parse_frame(b"mul 2 3").unwrap(),
            Command::Unknown("mul".to_string())
        );
        assert_eq!(
            parse_frame(b" add 1 2").unwrap(),
            Command::Unknown(String::new())
        );
    }

    #[test]
    fn test_add_wrong_arity() {
        assert_eq!(
            parse_frame(b"add 3"),
            Err(ParseError::WrongArity {
                command: ADD,
                expected: 2,
                got: 1
            })
        );
        assert!(parse_frame(b"add").is_err());
        assert!(parse_frame(b"add 1 2 3").is_err());
        // Trailing space produces an extra empty token
        assert!(parse_frame(b"add 1 2 ").is_err());
    }

    #[test]
    fn test_add_invalid_operands() {
        assert!(matches!(
            parse_frame(b"add one 2"),
            Err(ParseError::InvalidOperand { .. })
        ));
        assert!(matches!(
            parse_frame(b"add 1 2\n"),
            Err(ParseError::InvalidOperand { .. })
        ));
        assert!(matches!(
            parse_frame(b"add 1  2"),
            Err(ParseError::WrongArity { got: 3, .. })
        ));
        assert!(matches!(
            parse_frame(b"add 2147483648 1"),
            Err(ParseError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn test_getall_with_arguments() {
        assert_eq!(
            parse_frame(b"getall now"),
            Err(ParseError::WrongArity {
                command: GET_ALL,
                expected: 0,
                got: 1
            })
        );
    }

    #[test]
    fn test_invalid_utf8_is_not_fatal() {
        let cmd = parse_frame(&[0xff, 0xfe, b' ', b'1']).unwrap();
        assert!(matches!(cmd, Command::Unknown(_)));
    }

    #[test]
    fn test_command_label() {
        assert_eq!(Command::Add(1, 1).label(), "add");
        assert_eq!(Command::ListAll.label(), "getall");
        assert_eq!(Command::Unknown("x".into()).label(), "x");
    }
}
