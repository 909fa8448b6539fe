//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Command engine
//!
//! Pure operations behind the command phase of the protocol, plus the rules
//! that pull their arguments out of a command line.
//!
//! | Line                     | Reply                                  |
//! |--------------------------|----------------------------------------|
//! | `parentheses: <expr>`    | `the parentheses are balanced: yes/no` |
//! | `lcm: <x> <y>`           | `the lcm is: <n>`                      |
//! | `caesar: <text> <shift>` | `the ciphertext is: <text>`            |
//! | `quit`                   | none, the connection is closed         |

use num_bigint::BigInt;
use num_integer::Integer;
use std::fmt;
use thiserror::Error;

const PARENTHESES_PREFIX: &str = "parentheses:";
const LCM_PREFIX: &str = "lcm:";
const CAESAR_PREFIX: &str = "caesar:";
const QUIT: &str = "quit";
const ALPHABET_LEN: i64 = 26;

/// Errors produced while parsing or evaluating a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The line does not start with a known command
    #[error("unknown command")]
    UnknownCommand,

    /// The arguments are missing, surplus, or not integers
    #[error("invalid arguments")]
    InvalidArguments,

    /// The operand text contains a character the command does not accept
    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Verdict of a parenthesis balance check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    /// Every `(` is closed by a later `)`
    Balanced,
    /// Some `)` has no opener, or some `(` is never closed
    Unbalanced,
}

impl Balance {
    /// Check if the verdict is [`Balance::Balanced`]
    pub fn is_balanced(self) -> bool {
        self == Balance::Balanced
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Balance::Balanced => write!(f, "yes"),
            Balance::Unbalanced => write!(f, "no"),
        }
    }
}

/// Check whether a string of parentheses is balanced
///
/// The whole string is scanned. It is unbalanced if the running depth ever
/// drops below zero or does not end at zero. Any character other than `(`
/// or `)` fails the check outright.
///
/// ```
/// use parley_service::{check_balance, Balance, CommandError};
///
/// assert_eq!(check_balance("(()())"), Ok(Balance::Balanced));
/// assert_eq!(check_balance(")("), Ok(Balance::Unbalanced));
/// assert_eq!(check_balance("(a)"), Err(CommandError::InvalidCharacter('a')));
/// ```
pub fn check_balance(text: &str) -> Result<Balance, CommandError> {
    let mut depth: i64 = 0;
    let mut dipped = false;
    for ch in text.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            other => return Err(CommandError::InvalidCharacter(other)),
        }
        if depth < 0 {
            dipped = true;
        }
    }

    if dipped || depth != 0 {
        Ok(Balance::Unbalanced)
    } else {
        Ok(Balance::Balanced)
    }
}

/// Greatest common divisor of the operands' magnitudes
///
/// `gcd(0, 0)` is 0.
pub fn gcd(x: &BigInt, y: &BigInt) -> BigInt {
    x.gcd(y)
}

/// Least common multiple of two signed integers of any size
///
/// Zero if either operand is zero, otherwise `|x * y| / gcd(x, y)`. The
/// result is never negative.
///
/// ```
/// use parley_service::{BigInt, lcm};
///
/// assert_eq!(lcm(&BigInt::from(-4), &BigInt::from(6)), BigInt::from(12));
/// ```
pub fn lcm(x: &BigInt, y: &BigInt) -> BigInt {
    x.lcm(y)
}

/// Apply a Caesar shift to ASCII letters and spaces
///
/// The shift is reduced modulo 26 (so `-1` behaves as `25`). Letters are
/// lower-cased before shifting and the output is always lowercase. Spaces
/// pass through unchanged; any other character fails with no partial output.
///
/// ```
/// use parley_service::caesar_shift;
///
/// assert_eq!(caesar_shift("Hello World", 3).unwrap(), "khoor zruog");
/// assert_eq!(caesar_shift("abc", -1).unwrap(), "zab");
/// ```
pub fn caesar_shift(text: &str, shift: i64) -> Result<String, CommandError> {
    let shift = shift.rem_euclid(26) as u8;
    text.chars()
        .map(|ch| match ch {
            ' ' => Ok(' '),
            ch if ch.is_ascii_alphabetic() => {
                let offset = ch.to_ascii_lowercase() as u8 - b'a';
                Ok((b'a' + (offset + shift) % 26) as char)
            }
            other => Err(CommandError::InvalidCharacter(other)),
        })
        .collect()
}

/// A parsed command-phase line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `parentheses: <expr>`
    Parentheses(String),
    /// `lcm: <x> <y>`
    Lcm(BigInt, BigInt),
    /// `caesar: <text> <shift>`
    Caesar {
        /// Plaintext, everything before the last space
        text: String,
        /// Shift amount, already reduced into `0..26`
        shift: i64,
    },
    /// `quit`
    Quit,
}

impl Request {
    /// Parse one command line
    ///
    /// Arguments are taken from the text after the command prefix with
    /// surrounding whitespace removed. `lcm` needs exactly two integers;
    /// `caesar` splits its arguments at the last space into text and shift.
    /// Integers are unbounded decimal text with an optional sign.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        if line == QUIT {
            return Ok(Request::Quit);
        }

        if let Some(rest) = line.strip_prefix(PARENTHESES_PREFIX) {
            return Ok(Request::Parentheses(rest.trim().to_string()));
        }

        if let Some(rest) = line.strip_prefix(LCM_PREFIX) {
            let mut operands = rest.split_whitespace();
            return match (operands.next(), operands.next(), operands.next()) {
                (Some(x), Some(y), None) => Ok(Request::Lcm(parse_integer(x)?, parse_integer(y)?)),
                _ => Err(CommandError::InvalidArguments),
            };
        }

        if let Some(rest) = line.strip_prefix(CAESAR_PREFIX) {
            let (text, shift) = rest
                .trim()
                .rsplit_once(' ')
                .ok_or(CommandError::InvalidArguments)?;
            return Ok(Request::Caesar {
                text: text.to_string(),
                shift: parse_shift(shift)?,
            });
        }

        Err(CommandError::UnknownCommand)
    }

    /// Check if this is the `quit` request
    pub fn is_quit(&self) -> bool {
        matches!(self, Request::Quit)
    }

    /// Evaluate the request into its reply text
    ///
    /// `quit` has no reply and evaluates to an empty string.
    pub fn execute(&self) -> Result<String, CommandError> {
        match self {
            Request::Parentheses(expr) => {
                let verdict = check_balance(expr)?;
                Ok(format!("the parentheses are balanced: {verdict}"))
            }
            Request::Lcm(x, y) => Ok(format!("the lcm is: {}", lcm(x, y))),
            Request::Caesar { text, shift } => {
                Ok(format!("the ciphertext is: {}", caesar_shift(text, *shift)?))
            }
            Request::Quit => Ok(String::new()),
        }
    }
}

fn parse_integer(token: &str) -> Result<BigInt, CommandError> {
    if !is_decimal(token) {
        return Err(CommandError::InvalidArguments);
    }
    token.parse().map_err(|_| CommandError::InvalidArguments)
}

/// Parse a shift of any size and reduce it into `0..26`
fn parse_shift(token: &str) -> Result<i64, CommandError> {
    let shift = parse_integer(token)?.mod_floor(&BigInt::from(ALPHABET_LEN));
    i64::try_from(&shift).map_err(|_| CommandError::InvalidArguments)
}

/// Optional sign followed by one or more ASCII digits
fn is_decimal(token: &str) -> bool {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
