//! Selenese command type and its pipe-delimited wire format.
//!
//! # Format
//!
//! ```text
//! |verb|arg1|arg2|
//! ```
//!
//! Exactly four `|` delimiters, the first at position zero. Both arguments
//! are required but may be empty. There is no escaping: a field containing
//! `|` cannot be represented.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, MalformedReason, Result};

// ============================================================================
// Constants
// ============================================================================

/// Field delimiter of the wire format.
pub const DELIMITER: char = '|';

/// Number of delimiters in a well-formed command string.
const DELIMITER_COUNT: usize = 4;

/// Terminal verb; the driver does not wait for its result.
pub const TEST_COMPLETE: &str = "testComplete";

/// Verb sent to a runner whose poll found no command in time.
pub const RETRY_LAST: &str = "retryLast";

// ============================================================================
// Command
// ============================================================================

/// A single Selenese command: a verb plus exactly two arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    verb: String,
    arg1: String,
    arg2: String,
}

// ============================================================================
// Command - Constructors
// ============================================================================

impl Command {
    /// Creates a command from its three fields.
    #[inline]
    #[must_use]
    pub fn new(verb: impl Into<String>, arg1: impl Into<String>, arg2: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            arg1: arg1.into(),
            arg2: arg2.into(),
        }
    }

    /// Creates the terminal `testComplete` command.
    #[inline]
    #[must_use]
    pub fn test_complete() -> Self {
        Self::new(TEST_COMPLETE, "", "")
    }

    /// Creates the `retryLast` command.
    #[inline]
    #[must_use]
    pub fn retry_last() -> Self {
        Self::new(RETRY_LAST, "", "")
    }

    /// Parses a raw command string.
    ///
    /// Validation runs in this order and stops at the first failure:
    ///
    /// 1. input present
    /// 2. input not blank
    /// 3. input starts with `|`
    /// 4. input contains exactly four `|`
    ///
    /// Anything after the fourth delimiter is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCommand`] carrying the raw string and the
    /// failed check.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw else {
            return Err(Error::malformed("", MalformedReason::Missing));
        };

        if raw.trim().is_empty() {
            return Err(Error::malformed(raw, MalformedReason::Blank));
        }

        if !raw.starts_with(DELIMITER) {
            return Err(Error::malformed(
                raw,
                MalformedReason::MissingLeadingDelimiter,
            ));
        }

        let fields: Vec<&str> = raw.split(DELIMITER).collect();
        let [_, verb, arg1, arg2, _] = fields.as_slice() else {
            return Err(Error::malformed(
                raw,
                MalformedReason::WrongDelimiterCount {
                    found: fields.len() - 1,
                },
            ));
        };

        debug_assert_eq!(fields.len() - 1, DELIMITER_COUNT);

        Ok(Self::new(*verb, *arg1, *arg2))
    }
}

// ============================================================================
// Command - Accessors
// ============================================================================

impl Command {
    /// Returns the command verb.
    #[inline]
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Returns the first argument.
    #[inline]
    #[must_use]
    pub fn arg1(&self) -> &str {
        &self.arg1
    }

    /// Returns the second argument.
    #[inline]
    #[must_use]
    pub fn arg2(&self) -> &str {
        &self.arg2
    }

    /// Returns `true` for the terminal `testComplete` verb.
    #[inline]
    #[must_use]
    pub fn is_test_complete(&self) -> bool {
        self.verb == TEST_COMPLETE
    }

    /// Returns `true` for the `retryLast` verb.
    #[inline]
    #[must_use]
    pub fn is_retry_last(&self) -> bool {
        self.verb == RETRY_LAST
    }

    /// Encodes the command in wire format.
    #[inline]
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{d}{}{d}{}{d}{}{d}",
            self.verb,
            self.arg1,
            self.arg2,
            d = DELIMITER
        )
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(Some(s))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn reason_of(raw: Option<&str>) -> MalformedReason {
        match Command::parse(raw) {
            Err(Error::MalformedCommand { reason, .. }) => reason,
            other => panic!("expected malformed command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_valid() {
        let command: Command = "|open|http://localhost||".parse().expect("valid");
        assert_eq!(command.verb(), "open");
        assert_eq!(command.arg1(), "http://localhost");
        assert_eq!(command.arg2(), "");
    }

    #[test]
    fn test_parse_empty_args() {
        let command = Command::parse(Some("|testComplete|||")).expect("valid");
        assert!(command.is_test_complete());
        assert_eq!(command.arg1(), "");
        assert_eq!(command.arg2(), "");
    }

    #[test]
    fn test_parse_missing() {
        assert_eq!(reason_of(None), MalformedReason::Missing);
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(reason_of(Some("")), MalformedReason::Blank);
        assert_eq!(reason_of(Some("   \t\n")), MalformedReason::Blank);
    }

    #[test]
    fn test_parse_no_leading_delimiter() {
        assert_eq!(
            reason_of(Some("junk")),
            MalformedReason::MissingLeadingDelimiter
        );
        assert_eq!(
            reason_of(Some("command|blah|blah|blah|")),
            MalformedReason::MissingLeadingDelimiter
        );
    }

    #[test]
    fn test_parse_wrong_delimiter_count() {
        assert_eq!(
            reason_of(Some("|command|blah|blah|blah|")),
            MalformedReason::WrongDelimiterCount { found: 5 }
        );
        assert_eq!(
            reason_of(Some("|command|blah|")),
            MalformedReason::WrongDelimiterCount { found: 3 }
        );
    }

    #[test]
    fn test_malformed_carries_raw() {
        let err = Command::parse(Some("junk")).expect_err("should fail");
        match err {
            Error::MalformedCommand { raw, .. } => assert_eq!(raw, "junk"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_text_ignored() {
        let command = Command::parse(Some("|click|id=go|x|tail")).expect("valid");
        assert_eq!(command, Command::new("click", "id=go", "x"));
    }

    #[test]
    fn test_encode() {
        let command = Command::new("type", "id=q", "selenium");
        assert_eq!(command.encode(), "|type|id=q|selenium|");
        assert_eq!(Command::retry_last().encode(), "|retryLast|||");
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            verb in "[^|]{0,12}",
            arg1 in "[^|]{0,24}",
            arg2 in "[^|]{0,24}",
        ) {
            let raw = format!("|{verb}|{arg1}|{arg2}|");

            let command = Command::parse(Some(&raw)).expect("well-formed");
            prop_assert_eq!(command.verb(), verb.as_str());
            prop_assert_eq!(command.arg1(), arg1.as_str());
            prop_assert_eq!(command.arg2(), arg2.as_str());
            prop_assert_eq!(command.encode(), raw);
        }
    }
}
