//! Console error taxonomy.
//!
//! Dispatch-level failures (unknown command, handler failure, bad values) are
//! never returned to the host as `Err`: the engine reports them on the
//! diagnostic channel, records one error, and hands back `false`.  The
//! variants below surface through the registration and input-stack APIs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the console and its registries.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Unknown command {0}")]
    UnknownCommand(String),

    #[error("Command '{0}' failed")]
    HandlerFailure(String),

    /// A token that should have been an integer was not.
    #[error("Cannot parse '{0}' as integer")]
    InvalidValue(String),

    #[error("Unknown parameter '{0}'")]
    NotFound(String),

    #[error("Could not open source file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot register {kind} '{name}': {reason}")]
    Registration {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("Exceeded limit of {limit} quit helpers")]
    LimitExceeded { limit: usize },

    #[error("Error limit of {limit} reached")]
    ErrorLimitReached { limit: i64 },

    #[error("Line longer than {max} bytes in '{label}'")]
    LineTooLong { label: String, max: usize },

    #[error("Source files nested deeper than {max} levels")]
    NestingTooDeep { max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ConsoleError {
    pub(crate) fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Registration { kind, name: name.into(), reason: "already registered" }
    }

    pub(crate) fn empty_name(kind: &'static str) -> Self {
        Self::Registration { kind, name: String::new(), reason: "name is empty" }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_message() {
        let e = ConsoleError::UnknownCommand("bogus".into());
        assert_eq!(e.to_string(), "Unknown command bogus");
    }

    #[test]
    fn open_error_names_path() {
        let e = ConsoleError::Open {
            path: PathBuf::from("missing.cmd"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(e.to_string().starts_with("Could not open source file 'missing.cmd'"));
    }

    #[test]
    fn duplicate_registration_message() {
        let e = ConsoleError::duplicate("command", "help");
        assert_eq!(e.to_string(), "Cannot register command 'help': already registered");
    }

    #[test]
    fn handler_failure_names_command() {
        let e = ConsoleError::HandlerFailure("option".into());
        assert_eq!(e.to_string(), "Command 'option' failed");
    }

    #[test]
    fn line_too_long_names_source() {
        let e = ConsoleError::LineTooLong { label: "/dev/zero".into(), max: 8192 };
        assert_eq!(e.to_string(), "Line longer than 8192 bytes in '/dev/zero'");
    }
}
