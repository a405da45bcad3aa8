//! Error taxonomy for evaluation.
//!
//! Every failure an untrusted program can provoke is a [`LispError`]. The
//! variants form a small hierarchy:
//!
//! ```text
//! LispError
//! ├── Limitation        budget exceeded (objects, depth, steps, list length)
//! ├── Name              unbound symbol
//! └── Type              value fails a type/capability check
//!     ├── ArgType       wrong type at a specific argument position
//!     ├── Uncallable    head of an application is not callable
//!     └── ArgCount      wrong number of arguments
//! ```
//!
//! [`LispError::category`] exposes the middle layer so hosts can match on
//! "any type error" without listing the leaves. Factory functions below are
//! the canonical way to build errors.

use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// Result of evaluation.
pub type EvalResult = Result<Value, LispError>;

/// Which budget an evaluation ran into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Limit {
    /// The live-object registry is full (`max_things`).
    Objects,
    /// Recursion depth reached `max_depth`.
    Depth,
    /// Evaluation steps reached `max_steps`.
    Steps,
    /// `cons` would produce a list longer than the list-length cap.
    ListLength,
}

impl Limit {
    /// Human-readable description, used as the body of the error message.
    pub fn description(self) -> &'static str {
        match self {
            Limit::Objects => "too many objects",
            Limit::Depth => "too much nesting",
            Limit::Steps => "too many steps",
            Limit::ListLength => "cons would create too long a list",
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Argument count a callable accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Expected {
    /// Exactly this many arguments.
    Exactly(usize),
    /// This many arguments or more.
    AtLeast(usize),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Exactly(n) => write!(f, "{n}"),
            Expected::AtLeast(n) => write!(f, "≥ {n}"),
        }
    }
}

/// Coarse classification mirroring the error hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Limitation,
    Name,
    Type,
}

/// An error raised while evaluating a program.
///
/// Every variant carries the value that caused it; see [`LispError::value`].
#[derive(Clone, Debug, Error)]
pub enum LispError {
    #[error("evaluation stopped, {limit}: `{}`", .value.brief())]
    Limitation { limit: Limit, value: Value },

    #[error("name `{}` is not defined", .symbol.brief())]
    Name { symbol: Value },

    #[error("`{}` is not {expected}", .value.brief())]
    Type { value: Value, expected: &'static str },

    /// `position` is 1-based.
    #[error(
        "argument {position} given to `{}` must be {expected}, got `{}`",
        .callable.brief(),
        .value.brief()
    )]
    ArgType {
        callable: Value,
        position: usize,
        value: Value,
        expected: &'static str,
    },

    #[error("`{}` is not callable", .value.brief())]
    Uncallable { value: Value },

    #[error(
        "wrong number of args given to `{}`: expected {expected}, got {got}",
        .callable.brief()
    )]
    ArgCount {
        callable: Value,
        expected: Expected,
        got: usize,
    },
}

impl LispError {
    /// The single-sentence message shown to whoever supplied the program.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// The offending value.
    pub fn value(&self) -> &Value {
        match self {
            LispError::Limitation { value, .. }
            | LispError::Type { value, .. }
            | LispError::ArgType { value, .. }
            | LispError::Uncallable { value } => value,
            LispError::Name { symbol } => symbol,
            LispError::ArgCount { callable, .. } => callable,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            LispError::Limitation { .. } => ErrorCategory::Limitation,
            LispError::Name { .. } => ErrorCategory::Name,
            LispError::Type { .. }
            | LispError::ArgType { .. }
            | LispError::Uncallable { .. }
            | LispError::ArgCount { .. } => ErrorCategory::Type,
        }
    }

    /// The budget that tripped, for `Limitation` errors.
    pub fn limit(&self) -> Option<Limit> {
        match self {
            LispError::Limitation { limit, .. } => Some(*limit),
            _ => None,
        }
    }

    #[inline]
    pub fn is_limitation(&self) -> bool {
        self.category() == ErrorCategory::Limitation
    }

    #[inline]
    pub fn is_type_error(&self) -> bool {
        self.category() == ErrorCategory::Type
    }
}

// Factory functions

#[cold]
pub fn limit_exceeded(limit: Limit, value: &Value) -> LispError {
    LispError::Limitation {
        limit,
        value: value.clone(),
    }
}

#[cold]
pub fn unbound_symbol(symbol: &Value) -> LispError {
    LispError::Name {
        symbol: symbol.clone(),
    }
}

#[cold]
pub fn type_mismatch(value: &Value, expected: &'static str) -> LispError {
    LispError::Type {
        value: value.clone(),
        expected,
    }
}

/// Wrong argument type; `position` counts from 1.
#[cold]
pub fn wrong_arg_type(
    callable: &Value,
    position: usize,
    value: &Value,
    expected: &'static str,
) -> LispError {
    LispError::ArgType {
        callable: callable.clone(),
        position,
        value: value.clone(),
        expected,
    }
}

#[cold]
pub fn not_callable(value: &Value) -> LispError {
    LispError::Uncallable {
        value: value.clone(),
    }
}

#[cold]
pub fn wrong_arg_count(callable: &Value, expected: Expected, got: usize) -> LispError {
    LispError::ArgCount {
        callable: callable.clone(),
        expected,
        got,
    }
}
