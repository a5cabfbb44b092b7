// src/core/error.rs

//! Error types of declaration, loading and resolution.

use crate::core::constraints::ConstraintError;
use crate::core::value::{ConfigValue, ValueType};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort a declaration or a resolution pass.
///
/// Value-level variants carry the dot-joined path of the offending `Arg` and its help text,
/// so the user can correct the invocation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The resolved value is not one of the declared choices.
    #[error("Invalid choice for '{path}': received '{value}', expected one of [{}].", join_values(.choices))]
    InvalidChoice {
        /// Path of the `Arg`.
        path: String,
        /// The rejected value.
        value: ConfigValue,
        /// The declared choices.
        choices: Vec<ConfigValue>,
        /// Help text of the `Arg`.
        help: Option<String>,
    },
    /// The resolved value fails the `Arg`'s constraint.
    #[error("Constraint violated for '{path}' (received '{value}'): {source}")]
    ConstraintViolation {
        /// Path of the `Arg`.
        path: String,
        /// The rejected value.
        value: ConfigValue,
        /// What the constraint reported.
        #[source]
        source: ConstraintError,
        /// Help text of the `Arg`.
        help: Option<String>,
    },
    /// A user token or a default could not be converted to the declared type.
    #[error("Invalid value for '{path}': '{raw}' is not a valid {expected}.")]
    InvalidValue {
        /// Path of the `Arg`.
        path: String,
        /// The value as received.
        raw: String,
        /// The declared type.
        expected: ValueType,
        /// Help text of the `Arg`.
        help: Option<String>,
    },
    /// A dynamic default needs a pivot that is not available.
    #[error("'{path}' takes its default from '{field}', which {issue}.")]
    UnresolvedDependency {
        /// Path of the dependent `Arg`.
        path: String,
        /// Name of the pivot field.
        field: String,
        /// Why the pivot is unavailable.
        issue: DependencyIssue,
    },
    /// A shared table is keyed on a field no `Arg` in the tree declares.
    #[error("Pivot field '{0}' was not found anywhere in the configuration tree.")]
    UnknownPivotField(String),
    /// A spawned or attached group would replace an existing attribute.
    #[error("Cannot attach '{field}' under '{path}': the name is already taken.")]
    NameCollision {
        /// Path of the owning group.
        path: String,
        /// The attribute name already in use.
        field: String,
    },
    /// A declaration lacks something it cannot do without, such as a name or a default.
    #[error("Declaration of '{path}' is missing its {missing}.")]
    MissingRequiredSpecification {
        /// Path of the declaration.
        path: String,
        /// What is missing.
        missing: &'static str,
    },
    /// A declaration is present but malformed.
    #[error("Invalid declaration of '{path}': {reason}")]
    InvalidDeclaration {
        /// Path of the declaration.
        path: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Two `Arg`s that can coexist register the same flag.
    #[error("Flag '--{flag}' is declared by both '{first}' and '{second}'.")]
    DuplicateFlag {
        /// The flag, without dashes.
        flag: String,
        /// Path of the first `Arg`.
        first: String,
        /// Path of the second `Arg`.
        second: String,
    },
    /// A valued flag is the last token.
    #[error("Flag '--{flag}' expects a value.")]
    MissingFlagValue {
        /// The flag, without dashes.
        flag: String,
    },
    /// Tokens left over after the whole tree is resolved, joined by spaces.
    #[error("Unexpected arguments were provided: {0}")]
    UnexpectedArguments(String),
    /// Spawned groups nest deeper than `MAX_SPAWN_DEPTH`.
    #[error("Maximum spawn depth ({depth}) exceeded at '{path}'.")]
    SpawnDepthExceeded {
        /// The limit.
        depth: usize,
        /// Path of the `Arg` whose spawn went too deep.
        path: String,
    },
    /// A command line could not be split with shell quoting rules.
    #[error("Could not split the command line: {0}")]
    Tokenize(String),
    /// A defaults table document has the wrong shape.
    #[error("Invalid defaults table in {origin}: {message}")]
    TableFormat {
        /// File path or description of the table.
        origin: String,
        /// What is wrong with it.
        message: String,
    },
    /// A defaults table file could not be read.
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Why a dynamic default could not be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyIssue {
    /// No `Arg` with that name exists in the tree.
    NotDeclared,
    /// The field exists but resolves after the dependent `Arg`.
    ResolvesLater,
    /// The dependency chain loops back on itself.
    Cycle(String),
}

impl fmt::Display for DependencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDeclared => write!(f, "is not declared anywhere in the tree"),
            Self::ResolvesLater => write!(f, "has not been resolved yet in traversal order"),
            Self::Cycle(chain) => write!(f, "forms a dependency cycle ({})", chain),
        }
    }
}

impl ConfigError {
    /// The help text of the `Arg` involved in a value-level failure, if it declared one.
    pub fn help_text(&self) -> Option<&str> {
        match self {
            Self::InvalidChoice { help, .. }
            | Self::ConstraintViolation { help, .. }
            | Self::InvalidValue { help, .. } => help.as_deref(),
            _ => None,
        }
    }

    /// The fully-qualified attribute path the failure refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::InvalidChoice { path, .. }
            | Self::ConstraintViolation { path, .. }
            | Self::InvalidValue { path, .. }
            | Self::UnresolvedDependency { path, .. }
            | Self::NameCollision { path, .. }
            | Self::MissingRequiredSpecification { path, .. }
            | Self::InvalidDeclaration { path, .. }
            | Self::SpawnDepthExceeded { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn join_values(values: &[ConfigValue]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of any fallible configuration operation.
pub type ConfigResult<T> = Result<T, ConfigError>;
