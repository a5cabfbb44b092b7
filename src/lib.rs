//! # argtree
//!
//! Hierarchical configuration trees resolved from command-line arguments.
//!
//! A tree is made of [`ArgsGroup`]s holding [`Arg`]s, fixed values and child groups.
//! [`ArgParser`] walks it once, replacing every `Arg` by a value taken from the user, from a
//! default keyed on an earlier value, or from the declared default. An `Arg` may spawn a new
//! subtree depending on its resolved value.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

pub mod cli;
pub mod constants;
pub mod core;
pub mod pipeline;

pub use crate::core::arg::{Arg, ArgAction, GroupFactory, ValueSource};
pub use crate::core::arg_parser::{ArgParser, ResolvedArg};
pub use crate::core::args_group::{ArgsGroup, Attribute, NestedValue, Traversal};
pub use crate::core::constraints::{
    Bound, CompositeConstraint, Constraint, ConstraintError, LowerBound, Predicate, UpperBound,
};
pub use crate::core::dynamic_defaults::{DefaultsTable, DynamicDefaults, KeyedDefaults};
pub use crate::core::error::{ConfigError, ConfigResult, DependencyIssue};
pub use crate::core::value::{ConfigValue, ValueType};
