// src/constants.rs

//! Crate-wide constants.

/// Key naming the pivot field inside a defaults table document.
pub const DYNAMIC_DEFAULT_FIELD_KEY: &str = "dynamic_default_field";

/// Maximum nesting of spawned subtrees (a spawned group spawning another, and so on).
pub const MAX_SPAWN_DEPTH: usize = 16;

/// Separator of attribute paths in error messages and lookups.
pub const PATH_SEPARATOR: &str = ".";
