// src/core/mod.rs

//! The configuration-tree library: values, `Arg`s, groups and the parser that resolves them.

pub mod arg;
pub mod arg_parser;
pub mod args_group;
pub mod cli_input;
pub mod constraints;
pub mod dynamic_defaults;
pub mod error;
pub mod graph_display;
pub mod value;
