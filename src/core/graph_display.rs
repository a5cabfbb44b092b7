// src/core/graph_display.rs

//! Text rendering of a tree for the terminal.

use crate::core::args_group::{ArgsGroup, Attribute};

/// What `render_tree` prints besides the group structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    /// List values and pending `Arg`s under each group, not only child groups.
    pub show_values: bool,
    /// Stop descending below this many levels (the root is level 0).
    pub max_depth: Option<usize>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_values: true,
            max_depth: None,
        }
    }
}

/// One-line summary of a group, e.g. `2 Args, 1 non-Arg configs, 3 ArgsGroup.`
pub fn format_stats(group: &ArgsGroup) -> String {
    let num_args = group.num_args();
    let mut stats = String::new();
    if num_args > 0 {
        stats.push_str(&format!("{} Args, {} non-Arg configs, ", num_args, group.num_configs()));
    } else {
        stats.push_str(&format!("{} configs, ", group.num_configs()));
    }
    stats.push_str(&format!("{} ArgsGroup.", group.num_groups()));
    stats
}

/// Renders an ASCII tree of `root` and its descendants.
pub fn render_tree(root: &ArgsGroup, options: &DisplayOptions) -> String {
    let mut lines = vec![header(root.name(), root)];
    render_children(root, options, "", 1, &mut lines);
    lines.join("\n")
}

fn header(label: &str, group: &ArgsGroup) -> String {
    match group.description() {
        Some(description) => format!("{} ({}): {}", label, description, format_stats(group)),
        None => format!("{}: {}", label, format_stats(group)),
    }
}

fn render_children(
    group: &ArgsGroup,
    options: &DisplayOptions,
    prefix: &str,
    depth: usize,
    lines: &mut Vec<String>,
) {
    if options.max_depth.is_some_and(|max| depth > max) {
        return;
    }

    let entries: Vec<(&str, &Attribute)> = group
        .attributes()
        .filter(|(_, attr)| options.show_values || matches!(attr, Attribute::Group(_)))
        .collect();

    for (i, (field, attribute)) in entries.iter().enumerate() {
        let is_last = i + 1 == entries.len();
        let connector = if is_last { "└─ " } else { "├─ " };

        match attribute {
            Attribute::Group(child) => {
                let label = format!("{} [{}]", field, child.name());
                lines.push(format!("{}{}{}", prefix, connector, header(&label, child)));
                let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
                render_children(child, options, &child_prefix, depth + 1, lines);
            }
            Attribute::Value(value) => {
                lines.push(format!("{}{}{} = {}", prefix, connector, field, value));
            }
            Attribute::Fixed(value) => {
                lines.push(format!("{}{}{} = {} (fixed)", prefix, connector, field, value));
            }
            Attribute::Arg(arg) => {
                let default = arg
                    .standard_default()
                    .map_or_else(|| "none".to_string(), ToString::to_string);
                lines.push(format!(
                    "{}{}{} <{}> [default: {}]",
                    prefix,
                    connector,
                    field,
                    arg.value_type().placeholder(),
                    default
                ));
            }
        }
    }
}

// MARK: --- UNIT TESTS ---
