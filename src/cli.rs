// src/cli.rs

//! Command-line surface of the `argtree` binary.

use crate::core::arg_parser::ArgParser;
use crate::core::args_group::ArgsGroup;
use crate::core::dynamic_defaults::KeyedDefaults;
use crate::core::graph_display::{DisplayOptions, render_tree};
use crate::pipeline;
use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::PathBuf;

/// argtree: resolves the bundled training pipeline configuration from the command line.
///
/// Tool options go first; everything from the first unknown flag on is handed to the
/// configuration tree, e.g. `argtree --json --dataset sst2 --lr 0.01`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print the resolved configuration as JSON instead of a tree.
    #[arg(long)]
    pub json: bool,

    /// Print the declared tree and its flags without resolving anything.
    #[arg(long)]
    pub describe: bool,

    /// Extra defaults table (TOML, or JSON by extension) applied before parsing.
    /// May be repeated; earlier tables win.
    #[arg(long = "defaults", value_name = "FILE")]
    pub defaults: Vec<PathBuf>,

    /// Flags for the configuration tree.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Runs one invocation against `root`.
pub fn run(cli: Cli, mut root: ArgsGroup) -> Result<String> {
    log::debug!("CLI args parsed: {:?}", cli);

    let tables = cli
        .defaults
        .iter()
        .map(|path| KeyedDefaults::load(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut parser = ArgParser::new(&mut root, cli.args);
    for table in &tables {
        let count = parser.apply_keyed_defaults(table)?;
        if count == 0 {
            log::warn!("{}", format!(t!("cli.defaults.none_applied"), field = table.field()));
        } else {
            log::info!(
                "{}",
                format!(t!("cli.defaults.applied"), count = count, field = table.field())
            );
        }
    }

    if cli.describe {
        parser.validate()?;
        return Ok(format!(
            "{}\n{}\n\n{}",
            t!("cli.tree.describe_header").bold(),
            render_tree(parser.root(), &DisplayOptions::default()),
            parser.help()
        ));
    }

    parser.parse_args_recursively()?;

    if cli.json {
        return Ok(root.to_json_pretty()?);
    }
    Ok(format!(
        "{}\n{}",
        t!("cli.tree.header").green().bold(),
        render_tree(&root, &DisplayOptions::default())
    ))
}

/// Entry point of the `argtree` binary.
pub fn run_pipeline(cli: Cli) -> Result<String> {
    run(cli, pipeline::main_config()?)
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ConfigError;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("argtree").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_tool_options_and_tree_flags_are_split() {
        let parsed = cli(&["--json", "--dataset", "sst2", "--wandb"]);
        assert!(parsed.json);
        assert_eq!(parsed.args, vec!["--dataset", "sst2", "--wandb"]);
    }

    #[test]
    fn test_json_output() {
        let output = run_pipeline(cli(&["--json", "--dataset", "sst2"])).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["model_config"]["model"], "bert");
        assert_eq!(parsed["trainer_config"]["optimizer_config"]["optimizer"], "adamw");
    }

    #[test]
    fn test_describe_does_not_resolve() {
        colored::control::set_override(false);
        let output = run_pipeline(cli(&["--describe"])).unwrap();
        assert!(output.contains("MainConfig (Main Configs for the project): 5 Args"));
        assert!(output.contains("--dataset <STR>"));
    }

    #[test]
    fn test_defaults_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "dynamic_default_field = \"dataset\"\n\n[sst2]\nnum_workers = 1\nlr = 0.5"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let output = run_pipeline(cli(&["--json", "--defaults", &path, "--dataset", "sst2"])).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["dataset_config"]["num_workers"], 1);
        // `lr` keeps its own table.
        assert_eq!(parsed["trainer_config"]["optimizer_config"]["lr"], 2e-5);
    }

    #[test]
    fn test_errors_keep_their_type() {
        let err = run_pipeline(cli(&["--log_every", "-1"])).unwrap_err();
        let config_error = err.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(config_error.help_text(), Some("Log every this many batches."));

        let err = run_pipeline(cli(&["--defaults", "/nonexistent/table.toml"])).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::Io { .. })));
    }
}
