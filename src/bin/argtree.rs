// src/bin/argtree.rs

//! The `argtree` binary: resolves the training pipeline preset from the command line.

use argtree::{ConfigError, cli};
use clap::Parser;
use colored::*;

fn main() {
    env_logger::init();

    match cli::run_pipeline(cli::Cli::parse()) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("\n{}: {}", argtree::t!("cli.error.label").red().bold(), e);
            if let Some(help) = e.downcast_ref::<ConfigError>().and_then(ConfigError::help_text) {
                eprintln!(
                    "{}",
                    format!(argtree::t!("cli.error.help_hint"), help = help).dimmed()
                );
            }
            std::process::exit(1);
        }
    }
}
