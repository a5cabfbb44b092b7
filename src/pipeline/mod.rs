// src/pipeline/mod.rs

//! # Training pipeline preset
//!
//! A complete configuration tree for a deep-learning training run, used by the `argtree`
//! binary and as a reference for declaring trees. Most hyperparameters follow the dataset
//! through [`defaults::DATA_SETTINGS`]; picking `gptbase` or `one_cycle` spawns the matching
//! subtree.

pub mod checkpointing;
pub mod dataset;
pub mod defaults;
pub mod logging;
pub mod model;
pub mod optimizer;
pub mod scheduler;
pub mod trainer;

use crate::core::arg::Arg;
use crate::core::args_group::ArgsGroup;
use crate::core::error::ConfigResult;

/// Root of the preset.
pub fn main_config() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("MainConfig")
        .description("Main Configs for the project")
        .arg(Arg::string("project_name").default("PROJECT_NAME"))
        .arg(Arg::flag("wandb").help("Log the run to Weights & Biases."))
        .arg(Arg::string("wandb_entity").default("fastr"))
        .arg(Arg::int("gpu").default(0).help("Index of the GPU to use."))
        .arg(Arg::int("seed").default(None::<i64>).help("Random seed, unset by default."))
        .child("dataset_config", dataset::config()?)
        .child("model_config", model::config()?)
        .child("trainer_config", trainer::config()?)
        .build()
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arg_parser::ArgParser;
    use crate::core::args_group::Attribute;
    use crate::core::dynamic_defaults::KeyedDefaults;
    use crate::core::error::ConfigError;
    use crate::core::value::ConfigValue;
    use crate::record;

    fn resolve(args: &[&str]) -> ConfigResult<ArgsGroup> {
        let mut tree = main_config()?;
        ArgParser::new(&mut tree, args.iter().copied()).parse_args_recursively()?;
        Ok(tree)
    }

    fn value<'t>(tree: &'t ArgsGroup, dotted: &str) -> &'t ConfigValue {
        tree.lookup(dotted)
            .and_then(Attribute::as_value)
            .unwrap_or_else(|| panic!("'{dotted}' is not resolved"))
    }

    #[test]
    fn test_counts_before_and_after_parsing() {
        let mut tree = main_config().unwrap();
        assert_eq!((tree.num_args(), tree.num_configs(), tree.num_groups()), (5, 0, 3));

        ArgParser::new(&mut tree, Vec::<String>::new())
            .parse_args_recursively()
            .unwrap();
        assert_eq!((tree.num_args(), tree.num_configs(), tree.num_groups()), (0, 5, 3));
        assert_eq!(tree.total_args(), 0);
    }

    #[test]
    fn test_sst2_run() {
        let tree = resolve(&["--wandb", "--seed", "12123", "--dataset", "sst2"]).unwrap();
        assert_eq!(value(&tree, "wandb"), &ConfigValue::Bool(true));
        assert_eq!(value(&tree, "seed"), &ConfigValue::Int(12123));
        assert_eq!(value(&tree, "model_config.model"), &ConfigValue::from("bert"));
        assert_eq!(
            value(&tree, "trainer_config.optimizer_config.lr"),
            &ConfigValue::Float(2e-5)
        );
        assert_eq!(
            value(&tree, "trainer_config.optimizer_config.weight_decay"),
            &ConfigValue::Float(0.0)
        );
        assert_eq!(
            value(&tree, "trainer_config.optimizer_config.optimizer"),
            &ConfigValue::from("adamw")
        );
        assert_eq!(
            value(&tree, "trainer_config.scheduler_config.scheduler"),
            &ConfigValue::from("linear")
        );
        assert_eq!(
            value(&tree, "trainer_config.epoch_runner_config.turn_on_torch_amp_autocast"),
            &ConfigValue::Bool(false)
        );
        assert_eq!(
            value(&tree, "trainer_config.logger_config.log_dir"),
            &ConfigValue::from("AUTO")
        );
        assert_eq!(value(&tree, "trainer_config.no_test"), &ConfigValue::Bool(true));
        assert!(tree.child("model_config").unwrap().child("gpt_base_configs").is_none());
    }

    #[test]
    fn test_wikitext_spawns_subtrees() {
        let tree = resolve(&["--dataset", "wikitext"]).unwrap();
        assert_eq!(
            value(&tree, "trainer_config.scheduler_config.scheduler"),
            &ConfigValue::from("one_cycle")
        );
        assert_eq!(
            value(&tree, "trainer_config.epoch_runner_config.turn_on_torch_amp_autocast"),
            &ConfigValue::Bool(true)
        );
        assert_eq!(
            value(&tree, "trainer_config.scheduler_config.one_cycle.pct_start"),
            &ConfigValue::Float(0.02)
        );
        assert_eq!(value(&tree, "model_config.model"), &ConfigValue::from("gptbase"));
        assert_eq!(
            value(&tree, "model_config.gpt_base_configs.sequence_length"),
            &ConfigValue::Int(4096)
        );
        assert_eq!(value(&tree, "model_config.gpt_base_configs.n_layer"), &ConfigValue::Int(12));
        assert_eq!(
            value(&tree, "dataset_config.n_accumulate_batches"),
            &ConfigValue::Int(4)
        );
    }

    #[test]
    fn test_user_flag_beats_dynamic_default() {
        let tree = resolve(&["--dataset", "sst2", "--turn_on_torch_amp_autocast"]).unwrap();
        assert_eq!(
            value(&tree, "trainer_config.epoch_runner_config.turn_on_torch_amp_autocast"),
            &ConfigValue::Bool(true)
        );
    }

    #[test]
    fn test_user_scheduler_spawns_with_standard_defaults() {
        let tree = resolve(&["--dataset", "sst2", "--scheduler", "one_cycle"]).unwrap();
        assert_eq!(
            value(&tree, "trainer_config.scheduler_config.one_cycle.pct_start"),
            &ConfigValue::Float(0.3)
        );
    }

    #[test]
    fn test_flag_of_spawned_subtree() {
        let tree = resolve(&["--dataset", "wikitext", "--n_layer", "1234"]).unwrap();
        assert_eq!(
            value(&tree, "model_config.gpt_base_configs.n_layer"),
            &ConfigValue::Int(1234)
        );
        assert_eq!(
            value(&tree, "trainer_config.scheduler_config.scheduler_step_every"),
            &ConfigValue::from("batch")
        );
    }

    #[test]
    fn test_flag_of_unspawned_subtree_is_left_over() {
        let err = resolve(&["--dataset", "sst2", "--n_layer", "3"]).unwrap_err();
        assert!(matches!(err, ConfigError::UnexpectedArguments(ref rest) if rest == "--n_layer 3"));
    }

    #[test]
    fn test_log_every_constraint() {
        assert!(resolve(&["--log_every", "1"]).is_ok());
        let err = resolve(&["--log_every", "-1"]).unwrap_err();
        assert!(matches!(err, ConfigError::ConstraintViolation { .. }));
        assert_eq!(err.path(), Some("MainConfig.trainer_config.logger_config.log_every"));
    }

    #[test]
    fn test_dynamic_default_is_checked_too() {
        // mnist logs every 0 batches, which the constraint rejects.
        let err = resolve(&["--dataset", "mnist"]).unwrap_err();
        assert!(matches!(err, ConfigError::ConstraintViolation { .. }));
        assert!(resolve(&["--dataset", "mnist", "--log_every", "10"]).is_ok());
    }

    #[test]
    fn test_step_every_follows_scheduler() {
        let tree = resolve(&["--dataset", "wikitext", "--scheduler", "reduce_lr_on_plateau"]).unwrap();
        assert_eq!(
            value(&tree, "trainer_config.scheduler_config.scheduler_step_every"),
            &ConfigValue::from("epoch")
        );
        assert!(tree.lookup("trainer_config.scheduler_config.one_cycle").is_none());
    }

    #[test]
    fn test_profiler_subtree() {
        let tree = resolve(&["--run_profiler", "--repeat", "2"]).unwrap();
        let profiler = tree
            .lookup("trainer_config.logger_config.profiler_config")
            .and_then(Attribute::as_group)
            .unwrap();
        assert_eq!(profiler.value("repeat"), Some(&ConfigValue::Int(2)));
        assert_eq!(profiler.value("wait"), Some(&ConfigValue::Int(5)));
    }

    #[test]
    fn test_invalid_dataset_choice() {
        let err = resolve(&["--dataset", "imagenet"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChoice { .. }));
        assert_eq!(err.path(), Some("MainConfig.dataset_config.dataset"));
    }

    #[test]
    fn test_flat_mapping_prefers_deeper_fields() {
        let tree = resolve(&["--dataset", "wikitext"]).unwrap();
        let flat = tree.to_flat_mapping();
        // The fixed dropout of the GPT subtree overwrites the model's.
        assert_eq!(flat.get("dropout"), Some(&ConfigValue::Float(0.2)));
        assert_eq!(flat.get("lr"), Some(&ConfigValue::Float(1e-3)));

        let tree = resolve(&["--dataset", "sst2"]).unwrap();
        assert_eq!(tree.to_flat_mapping().get("dropout"), Some(&ConfigValue::Float(0.0)));
    }

    #[test]
    fn test_extra_table_through_pivot_pass() {
        let extra = KeyedDefaults::new("dataset").row("sst2", record! { "num_workers" => 2 });
        let mut tree = main_config().unwrap();
        let mut parser = ArgParser::new(&mut tree, ["--dataset", "sst2"]);
        assert_eq!(parser.apply_keyed_defaults(&extra).unwrap(), 1);
        parser.parse_args_recursively().unwrap();
        assert_eq!(value(&tree, "dataset_config.num_workers"), &ConfigValue::Int(2));
    }

    #[test]
    fn test_static_validation_of_the_preset() {
        let mut tree = main_config().unwrap();
        let parser = ArgParser::new(&mut tree, Vec::<String>::new());
        parser.validate().unwrap();
        let help = parser.help();
        assert!(help.contains("--dataset <STR>"));
        assert!(help.contains("OptimizerConfig"));
    }
}
