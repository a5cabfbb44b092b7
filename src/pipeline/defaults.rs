// src/pipeline/defaults.rs

//! Shared defaults tables of the training pipeline.

use crate::core::dynamic_defaults::KeyedDefaults;
use crate::record;
use lazy_static::lazy_static;

lazy_static! {
    /// Per-dataset hyperparameters, keyed on `dataset`.
    pub static ref DATA_SETTINGS: KeyedDefaults = KeyedDefaults::new("dataset")
        .row("imagenet", record! {
            "n_epochs" => 50,
            "batch_size" => 128,
            "log_every" => 250,
            "weight_decay" => 1e-4,
            "lr" => 1e-3,
            "model" => "resnet50",
        })
        .row("mrpc", record! {
            "n_epochs" => 3,
            "batch_size" => 8,
            "log_every" => 100,
            "weight_decay" => 0.0,
            "lr" => 5e-5,
            "optimizer" => "adamw",
            "scheduler" => "linear",
            "model" => "bert",
        })
        .row("sst2", record! {
            "n_epochs" => 4,
            "batch_size" => 16,
            "log_every" => 100,
            "weight_decay" => 0.0,
            "lr" => 2e-5,
            "optimizer" => "adamw",
            "scheduler" => "linear",
            "model" => "bert",
            "no_test" => true,
        })
        .row("mnli", record! {
            "n_epochs" => 4,
            "batch_size" => 8,
            "log_every" => 1000,
            "weight_decay" => 0.0,
            "lr" => 2e-5,
            "optimizer" => "adamw",
            "scheduler" => "linear",
            "model" => "bert",
            "no_test" => true,
        })
        .row("imdb", record! {
            "n_epochs" => 10,
            "batch_size" => 16,
            "log_every" => 25,
            "weight_decay" => 0.01,
            "lr" => 2e-5,
            "optimizer" => "adamw",
            "scheduler" => "linear",
            "model" => "distilbert",
            "no_test" => false,
        })
        .row("squad", record! {
            "n_epochs" => 4,
            "batch_size" => 64,
            "log_every" => 25,
            "weight_decay" => 0.01,
            "lr" => 2e-5,
            "optimizer" => "adamw",
            "scheduler" => "linear",
            "model" => "bert-cased",
            "no_test" => false,
        })
        .row("mnist", record! {
            "model" => "simple",
            "n_epochs" => 50,
            "batch_size" => 128,
            "weight_decay" => 0,
            "lr" => 1e-2,
            "log_every" => 0,
        })
        .row("fashion_mnist", record! {
            "model" => "wide-resnet-28-10",
            "n_epochs" => 100,
            "batch_size" => 256,
            "weight_decay" => 0,
            "lr" => 1e-2,
            "log_every" => 100,
        })
        .row("wikitext", record! {
            "model" => "gptbase",
            "batch_size" => 4,
            "optimizer" => "adamw",
            "scheduler" => "one_cycle",
            "weight_decay" => 0.1,
            "lr" => 1e-3,
            "dropout" => 0.1,
            "log_every" => 100,
            "n_epochs" => 1,
            "sequence_length" => 4096,
            "turn_on_torch_amp_autocast" => true,
            "n_accumulate_batches" => 4,
            "pct_start" => 0.02,
        });

    /// When each scheduler steps, keyed on `scheduler`.
    pub static ref SCHEDULER_SETTINGS: KeyedDefaults = KeyedDefaults::new("scheduler")
        .row("one_cycle", record! { "scheduler_step_every" => "batch" })
        .row("linear", record! { "scheduler_step_every" => "batch" })
        .row("reduce_lr_on_plateau", record! { "scheduler_step_every" => "epoch" });
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::ConfigValue;

    #[test]
    fn test_data_settings_columns() {
        let lr = DATA_SETTINGS.for_arg("lr").unwrap();
        assert_eq!(lr.field(), "dataset");
        assert_eq!(lr.lookup(&ConfigValue::from("sst2")), Some(&ConfigValue::Float(2e-5)));
        assert_eq!(lr.lookup(&ConfigValue::from("cifar10")), None);

        let sequence_length = DATA_SETTINGS.for_arg("sequence_length").unwrap();
        assert_eq!(sequence_length.entries().len(), 1);
        assert!(DATA_SETTINGS.for_arg("vocab_size").is_none());
    }

    #[test]
    fn test_scheduler_settings() {
        let step = SCHEDULER_SETTINGS.for_arg("scheduler_step_every").unwrap();
        assert_eq!(
            step.lookup(&ConfigValue::from("reduce_lr_on_plateau")),
            Some(&ConfigValue::from("epoch"))
        );
    }
}
