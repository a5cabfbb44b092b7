// src/pipeline/trainer.rs

//! The trainer and the groups nested under it.

use crate::core::arg::Arg;
use crate::core::args_group::ArgsGroup;
use crate::core::constraints::LowerBound;
use crate::core::error::ConfigResult;
use crate::core::value::ConfigValue;
use crate::pipeline::defaults::DATA_SETTINGS;
use crate::pipeline::{checkpointing, logging, optimizer, scheduler};

/// `TrainerConfig`, holding the optimizer, scheduler, logging and checkpointing groups.
pub fn config() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("TrainerConfig")
        .description("Trainer related configs")
        .arg(
            Arg::int("n_epochs")
                .default(100)
                .dynamic_defaults_from(&DATA_SETTINGS)
                .constraint(LowerBound::strict(0.0)),
        )
        .arg(
            Arg::string("loss")
                .choices(["cross_entropy", "square"])
                .default("cross_entropy"),
        )
        .arg(
            Arg::flag("no_test")
                .dynamic_defaults_from(&DATA_SETTINGS)
                .help("Skip the test split."),
        )
        .arg(Arg::flag("no_val").help("Skip the validation split."))
        .child("epoch_runner_config", epoch_runner()?)
        .child("logger_config", logging::config()?)
        .child("checkpointing_config", checkpointing::config()?)
        .child("optimizer_config", optimizer::config()?)
        .child("scheduler_config", scheduler::config()?)
        .build()
}

/// `EpochRunner`: epochs and batches per epoch.
pub fn epoch_runner() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("EpochRunnerConfig")
        .description("Epoch runner related configs")
        .arg(
            Arg::flag("turn_on_torch_amp_autocast")
                .dynamic_defaults_from(&DATA_SETTINGS)
                .help("Run forward passes under mixed precision."),
        )
        .arg(
            Arg::int("n_batches_per_epoch")
                .default(None::<i64>)
                .help("Cut each epoch short after this many batches."),
        )
        .child("grad_processing_config", grad_processing()?)
        .build()
}

/// `GradProcessing`: accumulation and clipping.
pub fn grad_processing() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("GradProcessingConfig")
        .description("Gradient processing configs")
        .arg(Arg::float("scale_noise").default(1.0))
        .arg(
            Arg::float("clip_grad")
                .default(ConfigValue::Null)
                .constraint(LowerBound::strict(0.0)),
        )
        .arg(Arg::float("noise_param").default(ConfigValue::Null))
        .build()
}
