// src/pipeline/checkpointing.rs

//! Checkpoint saving.

use crate::core::arg::Arg;
use crate::core::args_group::ArgsGroup;
use crate::core::error::ConfigResult;
use crate::core::value::ConfigValue;

/// `CheckpointingConfig`: which checkpoints are written.
pub fn config() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("CheckpointingConfig")
        .description("Checkpointing related configs")
        .arg(Arg::flag("save_last").help("Save the model after the last epoch."))
        .arg(Arg::flag("save_best").help("Save the model with the best metric."))
        .arg(
            Arg::string("config_best_split")
                .choices(["train", "val"])
                .default("val"),
        )
        .arg(
            Arg::string("config_best_metric")
                .choices(["accuracy", "loss"])
                .default("accuracy"),
        )
        .arg(Arg::flag("resume").help("Resume from the last checkpoint."))
        .fixed("wandb_id", ConfigValue::Null)
        .build()
}
