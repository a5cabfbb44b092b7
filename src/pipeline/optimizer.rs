// src/pipeline/optimizer.rs

//! Optimizer hyperparameters.

use crate::core::arg::Arg;
use crate::core::args_group::ArgsGroup;
use crate::core::constraints::LowerBound;
use crate::core::error::ConfigResult;
use crate::pipeline::defaults::DATA_SETTINGS;

/// `OptimizerConfig`: optimizer kind, learning rate and weight decay.
pub fn config() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("OptimizerConfig")
        .description("Optimizer related configs")
        .arg(
            Arg::string("optimizer")
                .choices(["sgd", "adam", "adamw"])
                .default("sgd")
                .dynamic_defaults_from(&DATA_SETTINGS),
        )
        .arg(
            Arg::float("lr")
                .default(1e-3)
                .dynamic_defaults_from(&DATA_SETTINGS)
                .constraint(LowerBound::strict(0.0))
                .help("Learning rate."),
        )
        .arg(
            Arg::float("weight_decay")
                .default(0.0)
                .dynamic_defaults_from(&DATA_SETTINGS)
                .constraint(LowerBound::inclusive(0.0)),
        )
        .build()
}
