// src/pipeline/scheduler.rs

//! Learning rate scheduling.

use crate::core::arg::Arg;
use crate::core::args_group::ArgsGroup;
use crate::core::constraints::{Bound, CompositeConstraint, LowerBound, UpperBound};
use crate::core::error::{ConfigError, ConfigResult};
use crate::core::value::ConfigValue;
use crate::pipeline::defaults::{DATA_SETTINGS, SCHEDULER_SETTINGS};

/// `SchedulerConfig`. Picking `one_cycle` spawns its warmup settings.
pub fn config() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("SchedulerConfig")
        .description("Learning rate scheduler configs")
        .arg(
            Arg::string("scheduler")
                .choices(["linear", "one_cycle", "cos", "reduce_lr_on_plateau"])
                .default(ConfigValue::Null)
                .dynamic_defaults_from(&DATA_SETTINGS)
                .spawns("one_cycle", one_cycle)
                .help("Learning rate schedule, none by default."),
        )
        .arg(
            Arg::string("scheduler_step_every")
                .choices(["epoch", "batch"])
                .default("batch")
                .dynamic_defaults_from(&SCHEDULER_SETTINGS),
        )
        .build()
}

/// Spawned under `scheduler_config` when the scheduler is `one_cycle`.
pub fn one_cycle() -> ConfigResult<ArgsGroup> {
    let fraction = CompositeConstraint::new([
        Bound::from(LowerBound::strict(0.0)),
        Bound::from(UpperBound::inclusive(1.0)),
    ])
    .map_err(|e| ConfigError::InvalidDeclaration {
        path: "OneCycleLRConfig.pct_start".to_string(),
        reason: e.to_string(),
    })?;

    ArgsGroup::builder("OneCycleLRConfig")
        .description("One cycle learning rate policy")
        .field_name("one_cycle")
        .arg(Arg::float("max_lr").default(1.0).constraint(LowerBound::strict(0.0)))
        .arg(
            Arg::string("anneal_strategy")
                .choices(["cos", "linear", "none"])
                .default("cos"),
        )
        .arg(
            Arg::float("pct_start")
                .default(0.3)
                .dynamic_defaults_from(&DATA_SETTINGS)
                .constraint(fraction)
                .help("Fraction of the cycle spent increasing the learning rate."),
        )
        .arg(Arg::flag("no_cycle_momentum"))
        .build()
}
