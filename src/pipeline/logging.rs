// src/pipeline/logging.rs

//! Progress logging and the optional profiler.

use crate::core::arg::Arg;
use crate::core::args_group::ArgsGroup;
use crate::core::constraints::LowerBound;
use crate::core::error::ConfigResult;
use crate::pipeline::defaults::DATA_SETTINGS;

/// `LoggingConfig`. Turning `profile` on spawns the profiler subtree.
pub fn config() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("LoggingConfig")
        .description("Logging related configs")
        .arg(
            Arg::string("log_dir")
                .default("AUTO")
                .help("Directory for logs, derived from the run when AUTO."),
        )
        .arg(Arg::int("log_fixed_gradients_n_epochs").default(0))
        .arg(Arg::flag("run_test_only_if_best_metric_split_improved"))
        .arg(Arg::flag("log_gradients"))
        .arg(
            Arg::int("log_every")
                .default(50)
                .dynamic_defaults_from(&DATA_SETTINGS)
                .constraint(LowerBound::strict(0.0))
                .help("Log every this many batches."),
        )
        .arg(Arg::flag("show_progress"))
        .arg(
            Arg::flag("run_profiler")
                .spawns(true, profiler)
                .help("Profile a few training steps."),
        )
        .build()
}

/// Spawned under `logger_config` when `--run_profiler` is given.
pub fn profiler() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("ProfilerConfig")
        .description("Profiler schedule")
        .field_name("profiler_config")
        .fixed("wait", 5)
        .fixed("warmup", 2)
        .fixed("active", 3)
        .arg(Arg::int("schedule_skip_first").default(5))
        .arg(Arg::int("repeat").default(1).constraint(LowerBound::inclusive(1.0)))
        .fixed("profile_memory", true)
        .fixed("record_shapes", true)
        .fixed("with_stack", true)
        .build()
}
