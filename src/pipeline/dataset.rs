// src/pipeline/dataset.rs

//! Dataset selection and loading. `dataset` is the pivot of [`DATA_SETTINGS`].

use crate::core::arg::Arg;
use crate::core::args_group::ArgsGroup;
use crate::core::constraints::{Bound, CompositeConstraint, LowerBound, UpperBound};
use crate::core::error::{ConfigError, ConfigResult};
use crate::pipeline::defaults::DATA_SETTINGS;

/// Datasets accepted by `--dataset`.
pub const DATASETS: [&str; 7] = ["mnist", "cifar10", "wikitext", "sst2", "imdb", "mrpc", "mnli"];

/// `DatasetConfig`: the dataset, the validation split and the loader workers.
pub fn config() -> ConfigResult<ArgsGroup> {
    let fraction = CompositeConstraint::new([
        Bound::from(LowerBound::inclusive(0.0)),
        Bound::from(UpperBound::strict(1.0)),
    ])
    .map_err(|e| ConfigError::InvalidDeclaration {
        path: "DatasetConfig.val_fraction".to_string(),
        reason: e.to_string(),
    })?;

    ArgsGroup::builder("DatasetConfig")
        .description("Dataset related configs")
        .arg(
            Arg::string("dataset")
                .choices(DATASETS)
                .default("cifar10")
                .help("Dataset to train on."),
        )
        .arg(
            Arg::float("val_fraction")
                .default(0.0)
                .constraint(fraction)
                .help("Fraction of the training split held out for validation."),
        )
        .arg(Arg::int("num_workers").default(4).help("Data loader workers."))
        .arg(
            Arg::int("batch_size")
                .default(256)
                .dynamic_defaults_from(&DATA_SETTINGS)
                .constraint(LowerBound::strict(0.0))
                .help("Batch size."),
        )
        .arg(
            Arg::int("n_accumulate_batches")
                .default(1)
                .dynamic_defaults_from(&DATA_SETTINGS)
                .help("Batches accumulated before each optimizer step."),
        )
        .arg(Arg::flag("no_augment_data").help("Turn off data augmentation."))
        .build()
}
