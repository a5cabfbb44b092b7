// src/pipeline/model.rs

//! Model selection and architecture.

use crate::core::arg::Arg;
use crate::core::args_group::ArgsGroup;
use crate::core::constraints::LowerBound;
use crate::core::error::ConfigResult;
use crate::pipeline::defaults::DATA_SETTINGS;

/// Models accepted by `--model`.
pub const MODELS: [&str; 7] = [
    "resnet50",
    "gptbase",
    "bert",
    "distilbert",
    "simple",
    "wide-resnet-28-10",
    "bert-cased",
];

/// `ModelConfig`. Picking `gptbase` spawns the GPT architecture subtree.
pub fn config() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("ModelConfig")
        .description("Model related configs")
        .arg(
            Arg::string("model")
                .choices(MODELS)
                .default("resnet50")
                .dynamic_defaults_from(&DATA_SETTINGS)
                .spawns("gptbase", gpt_base)
                .help("Architecture to train."),
        )
        .arg(
            Arg::float("dropout")
                .default(0.0)
                .dynamic_defaults_from(&DATA_SETTINGS)
                .help("Dropout probability."),
        )
        .arg(Arg::flag("use_pretrained").help("Start from pretrained weights."))
        .build()
}

/// Spawned under `model_config` when the model is `gptbase`.
pub fn gpt_base() -> ConfigResult<ArgsGroup> {
    ArgsGroup::builder("GPTBaseConfigs")
        .description("GPT base model configs")
        .field_name("gpt_base_configs")
        .fixed("vocab_size", 50304)
        .fixed("n_embd", 768)
        .arg(
            Arg::int("sequence_length")
                .default(512)
                .dynamic_defaults_from(&DATA_SETTINGS)
                .constraint(LowerBound::strict(0.0))
                .help("Context length in tokens."),
        )
        .fixed("bias", false)
        .arg(Arg::int("n_layer").default(12).help("Transformer blocks."))
        .arg(Arg::int("n_head").default(4).help("Attention heads per block."))
        .fixed("dropout", 0.2)
        .build()
}
