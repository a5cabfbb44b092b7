// src/core/arg.rs

//! The `Arg` descriptor: declaration, flag registration and resolution of a single value.

use crate::constants::PATH_SEPARATOR;
use crate::core::args_group::ArgsGroup;
use crate::core::constraints::{Constraint, ConstraintError};
use crate::core::dynamic_defaults::{DynamicDefaults, KeyedDefaults};
use crate::core::error::{ConfigError, ConfigResult};
use crate::core::value::{ConfigValue, ValueType};
use clap::builder::PossibleValuesParser;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

lazy_static! {
    /// Long flag names: a leading letter, then letters, digits, `_` or `-`.
    static ref FLAG_NAME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap();
}

/// Builds the subtree spawned when an `Arg` resolves to a given value.
pub type GroupFactory = fn() -> ConfigResult<ArgsGroup>;

// --- DATA STRUCTS ---

/// How the flag of an `Arg` consumes the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgAction {
    /// `--name <VALUE>`
    #[default]
    Store,
    /// Bare `--name` sets `true`.
    StoreTrue,
    /// Bare `--name` sets `false`.
    StoreFalse,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Given on the command line.
    User,
    /// Looked up in the dynamic defaults table.
    Dynamic,
    /// The declared default.
    Standard,
}

/// Outcome of [`Arg::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// The coerced and checked value.
    pub value: ConfigValue,
    /// Which precedence level supplied it.
    pub source: ValueSource,
}

/// A value-level failure, before the parser attaches the `Arg`'s path to it.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// See [`ConfigError::InvalidChoice`].
    InvalidChoice {
        /// The rejected value.
        value: ConfigValue,
        /// The declared choices.
        choices: Vec<ConfigValue>,
    },
    /// See [`ConfigError::ConstraintViolation`].
    Constraint {
        /// The rejected value.
        value: ConfigValue,
        /// What the constraint reported.
        error: ConstraintError,
    },
    /// See [`ConfigError::InvalidValue`].
    Type {
        /// The value as received.
        raw: String,
        /// The declared type.
        expected: ValueType,
    },
    /// No user value, no dynamic default and no standard default.
    MissingDefault,
}

/// Descriptor of one configurable scalar.
///
/// An `Arg` lives inside an [`ArgsGroup`] until the parser replaces it with its resolved value.
#[derive(Debug, Clone)]
pub struct Arg {
    name: String,
    value_type: ValueType,
    standard_default: Option<ConfigValue>,
    help: Option<String>,
    action: ArgAction,
    choices: Option<Vec<ConfigValue>>,
    constraint: Option<Arc<dyn Constraint>>,
    dynamic_defaults: Option<DynamicDefaults>,
    children: Vec<(ConfigValue, GroupFactory)>,
}

// --- IMPLEMENTATIONS ---

impl ArgAction {
    /// The value a bare flag stores, `None` for `Store`.
    pub fn flag_value(self) -> Option<bool> {
        match self {
            Self::Store => None,
            Self::StoreTrue => Some(true),
            Self::StoreFalse => Some(false),
        }
    }

    /// Whether the flag is followed by a value.
    pub fn takes_value(self) -> bool {
        matches!(self, Self::Store)
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Dynamic => write!(f, "dynamic default"),
            Self::Standard => write!(f, "standard default"),
        }
    }
}

impl Violation {
    /// Attaches the `Arg`'s path and help text.
    pub fn into_error(self, path: &str, help: Option<&str>) -> ConfigError {
        let path = path.to_string();
        let help = help.map(str::to_string);
        match self {
            Self::InvalidChoice { value, choices } => ConfigError::InvalidChoice {
                path,
                value,
                choices,
                help,
            },
            Self::Constraint { value, error } => ConfigError::ConstraintViolation {
                path,
                value,
                source: error,
                help,
            },
            Self::Type { raw, expected } => ConfigError::InvalidValue {
                path,
                raw,
                expected,
                help,
            },
            Self::MissingDefault => ConfigError::MissingRequiredSpecification {
                path,
                missing: "standard default",
            },
        }
    }
}

/// Whether `name` can be used as a long flag or an attribute name.
pub(crate) fn is_valid_name(name: &str) -> bool {
    FLAG_NAME_RE.is_match(name)
}

impl Arg {
    /// A `Store` `Arg` with no default yet.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            standard_default: None,
            help: None,
            action: ArgAction::Store,
            choices: None,
            constraint: None,
            dynamic_defaults: None,
            children: Vec::new(),
        }
    }

    /// Shorthand for [`Arg::new`] with [`ValueType::Int`].
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Int)
    }

    /// Shorthand for [`Arg::new`] with [`ValueType::Float`].
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Float)
    }

    /// Shorthand for [`Arg::new`] with [`ValueType::Str`].
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Str)
    }

    /// A boolean that takes an explicit value (`--name true`).
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Bool)
    }

    /// A store-true flag defaulting to `false`.
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Bool)
            .action(ArgAction::StoreTrue)
            .default(false)
    }

    // MARK: Builders

    /// The standard default, used when neither the user nor a dynamic default supplies a value.
    /// Use `ConfigValue::Null` for "no value".
    pub fn default(mut self, value: impl Into<ConfigValue>) -> Self {
        self.standard_default = Some(value.into());
        self
    }

    /// Help text shown in `--help` and quoted in value errors.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// See [`ArgAction`].
    pub fn action(mut self, action: ArgAction) -> Self {
        self.action = action;
        self
    }

    /// Restricts the resolved value to `choices`. Also registered as the flag's possible values.
    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ConfigValue>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Checked after choices. `Null` values skip it.
    pub fn constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraint = Some(Arc::new(constraint));
        self
    }

    /// Own dynamic defaults. The pivot pass leaves an `Arg` that has them alone.
    pub fn dynamic_defaults(mut self, defaults: DynamicDefaults) -> Self {
        self.dynamic_defaults = Some(defaults);
        self
    }

    /// Takes this `Arg`'s column out of a shared table. Rows that do not mention the `Arg`
    /// are ignored; if none does, the `Arg` is left without dynamic defaults.
    pub fn dynamic_defaults_from(mut self, table: &KeyedDefaults) -> Self {
        match table.for_arg(&self.name) {
            Some(defaults) => self.dynamic_defaults = Some(defaults),
            None => log::warn!(
                "Table keyed on '{}' has no row for '{}'",
                table.field(),
                self.name
            ),
        }
        self
    }

    /// Registers a subtree to graft next to this `Arg` when it resolves to `value`.
    pub fn spawns(mut self, value: impl Into<ConfigValue>, factory: GroupFactory) -> Self {
        self.children.push((value.into(), factory));
        self
    }

    // MARK: Accessors

    /// Attribute name and long flag.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The declared default, if any.
    pub fn standard_default(&self) -> Option<&ConfigValue> {
        self.standard_default.as_ref()
    }

    /// The help text, if any.
    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// The flag action.
    pub fn get_action(&self) -> ArgAction {
        self.action
    }

    /// The declared choices, if any.
    pub fn get_choices(&self) -> Option<&[ConfigValue]> {
        self.choices.as_deref()
    }

    /// Dynamic defaults, declared or annotated by the pivot pass.
    pub fn get_dynamic_defaults(&self) -> Option<&DynamicDefaults> {
        self.dynamic_defaults.as_ref()
    }

    /// The field this `Arg`'s default depends on, if any.
    pub fn depends_on(&self) -> Option<&str> {
        self.dynamic_defaults.as_ref().map(DynamicDefaults::field)
    }

    /// Every `(value, factory)` pair of the spawn registry.
    pub fn spawn_registry(&self) -> &[(ConfigValue, GroupFactory)] {
        &self.children
    }

    /// The factory registered for a resolved value.
    pub fn spawn_for(&self, value: &ConfigValue) -> Option<GroupFactory> {
        if value.is_null() {
            return None;
        }
        self.children
            .iter()
            .find(|(key, _)| value.matches_key(key))
            .map(|(_, factory)| *factory)
    }

    /// Annotation from the pivot pass. Dynamic defaults already set are never replaced.
    pub(crate) fn annotate_dynamic_defaults(&mut self, defaults: DynamicDefaults) -> bool {
        if self.dynamic_defaults.is_some() {
            return false;
        }
        self.dynamic_defaults = Some(defaults);
        true
    }

    // MARK: Declaration

    /// Checks the declaration and normalizes its literals to the declared type.
    /// Called once by [`ArgsGroup`] when the group is built.
    pub(crate) fn validate_declaration(&mut self, path: &str) -> ConfigResult<()> {
        let invalid = |reason: String| ConfigError::InvalidDeclaration {
            path: path.to_string(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingRequiredSpecification {
                path: path.trim_end_matches(PATH_SEPARATOR).to_string(),
                missing: "name",
            });
        }
        if !is_valid_name(&self.name) {
            return Err(invalid(format!(
                "'{}' is not a valid flag name (a letter, then letters, digits, '_' or '-')",
                self.name
            )));
        }

        if let Some(flag_value) = self.action.flag_value() {
            if self.value_type != ValueType::Bool {
                return Err(invalid(format!(
                    "a store-{} flag must be boolean, not {}",
                    flag_value, self.value_type
                )));
            }
            if self.standard_default.is_none() {
                self.standard_default = Some(ConfigValue::Bool(!flag_value));
            }
        }

        let Some(default) = self.standard_default.take() else {
            return Err(ConfigError::MissingRequiredSpecification {
                path: path.to_string(),
                missing: "standard default",
            });
        };
        let default = self.value_type.coerce(default.clone()).ok_or_else(|| {
            invalid(format!(
                "default '{}' ({}) is not a valid {}",
                default,
                default.kind(),
                self.value_type
            ))
        })?;

        if let Some(choices) = self.choices.take() {
            let mut normalized = Vec::with_capacity(choices.len());
            for choice in choices {
                let coerced = self.value_type.coerce(choice.clone()).ok_or_else(|| {
                    invalid(format!("choice '{}' is not a valid {}", choice, self.value_type))
                })?;
                normalized.push(coerced);
            }
            if !default.is_null() && !normalized.iter().any(|c| c.matches_key(&default)) {
                return Err(invalid(format!("default '{}' is not among its choices", default)));
            }
            self.choices = Some(normalized);
        }

        let mut children = Vec::with_capacity(self.children.len());
        for (key, factory) in self.children.drain(..) {
            let coerced = self.value_type.coerce(key.clone()).ok_or_else(|| {
                invalid(format!("spawn key '{}' is not a valid {}", key, self.value_type))
            })?;
            children.push((coerced, factory));
        }
        self.children = children;
        self.standard_default = Some(default);
        Ok(())
    }

    /// The flag registration for the help surface. The real default stays deferred; only a
    /// placeholder is rendered.
    pub fn declare(&self) -> clap::Arg {
        let mut arg = clap::Arg::new(self.name.clone())
            .long(self.name.clone())
            .help(self.help_line());

        arg = match self.action {
            ArgAction::Store => arg
                .action(clap::ArgAction::Set)
                .value_name(self.value_type.placeholder())
                .allow_negative_numbers(true),
            ArgAction::StoreTrue => arg.action(clap::ArgAction::SetTrue),
            ArgAction::StoreFalse => arg.action(clap::ArgAction::SetFalse),
        };

        if let Some(choices) = &self.choices
            && self.action.takes_value()
        {
            let names: Vec<String> = choices.iter().map(ToString::to_string).collect();
            arg = arg.value_parser(PossibleValuesParser::new(names));
        }
        arg
    }

    fn help_line(&self) -> String {
        let default = self
            .standard_default
            .as_ref()
            .map_or_else(|| "none".to_string(), ToString::to_string);
        let suffix = match &self.dynamic_defaults {
            Some(dynamic) => format!("[default: dynamic by `{}`, else {}]", dynamic.field(), default),
            None => format!("[default: {}]", default),
        };
        match &self.help {
            Some(help) if !help.is_empty() => format!("{} {}", help, suffix),
            _ => suffix,
        }
    }

    // MARK: Resolution

    /// Converts a raw command-line token into the declared type.
    pub fn parse_user(&self, raw: &str) -> Result<ConfigValue, Violation> {
        self.value_type.parse(raw).ok_or_else(|| Violation::Type {
            raw: raw.to_string(),
            expected: self.value_type,
        })
    }

    /// Picks the final value (user > dynamic > standard) and validates it.
    pub fn resolve(
        &self,
        user: Option<ConfigValue>,
        dynamic: Option<&ConfigValue>,
    ) -> Result<Resolved, Violation> {
        let (candidate, source) = match (user, dynamic) {
            (Some(value), _) => (value, ValueSource::User),
            (None, Some(value)) => (value.clone(), ValueSource::Dynamic),
            (None, None) => (
                self.standard_default.clone().ok_or(Violation::MissingDefault)?,
                ValueSource::Standard,
            ),
        };

        let value = self
            .value_type
            .coerce(candidate.clone())
            .ok_or_else(|| Violation::Type {
                raw: candidate.to_string(),
                expected: self.value_type,
            })?;

        // Null is a legal "unset" and skips validation.
        if !value.is_null() {
            if let Some(choices) = &self.choices
                && !choices.iter().any(|choice| value.matches_key(choice))
            {
                return Err(Violation::InvalidChoice {
                    value,
                    choices: choices.clone(),
                });
            }
            if let Some(constraint) = &self.constraint
                && let Err(error) = constraint.check(&value)
            {
                return Err(Violation::Constraint { value, error });
            }
        }

        Ok(Resolved { value, source })
    }
}

// MARK: --- UNIT TESTS ---
