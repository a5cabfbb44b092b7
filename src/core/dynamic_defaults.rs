// src/core/dynamic_defaults.rs

//! # Dynamic Defaults
//!
//! Tables that pick the default of an `Arg` from the resolved value of another field
//! (the *pivot*). Two encodings exist and both normalize to [`DynamicDefaults`]:
//!
//! - **flat**, attached to a single `Arg`: `{dynamic_default_field: "dataset", mnist: 128, sst2: 16}`
//! - **shared**, keyed by pivot value: `{dynamic_default_field: "dataset", mnist: {batch_size: 128, lr: 0.01}}`
//!
//! Shared tables are distributed to every `Arg` named in one of their rows, either explicitly
//! through [`crate::core::arg::Arg::dynamic_defaults_from`] or by the parser's pivot pass.
//! Flat rows name no `Arg`, so only the explicit route accepts them.

use crate::constants::DYNAMIC_DEFAULT_FIELD_KEY;
use crate::core::error::{ConfigError, ConfigResult};
use crate::core::value::ConfigValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Builds a record for [`DefaultsTable::row`] out of heterogeneous literals.
///
/// ```
/// use argtree::record;
/// let row = record! { "batch_size" => 128, "lr" => 1e-2, "model" => "simple" };
/// assert_eq!(row.len(), 3);
/// ```
#[macro_export]
macro_rules! record {
    ($($name:expr => $value:expr),* $(,)?) => {
        vec![$((::std::string::String::from($name), $crate::core::value::ConfigValue::from($value))),*]
    };
}

// --- DATA STRUCTS ---

/// Per-`Arg` lookup from pivot value to default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicDefaults {
    field: String,
    entries: Vec<(ConfigValue, ConfigValue)>,
}

/// One row of a shared table: either a record of `arg name -> value` or a bare value
/// (the flat encoding, applying to whichever `Arg` the table is attached to).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableRow {
    /// Defaults for several `Arg`s, by name.
    Record(IndexMap<String, ConfigValue>),
    /// A single default for the attached `Arg`.
    Value(ConfigValue),
}

/// A table `pivot value -> row`, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultsTable {
    rows: Vec<(ConfigValue, TableRow)>,
}

/// A [`DefaultsTable`] together with the name of the field it is keyed on.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedDefaults {
    field: String,
    table: DefaultsTable,
}

// --- IMPLEMENTATIONS ---

impl DynamicDefaults {
    /// Empty lookup keyed on `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            entries: Vec::new(),
        }
    }

    /// Flat encoding built from `(pivot value, default)` pairs.
    pub fn flat<K, V, I>(field: impl Into<String>, entries: I) -> Self
    where
        K: Into<ConfigValue>,
        V: Into<ConfigValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut defaults = Self::new(field);
        for (key, value) in entries {
            defaults.push(key.into(), value.into());
        }
        defaults
    }

    /// Adds one `(pivot value, default)` pair. An already keyed pivot value keeps its first default.
    pub fn entry(mut self, key: impl Into<ConfigValue>, value: impl Into<ConfigValue>) -> Self {
        self.push(key.into(), value.into());
        self
    }

    /// Name of the field whose resolved value selects the default.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The pairs in registration order.
    pub fn entries(&self) -> &[(ConfigValue, ConfigValue)] {
        &self.entries
    }

    /// Whether no pair is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The default registered for `pivot`. `None` means the caller falls back to the
    /// standard default.
    pub fn lookup(&self, pivot: &ConfigValue) -> Option<&ConfigValue> {
        self.entries
            .iter()
            .find(|(key, _)| pivot.matches_key(key))
            .map(|(_, value)| value)
    }

    /// Appends the entries of `other` that are not already keyed here.
    /// Returns `false` (and leaves `self` untouched) when both are keyed on different fields.
    pub fn merge(&mut self, other: &Self) -> bool {
        if self.field != other.field {
            return false;
        }
        for (key, value) in &other.entries {
            if !self.entries.iter().any(|(existing, _)| existing.matches_key(key)) {
                self.entries.push((key.clone(), value.clone()));
            }
        }
        true
    }

    fn push(&mut self, key: ConfigValue, value: ConfigValue) {
        // First registration wins, like a lookup would.
        if !self.entries.iter().any(|(existing, _)| existing.matches_key(&key)) {
            self.entries.push((key, value));
        }
    }
}

impl DefaultsTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shared row: every `(arg name, value)` pair applies when the pivot equals `key`.
    pub fn row<I, N>(mut self, key: impl Into<ConfigValue>, values: I) -> Self
    where
        I: IntoIterator<Item = (N, ConfigValue)>,
        N: Into<String>,
    {
        let record = values.into_iter().map(|(n, v)| (n.into(), v)).collect();
        self.rows.push((key.into(), TableRow::Record(record)));
        self
    }

    /// Adds a flat row.
    pub fn value(mut self, key: impl Into<ConfigValue>, value: impl Into<ConfigValue>) -> Self {
        self.rows.push((key.into(), TableRow::Value(value.into())));
        self
    }

    /// The rows in declaration order.
    pub fn rows(&self) -> &[(ConfigValue, TableRow)] {
        &self.rows
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every `Arg` name mentioned by a record row, in first-seen order.
    pub fn arg_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (_, row) in &self.rows {
            if let TableRow::Record(record) = row {
                for name in record.keys() {
                    if !names.contains(&name.as_str()) {
                        names.push(name);
                    }
                }
            }
        }
        names
    }

    /// Whether any row uses the flat encoding.
    pub fn has_flat_rows(&self) -> bool {
        self.rows.iter().any(|(_, row)| matches!(row, TableRow::Value(_)))
    }

    /// Column of `arg_name` taken from record rows only. Flat rows carry no `Arg` name and are
    /// skipped.
    pub fn record_column(&self, field: &str, arg_name: &str) -> Option<DynamicDefaults> {
        let mut defaults = DynamicDefaults::new(field);
        for (key, row) in &self.rows {
            if let TableRow::Record(record) = row
                && let Some(value) = record.get(arg_name)
            {
                defaults.push(key.clone(), value.clone());
            }
        }
        (!defaults.is_empty()).then_some(defaults)
    }

    /// Projects the table onto one `Arg` it is attached to. Flat rows always apply; record
    /// rows apply when they name `arg_name`. `None` when no row concerns it.
    pub fn for_arg(&self, field: &str, arg_name: &str) -> Option<DynamicDefaults> {
        let mut defaults = DynamicDefaults::new(field);
        for (key, row) in &self.rows {
            let value = match row {
                TableRow::Record(record) => record.get(arg_name),
                TableRow::Value(value) => Some(value),
            };
            if let Some(value) = value {
                defaults.push(key.clone(), value.clone());
            }
        }
        (!defaults.is_empty()).then_some(defaults)
    }
}

impl KeyedDefaults {
    /// Empty table keyed on `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            table: DefaultsTable::new(),
        }
    }

    /// Keys an existing table on `field`.
    pub fn with_table(field: impl Into<String>, table: DefaultsTable) -> Self {
        Self {
            field: field.into(),
            table,
        }
    }

    /// See [`DefaultsTable::row`].
    pub fn row<I, N>(mut self, key: impl Into<ConfigValue>, values: I) -> Self
    where
        I: IntoIterator<Item = (N, ConfigValue)>,
        N: Into<String>,
    {
        self.table = self.table.row(key, values);
        self
    }

    /// See [`DefaultsTable::value`].
    pub fn value(mut self, key: impl Into<ConfigValue>, value: impl Into<ConfigValue>) -> Self {
        self.table = self.table.value(key, value);
        self
    }

    /// Name of the pivot field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The rows.
    pub fn table(&self) -> &DefaultsTable {
        &self.table
    }

    /// See [`DefaultsTable::for_arg`].
    pub fn for_arg(&self, arg_name: &str) -> Option<DynamicDefaults> {
        self.table.for_arg(&self.field, arg_name)
    }

    /// See [`DefaultsTable::record_column`].
    pub fn record_column(&self, arg_name: &str) -> Option<DynamicDefaults> {
        self.table.record_column(&self.field, arg_name)
    }

    // MARK: Loading

    /// Parses a TOML document holding the pivot key and one entry per pivot value.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::from_toml_str_with_origin(content, "<toml>")
    }

    /// Same as [`Self::from_toml_str`] for a JSON object.
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        Self::from_json_str_with_origin(content, "<json>")
    }

    /// Loads a table from disk. A `.json` extension selects JSON, anything else is read as TOML.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        log::debug!("Loading defaults table from '{}'", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = path.display().to_string();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str_with_origin(&content, &origin)
        } else {
            Self::from_toml_str_with_origin(&content, &origin)
        }
    }

    fn from_toml_str_with_origin(content: &str, origin: &str) -> ConfigResult<Self> {
        let document: IndexMap<String, TableRow> =
            toml::from_str(content).map_err(|e| ConfigError::TableFormat {
                origin: origin.to_string(),
                message: e.to_string(),
            })?;
        Self::from_document(document, origin)
    }

    fn from_json_str_with_origin(content: &str, origin: &str) -> ConfigResult<Self> {
        let document: IndexMap<String, TableRow> =
            serde_json::from_str(content).map_err(|e| ConfigError::TableFormat {
                origin: origin.to_string(),
                message: e.to_string(),
            })?;
        Self::from_document(document, origin)
    }

    fn from_document(mut document: IndexMap<String, TableRow>, origin: &str) -> ConfigResult<Self> {
        let field = match document.shift_remove(DYNAMIC_DEFAULT_FIELD_KEY) {
            Some(TableRow::Value(ConfigValue::Str(field))) if !field.is_empty() => field,
            Some(_) => {
                return Err(ConfigError::TableFormat {
                    origin: origin.to_string(),
                    message: format!("'{}' must be a non-empty string", DYNAMIC_DEFAULT_FIELD_KEY),
                });
            }
            None => {
                return Err(ConfigError::TableFormat {
                    origin: origin.to_string(),
                    message: format!("missing the '{}' key", DYNAMIC_DEFAULT_FIELD_KEY),
                });
            }
        };

        let rows = document
            .into_iter()
            .map(|(key, row)| (ConfigValue::Str(key), row))
            .collect();
        log::debug!("Defaults table from {} is keyed on '{}'", origin, field);
        Ok(Self::with_table(field, DefaultsTable { rows }))
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn dataset_table() -> KeyedDefaults {
        KeyedDefaults::new("dataset")
            .row("mnist", record! { "batch_size" => 128, "lr" => 1e-2 })
            .row("sst2", record! { "batch_size" => 16, "model" => "bert" })
    }

    #[test]
    fn test_record_column_skips_flat_rows() {
        let mixed = KeyedDefaults::new("dataset")
            .value("mnist", 128)
            .row("sst2", record! { "batch_size" => 16 });
        assert!(mixed.table().has_flat_rows());
        assert!(!dataset_table().table().has_flat_rows());

        let column = mixed.record_column("batch_size").unwrap();
        assert_eq!(column.entries().len(), 1);
        assert_eq!(column.lookup(&ConfigValue::from("mnist")), None);
        assert!(mixed.record_column("model").is_none());

        // Attached to a single `Arg`, the flat row applies as well.
        assert_eq!(mixed.for_arg("model").map(|c| c.entries().len()), Some(1));
        assert_eq!(mixed.for_arg("batch_size").map(|c| c.entries().len()), Some(2));
    }

    #[test]
    fn test_flat_lookup_and_fallthrough() {
        let defaults = DynamicDefaults::flat("dataset", [("mnist", 128), ("sst2", 16)]);
        assert_eq!(defaults.field(), "dataset");
        assert_eq!(
            defaults.lookup(&ConfigValue::from("sst2")),
            Some(&ConfigValue::Int(16))
        );
        assert_eq!(defaults.lookup(&ConfigValue::from("cifar10")), None);
    }

    #[test]
    fn test_shared_table_projects_onto_args() {
        let table = dataset_table();
        let batch = table.for_arg("batch_size").unwrap();
        assert_eq!(batch.entries().len(), 2);
        assert_eq!(batch.lookup(&ConfigValue::from("mnist")), Some(&ConfigValue::Int(128)));

        let model = table.for_arg("model").unwrap();
        assert_eq!(model.lookup(&ConfigValue::from("mnist")), None);
        assert_eq!(
            model.lookup(&ConfigValue::from("sst2")),
            Some(&ConfigValue::from("bert"))
        );

        assert!(table.for_arg("dropout").is_none());
        assert_eq!(table.table().arg_names(), vec!["batch_size", "lr", "model"]);
    }

    #[test]
    fn test_flat_and_shared_encodings_agree() {
        let flat = DynamicDefaults::flat("dataset", [("mnist", 128), ("sst2", 16)]);
        let shared = dataset_table().for_arg("batch_size").unwrap();
        assert_eq!(flat, shared);
    }

    #[test]
    fn test_merge_keeps_existing_entries() {
        let mut own = DynamicDefaults::new("dataset").entry("mnist", 64);
        let other = DynamicDefaults::flat("dataset", [("mnist", 128), ("sst2", 16)]);
        assert!(own.merge(&other));
        assert_eq!(own.lookup(&ConfigValue::from("mnist")), Some(&ConfigValue::Int(64)));
        assert_eq!(own.lookup(&ConfigValue::from("sst2")), Some(&ConfigValue::Int(16)));

        let unrelated = DynamicDefaults::flat("scheduler", [("linear", "batch")]);
        assert!(!own.merge(&unrelated));
    }

    #[test]
    fn test_from_toml_str() {
        let content = r#"
dynamic_default_field = "dataset"

[mnist]
batch_size = 128
lr = 0.01

[wikitext]
batch_size = 4
model = "gptbase"
"#;
        let table = KeyedDefaults::from_toml_str(content).unwrap();
        assert_eq!(table.field(), "dataset");
        let batch = table.for_arg("batch_size").unwrap();
        assert_eq!(batch.lookup(&ConfigValue::from("wikitext")), Some(&ConfigValue::Int(4)));
    }

    #[test]
    fn test_from_json_str_flat_encoding() {
        let content = r#"{"dynamic_default_field": "scheduler", "one_cycle": "batch", "reduce_lr_on_plateau": "epoch"}"#;
        let table = KeyedDefaults::from_json_str(content).unwrap();
        let step = table.for_arg("scheduler_step_every").unwrap();
        assert_eq!(
            step.lookup(&ConfigValue::from("reduce_lr_on_plateau")),
            Some(&ConfigValue::from("epoch"))
        );
    }

    #[test]
    fn test_missing_pivot_key_is_rejected() {
        let err = KeyedDefaults::from_json_str(r#"{"mnist": {"lr": 0.1}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::TableFormat { .. }));

        let err = KeyedDefaults::from_json_str(r#"{"dynamic_default_field": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::TableFormat { .. }));
    }

    #[test]
    fn test_load_from_disk_selects_format_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"dynamic_default_field": "dataset", "mnist": {{"n_epochs": 50}}}}"#
        )
        .unwrap();
        let table = KeyedDefaults::load(file.path()).unwrap();
        assert_eq!(table.field(), "dataset");
        assert!(table.for_arg("n_epochs").is_some());

        let missing = KeyedDefaults::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
