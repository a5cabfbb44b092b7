// src/core/value.rs

//! Scalar values an `Arg` resolves to, and the types it may declare.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete configuration value: what an `Arg` turns into once it is resolved.
///
/// `Null` is a legal default (e.g. an unset seed); it bypasses choice and constraint checks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ConfigValue {
    /// `true` or `false`.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// Free text.
    Str(String),
    /// No value.
    Null,
}

/// The closed set of types an `Arg` can declare.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Parsed as `i64`.
    Int,
    /// Parsed as `f64`; integers are accepted.
    Float,
    /// `true`/`false`, `yes`/`no`, `1`/`0`, case-insensitive.
    Bool,
    /// Taken verbatim.
    Str,
}

impl ConfigValue {
    /// Whether this is [`ConfigValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is one. Floats are not truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats; everything else is not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this (resolved) value selects the table row keyed by `key`.
    ///
    /// Keys loaded from TOML/JSON documents are always strings, so a non-string value
    /// also matches the key holding its textual form (`true` matches `"true"`).
    pub fn matches_key(&self, key: &Self) -> bool {
        match (self, key) {
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                self.as_f64() == key.as_f64()
            }
            (Self::Str(_), Self::Str(_)) => self == key,
            (Self::Str(s), other) | (other, Self::Str(s)) => *s == other.to_string(),
            _ => self == key,
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => write!(f, "{}", s),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for ConfigValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl ValueType {
    /// Parses a raw command-line token into this type.
    pub fn parse(self, raw: &str) -> Option<ConfigValue> {
        let raw = raw.trim();
        match self {
            Self::Int => raw.parse::<i64>().ok().map(ConfigValue::Int),
            Self::Float => raw.parse::<f64>().ok().map(ConfigValue::Float),
            Self::Bool => match raw.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(ConfigValue::Bool(true)),
                "false" | "0" | "no" | "off" => Some(ConfigValue::Bool(false)),
                _ => None,
            },
            Self::Str => Some(ConfigValue::Str(raw.to_string())),
        }
    }

    /// Converts a value coming from a default or a table into this type.
    /// Integers widen to floats and strings are parsed; `Null` always passes.
    pub fn coerce(self, value: ConfigValue) -> Option<ConfigValue> {
        match (self, value) {
            (_, ConfigValue::Null) => Some(ConfigValue::Null),
            (Self::Int, v @ ConfigValue::Int(_)) => Some(v),
            (Self::Float, ConfigValue::Int(i)) => Some(ConfigValue::Float(i as f64)),
            (Self::Float, v @ ConfigValue::Float(_)) => Some(v),
            (Self::Bool, v @ ConfigValue::Bool(_)) => Some(v),
            (Self::Str, v @ ConfigValue::Str(_)) => Some(v),
            (ty, ConfigValue::Str(s)) => ty.parse(&s),
            _ => None,
        }
    }

    /// Placeholder shown in help output, e.g. `--lr <FLOAT>`.
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::Bool => "BOOL",
            Self::Str => "STR",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
        };
        write!(f, "{}", name)
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_type() {
        assert_eq!(ValueType::Int.parse("-5"), Some(ConfigValue::Int(-5)));
        assert_eq!(ValueType::Float.parse("2e-5"), Some(ConfigValue::Float(2e-5)));
        assert_eq!(ValueType::Bool.parse("Yes"), Some(ConfigValue::Bool(true)));
        assert_eq!(ValueType::Int.parse("1.5"), None);
        assert_eq!(ValueType::Bool.parse("maybe"), None);
    }

    #[test]
    fn test_coerce_widens_ints_and_parses_strings() {
        assert_eq!(
            ValueType::Float.coerce(ConfigValue::Int(1)),
            Some(ConfigValue::Float(1.0))
        );
        assert_eq!(
            ValueType::Int.coerce(ConfigValue::from("42")),
            Some(ConfigValue::Int(42))
        );
        assert_eq!(ValueType::Int.coerce(ConfigValue::Float(0.5)), None);
        assert_eq!(ValueType::Str.coerce(ConfigValue::Null), Some(ConfigValue::Null));
    }

    #[test]
    fn test_matches_key_across_representations() {
        assert!(ConfigValue::Bool(true).matches_key(&ConfigValue::from("true")));
        assert!(ConfigValue::Int(3).matches_key(&ConfigValue::Float(3.0)));
        assert!(ConfigValue::from("wikitext").matches_key(&ConfigValue::from("wikitext")));
        assert!(!ConfigValue::from("sst2").matches_key(&ConfigValue::from("mnli")));
        assert!(!ConfigValue::Null.matches_key(&ConfigValue::from("none")));
    }

    #[test]
    fn test_untagged_deserialization() {
        let values: Vec<ConfigValue> =
            serde_json::from_str(r#"[true, 3, 0.25, "bert", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ConfigValue::Bool(true),
                ConfigValue::Int(3),
                ConfigValue::Float(0.25),
                ConfigValue::from("bert"),
                ConfigValue::Null,
            ]
        );
    }
}
