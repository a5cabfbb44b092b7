// src/core/cli_input.rs

//! Command-line tokens and which of them have been claimed.

use crate::core::error::{ConfigError, ConfigResult};

/// A single command-line token with its consumption state.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CliToken {
    text: String,
    consumed: bool,
}

/// Holds the process arguments and tracks which ones have been claimed by an `Arg`.
/// Anything left unclaimed at the end of a pass is reported as unexpected.
#[derive(Debug, Clone, Default)]
pub struct CliInput {
    tokens: Vec<CliToken>,
}

enum Claim {
    Inline(String),
    Separate,
}

impl CliInput {
    /// Wraps the given tokens, none of them consumed yet.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = args
            .into_iter()
            .map(|text| CliToken {
                text: text.into(),
                consumed: false,
            })
            .collect();
        Self { tokens }
    }

    /// Splits a whole command line with shell quoting rules.
    pub fn from_command_line(line: &str) -> ConfigResult<Self> {
        let args = shlex::split(line)
            .ok_or_else(|| ConfigError::Tokenize(format!("unbalanced quoting in '{}'", line)))?;
        Ok(Self::new(args))
    }

    /// Claims every `--name value` / `--name=value` occurrence; the last one wins.
    ///
    /// A separate value may itself start with a single dash (negative numbers).
    pub fn consume_value(&mut self, name: &str) -> ConfigResult<Option<String>> {
        let flag = format!("--{}", name);
        let inline_prefix = format!("{}=", flag);
        let mut found = None;
        let mut index = 0;

        while let Some(token) = self.tokens.get(index) {
            let claim = if token.consumed {
                None
            } else if let Some(value) = token.text.strip_prefix(&inline_prefix) {
                Some(Claim::Inline(value.to_string()))
            } else if token.text == flag {
                Some(Claim::Separate)
            } else {
                None
            };

            match claim {
                Some(Claim::Inline(value)) => {
                    self.mark(index);
                    found = Some(value);
                }
                Some(Claim::Separate) => {
                    let value = self
                        .tokens
                        .get(index + 1)
                        .filter(|next| !next.consumed && !next.text.starts_with("--"))
                        .map(|next| next.text.clone())
                        .ok_or_else(|| ConfigError::MissingFlagValue {
                            flag: name.to_string(),
                        })?;
                    self.mark(index);
                    self.mark(index + 1);
                    found = Some(value);
                    index += 1;
                }
                None => {}
            }
            index += 1;
        }

        if let Some(value) = &found {
            log::trace!("Consumed --{} = '{}'", name, value);
        }
        Ok(found)
    }

    /// Claims every bare `--name` occurrence. Returns whether any was present.
    pub fn consume_flag(&mut self, name: &str) -> bool {
        let flag = format!("--{}", name);
        let mut present = false;
        for token in self.tokens.iter_mut().filter(|t| !t.consumed && t.text == flag) {
            token.consumed = true;
            present = true;
        }
        if present {
            log::trace!("Consumed flag --{}", name);
        }
        present
    }

    /// Tokens no `Arg` has claimed, in their original order.
    pub fn unconsumed(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter(|t| !t.consumed)
            .map(|t| t.text.as_str())
            .collect()
    }

    /// Whether every token has been claimed.
    pub fn all_consumed(&self) -> bool {
        self.tokens.iter().all(|t| t.consumed)
    }

    fn mark(&mut self, index: usize) {
        if let Some(token) = self.tokens.get_mut(index) {
            token.consumed = true;
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separate_and_inline_values() {
        let mut input = CliInput::new(["--dataset", "sst2", "--lr=0.1"]);
        assert_eq!(input.consume_value("dataset").unwrap(), Some("sst2".to_string()));
        assert_eq!(input.consume_value("lr").unwrap(), Some("0.1".to_string()));
        assert_eq!(input.consume_value("seed").unwrap(), None);
        assert!(input.all_consumed());
    }

    #[test]
    fn test_last_occurrence_wins() {
        let mut input = CliInput::new(["--seed", "1", "--seed=2", "--seed", "3"]);
        assert_eq!(input.consume_value("seed").unwrap(), Some("3".to_string()));
        assert!(input.all_consumed());
    }

    #[test]
    fn test_negative_numbers_are_values() {
        let mut input = CliInput::new(["--log_every", "-1"]);
        assert_eq!(input.consume_value("log_every").unwrap(), Some("-1".to_string()));
    }

    #[test]
    fn test_missing_value() {
        let mut input = CliInput::new(["--dataset", "--wandb"]);
        assert!(matches!(
            input.consume_value("dataset"),
            Err(ConfigError::MissingFlagValue { .. })
        ));
        let mut input = CliInput::new(["--dataset"]);
        assert!(input.consume_value("dataset").is_err());
    }

    #[test]
    fn test_flags_and_leftovers() {
        let mut input = CliInput::new(["--wandb", "stray", "--wandb", "--unknown"]);
        assert!(input.consume_flag("wandb"));
        assert!(!input.consume_flag("resume"));
        assert_eq!(input.unconsumed(), vec!["stray", "--unknown"]);
    }

    #[test]
    fn test_prefix_names_do_not_collide() {
        let mut input = CliInput::new(["--lr_decay", "0.5"]);
        assert_eq!(input.consume_value("lr").unwrap(), None);
        assert_eq!(input.consume_value("lr_decay").unwrap(), Some("0.5".to_string()));
    }

    #[test]
    fn test_from_command_line_honours_quotes() {
        let mut input =
            CliInput::from_command_line(r#"--project_name "my project" --gpu -1"#).unwrap();
        assert_eq!(
            input.consume_value("project_name").unwrap(),
            Some("my project".to_string())
        );
        assert_eq!(input.consume_value("gpu").unwrap(), Some("-1".to_string()));
        assert!(matches!(
            CliInput::from_command_line("--name \"unterminated"),
            Err(ConfigError::Tokenize(_))
        ));
    }
}
