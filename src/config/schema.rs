use serde::Deserialize;
use std::fmt;

use crate::matching::MatchConfig;

/// Contents of `fuzzpatch.toml`. Every section is optional.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct PatcherConfig {
    pub matching: MatchConfig,
    pub check: CheckConfig,
    pub autofix: AutofixConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CheckConfig {
    /// Shell templates; `{file}` is replaced with the quoted relative path
    pub commands: Vec<String>,
    /// Parse `.rs` files with tree-sitter before running commands
    pub syntax: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            syntax: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AutofixConfig {
    /// Shell templates; `{file}` is replaced with the quoted relative path
    pub commands: Vec<String>,
    /// Ask the attached editor for code-action fixes
    pub lsp: bool,
}

impl Default for AutofixConfig {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            lsp: true,
        }
    }
}

impl PatcherConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        let m = &self.matching;

        for (field, value) in [
            ("matching.similarity_threshold", m.similarity_threshold),
            ("matching.high_confidence_threshold", m.high_confidence_threshold),
            ("matching.acceptance_ratio", m.acceptance_ratio),
            ("matching.whitespace_match_score", m.whitespace_match_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                issues.push(ValidationIssue::OutOfRange {
                    field,
                    value: value.to_string(),
                    expected: "a value between 0.0 and 1.0",
                });
            }
        }

        if m.visibility_margin_divisor == 0 {
            issues.push(ValidationIssue::OutOfRange {
                field: "matching.visibility_margin_divisor",
                value: "0".to_string(),
                expected: "a positive integer",
            });
        }

        if m.whitespace_match_score <= m.high_confidence_threshold {
            issues.push(ValidationIssue::InvalidCombo {
                message: "whitespace_match_score must exceed high_confidence_threshold"
                    .to_string(),
            });
        }

        for (section, commands) in [
            ("check.commands", &self.check.commands),
            ("autofix.commands", &self.autofix.commands),
        ] {
            for (index, command) in commands.iter().enumerate() {
                if command.trim().is_empty() {
                    issues.push(ValidationIssue::EmptyCommand { section, index });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    EmptyCommand {
        section: &'static str,
        index: usize,
    },
    InvalidCombo {
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::OutOfRange {
                field,
                value,
                expected,
            } => write!(f, "'{field}' is {value}, expected {expected}"),
            ValidationIssue::EmptyCommand { section, index } => {
                write!(f, "'{section}' entry {index} is empty")
            }
            ValidationIssue::InvalidCombo { message } => {
                write!(f, "invalid configuration: {message}")
            }
        }
    }
}
