//! Post-apply verification.
//!
//! A check runs against a single touched file. The built-in syntax check
//! parses `.rs` files with tree-sitter; configured shell commands run after it,
//! in order, stopping at the first failure.

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::config::CheckConfig;
use crate::ts::{syntax_errors, TreeSitterError};
use crate::workspace::{expand_file_placeholder, WorkingDir, WorkspaceError};

/// Outcome of running checks on one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub passed: bool,
    /// Combined output of every check that ran
    pub output: String,
}

impl CheckResult {
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            passed: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            passed: false,
            output: output.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("check could not run: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("syntax check could not run: {0}")]
    TreeSitter(#[from] TreeSitterError),
}

/// Verifies a file after it was written.
pub trait CheckRunner {
    fn run(&self, workdir: &dyn WorkingDir, file: &Path) -> Result<CheckResult, CheckError>;
}

/// Built-in syntax check plus shell command templates (`{file}` is replaced
/// with the quoted relative path).
#[derive(Debug, Clone, Default)]
pub struct CommandCheckRunner {
    commands: Vec<String>,
    syntax: bool,
}

impl CommandCheckRunner {
    pub fn new(commands: Vec<String>, syntax: bool) -> Self {
        Self { commands, syntax }
    }

    pub fn from_config(config: &CheckConfig) -> Self {
        Self::new(config.commands.clone(), config.syntax)
    }

    fn syntax_check(
        &self,
        workdir: &dyn WorkingDir,
        file: &Path,
    ) -> Result<Option<String>, CheckError> {
        if !self.syntax || file.extension().and_then(|e| e.to_str()) != Some("rs") {
            return Ok(None);
        }

        let source = workdir.read_file(file)?;
        let errors = syntax_errors(&source)?;
        if errors.is_empty() {
            return Ok(None);
        }

        let positions: Vec<String> = errors
            .iter()
            .map(|e| {
                let what = if e.missing { "missing token" } else { "unexpected input" };
                format!("  {}:{}:{}: {}", file.display(), e.line, e.column, what)
            })
            .collect();
        Ok(Some(format!(
            "syntax error in {}\n{}",
            file.display(),
            positions.join("\n")
        )))
    }
}

impl CheckRunner for CommandCheckRunner {
    fn run(&self, workdir: &dyn WorkingDir, file: &Path) -> Result<CheckResult, CheckError> {
        if let Some(report) = self.syntax_check(workdir, file)? {
            log::info!("{}: syntax check failed", file.display());
            return Ok(CheckResult::failed(report));
        }

        let mut outputs = Vec::new();
        for template in &self.commands {
            let command = expand_file_placeholder(template, file);
            let output = workdir.run_command(&command)?;
            let combined = output.combined();
            if !combined.is_empty() {
                outputs.push(combined);
            }

            if !output.success {
                log::info!("{}: check `{}` failed", file.display(), command);
                return Ok(CheckResult::failed(outputs.join("\n")));
            }
        }

        Ok(CheckResult::passed(outputs.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::LocalWorkspace;

    fn workspace_with(file: &str, content: &str) -> (tempfile::TempDir, LocalWorkspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = LocalWorkspace::new(dir.path()).unwrap();
        ws.write_file(Path::new(file), content).unwrap();
        (dir, ws)
    }

    #[test]
    fn syntax_error_fails_check() {
        let (_dir, ws) = workspace_with("src/lib.rs", "fn main() {\n    let x = ;\n");
        let result = CommandCheckRunner::new(Vec::new(), true)
            .run(&ws, Path::new("src/lib.rs"))
            .unwrap();

        assert!(!result.passed);
        assert!(result.output.starts_with("syntax error"));
        assert!(result.output.contains("src/lib.rs:"));
    }

    #[test]
    fn syntax_check_skips_non_rust_files() {
        let (_dir, ws) = workspace_with("notes.txt", "fn main( {");
        let result = CommandCheckRunner::new(Vec::new(), true)
            .run(&ws, Path::new("notes.txt"))
            .unwrap();
        assert!(result.passed);
    }

    #[test]
    fn disabled_syntax_check_passes_broken_source() {
        let (_dir, ws) = workspace_with("src/lib.rs", "fn main( {");
        let result = CommandCheckRunner::default()
            .run(&ws, Path::new("src/lib.rs"))
            .unwrap();
        assert!(result.passed);
    }

    #[test]
    #[cfg(unix)]
    fn stops_at_first_failing_command() {
        let (dir, ws) = workspace_with("a.txt", "content");
        let runner = CommandCheckRunner::new(
            vec![
                "test -f {file} && echo first".to_string(),
                "echo broken >&2; exit 1".to_string(),
                "touch never-ran".to_string(),
            ],
            false,
        );

        let result = runner.run(&ws, Path::new("a.txt")).unwrap();
        assert!(!result.passed);
        assert_eq!(result.output, "first\nbroken");
        assert!(!dir.path().join("never-ran").exists());
    }

    #[test]
    #[cfg(unix)]
    fn all_commands_passing() {
        let (_dir, ws) = workspace_with("a.txt", "content");
        let runner = CommandCheckRunner::new(vec!["grep -q content {file}".to_string()], true);
        let result = runner.run(&ws, Path::new("a.txt")).unwrap();
        assert_eq!(result, CheckResult::passed(""));
    }
}
