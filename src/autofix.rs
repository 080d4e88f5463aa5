//! Best-effort automatic fixes after a structural apply.
//!
//! Shell templates run first (every template runs, failures are collected),
//! then the editor's code actions. Nothing here can fail an edit block.

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::config::AutofixConfig;
use crate::editor::EditorBridge;
use crate::workspace::{expand_file_placeholder, WorkingDir};

/// What the autofix pass did to one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutofixResult {
    /// Expanded commands that ran, in order
    pub commands_run: Vec<String>,
    /// Whether editor code actions changed the file
    pub lsp_applied: bool,
    /// Combined command output
    pub output: String,
}

/// Some autofix steps failed. `result` holds what the remaining steps did.
#[derive(Error, Debug, Clone)]
#[error("autofix failed: {}", .failures.join("; "))]
pub struct AutofixError {
    pub result: AutofixResult,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Autofixer {
    commands: Vec<String>,
    lsp: bool,
}

impl Autofixer {
    pub fn new(commands: Vec<String>, lsp: bool) -> Self {
        Self { commands, lsp }
    }

    pub fn from_config(config: &AutofixConfig) -> Self {
        Self::new(config.commands.clone(), config.lsp)
    }

    /// Run every autofix step for `file` (relative to `workdir`).
    pub fn run(
        &self,
        workdir: &dyn WorkingDir,
        editor: &dyn EditorBridge,
        file: &Path,
    ) -> Result<AutofixResult, AutofixError> {
        let mut result = AutofixResult::default();
        let mut failures = Vec::new();
        let mut outputs = Vec::new();

        for template in &self.commands {
            let command = expand_file_placeholder(template, file);
            match workdir.run_command(&command) {
                Ok(output) => {
                    let combined = output.combined();
                    if !output.success {
                        failures.push(format!("`{command}` exited unsuccessfully: {combined}"));
                    }
                    if !combined.is_empty() {
                        outputs.push(combined);
                    }
                }
                Err(e) => failures.push(e.to_string()),
            }
            result.commands_run.push(command);
        }

        if self.lsp {
            match editor.apply_code_actions(&workdir.resolve(file)) {
                Ok(applied) => result.lsp_applied = applied,
                Err(e) => failures.push(e.to_string()),
            }
        }

        result.output = outputs.join("\n");
        if failures.is_empty() {
            Ok(result)
        } else {
            log::warn!("{}: {} autofix step(s) failed", file.display(), failures.len());
            Err(AutofixError { result, failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{EditorError, NoopEditor};
    use crate::workspace::LocalWorkspace;
    use std::cell::RefCell;
    use std::path::PathBuf;

    struct RecordingEditor {
        seen: RefCell<Vec<PathBuf>>,
        fail: bool,
    }

    impl EditorBridge for RecordingEditor {
        fn apply_code_actions(&self, path: &Path) -> Result<bool, EditorError> {
            self.seen.borrow_mut().push(path.to_path_buf());
            if self.fail {
                Err(EditorError::Unavailable("server exited".to_string()))
            } else {
                Ok(true)
            }
        }

        fn notify_saved(&self, _: &Path) -> Result<(), EditorError> {
            Ok(())
        }
    }

    #[test]
    fn editor_receives_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let ws = LocalWorkspace::new(dir.path()).unwrap();
        let editor = RecordingEditor {
            seen: RefCell::new(Vec::new()),
            fail: false,
        };

        let result = Autofixer::new(Vec::new(), true)
            .run(&ws, &editor, Path::new("src/lib.rs"))
            .unwrap();
        assert!(result.lsp_applied);
        assert_eq!(editor.seen.borrow()[0], ws.root().join("src/lib.rs"));
    }

    #[test]
    fn lsp_disabled_skips_editor() {
        let dir = tempfile::tempdir().unwrap();
        let ws = LocalWorkspace::new(dir.path()).unwrap();
        let editor = RecordingEditor {
            seen: RefCell::new(Vec::new()),
            fail: true,
        };

        let result = Autofixer::new(Vec::new(), false)
            .run(&ws, &editor, Path::new("a.rs"))
            .unwrap();
        assert_eq!(result, AutofixResult::default());
        assert!(editor.seen.borrow().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn failing_command_does_not_stop_later_steps() {
        let dir = tempfile::tempdir().unwrap();
        let ws = LocalWorkspace::new(dir.path()).unwrap();
        ws.write_file(Path::new("a.txt"), "x").unwrap();

        let fixer = Autofixer::new(
            vec!["exit 2".to_string(), "echo fixed > {file}".to_string()],
            true,
        );
        let err = fixer.run(&ws, &NoopEditor, Path::new("a.txt")).unwrap_err();

        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.result.commands_run.len(), 2);
        assert_eq!(ws.read_file(Path::new("a.txt")).unwrap(), "fixed\n");
    }
}
