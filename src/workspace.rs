//! Working-directory abstraction: file I/O and command execution relative to
//! a root.
//!
//! The orchestrator only talks to [`WorkingDir`]; [`LocalWorkspace`] is the
//! on-disk implementation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::safety::{SafetyError, WorkspaceGuard};

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run `{command}`: {source}")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        WorkspaceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Captured result of a shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr, skipping empty streams.
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

/// File access and command execution relative to a working directory.
///
/// Paths passed in are relative to [`WorkingDir::root`].
pub trait WorkingDir {
    fn root(&self) -> &Path;

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root().join(path)
    }

    fn exists(&self, path: &Path) -> bool;

    fn dir_exists(&self, path: &Path) -> bool;

    fn read_file(&self, path: &Path) -> Result<String, WorkspaceError>;

    /// Write the whole file, creating parent directories as needed.
    fn write_file(&self, path: &Path, content: &str) -> Result<(), WorkspaceError>;

    fn remove_file(&self, path: &Path) -> Result<(), WorkspaceError>;

    /// Remove an empty directory.
    fn remove_dir(&self, path: &Path) -> Result<(), WorkspaceError>;

    /// Run a shell command with the root as the current directory.
    fn run_command(&self, command: &str) -> Result<CommandOutput, WorkspaceError>;
}

/// A working directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    guard: WorkspaceGuard,
}

impl LocalWorkspace {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        Ok(Self {
            guard: WorkspaceGuard::new(root)?,
        })
    }
}

impl WorkingDir for LocalWorkspace {
    fn root(&self) -> &Path {
        self.guard.root()
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).is_file()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        self.resolve(path).is_dir()
    }

    fn read_file(&self, path: &Path) -> Result<String, WorkspaceError> {
        if !self.exists(path) {
            return Err(WorkspaceError::NotFound(path.to_path_buf()));
        }
        let canonical = self.guard.validate_path(path)?;
        std::fs::read_to_string(&canonical).map_err(|e| WorkspaceError::io(path, e))
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), WorkspaceError> {
        let target = self.guard.validate_new_path(path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WorkspaceError::io(parent, e))?;
        }

        atomic_write(&target, content.as_bytes()).map_err(|e| WorkspaceError::io(path, e))?;

        // Bump mtime so incremental build tools see the change.
        filetime::set_file_mtime(&target, filetime::FileTime::now())
            .map_err(|e| WorkspaceError::io(path, e))?;
        log::debug!("wrote {} ({} bytes)", path.display(), content.len());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), WorkspaceError> {
        if !self.exists(path) {
            return Err(WorkspaceError::NotFound(path.to_path_buf()));
        }
        let canonical = self.guard.validate_path(path)?;
        std::fs::remove_file(&canonical).map_err(|e| WorkspaceError::io(path, e))
    }

    fn remove_dir(&self, path: &Path) -> Result<(), WorkspaceError> {
        let canonical = self.guard.validate_path(path)?;
        std::fs::remove_dir(&canonical).map_err(|e| WorkspaceError::io(path, e))
    }

    fn run_command(&self, command: &str) -> Result<CommandOutput, WorkspaceError> {
        log::debug!("running `{}` in {}", command, self.root().display());

        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C");
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c");
            cmd
        };
        let output = cmd
            .arg(command)
            .current_dir(self.root())
            .output()
            .map_err(|source| WorkspaceError::Command {
                command: command.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Reads through to a base working directory; writes and removals stay in
/// memory. Commands are refused.
pub struct OverlayWorkspace<'a> {
    base: &'a dyn WorkingDir,
    /// `None` marks a removed file
    changes: RefCell<HashMap<PathBuf, Option<String>>>,
}

impl<'a> OverlayWorkspace<'a> {
    pub fn new(base: &'a dyn WorkingDir) -> Self {
        Self {
            base,
            changes: RefCell::new(HashMap::new()),
        }
    }

    /// Paths written or removed so far, sorted.
    pub fn changed_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.changes.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl WorkingDir for OverlayWorkspace<'_> {
    fn root(&self) -> &Path {
        self.base.root()
    }

    fn exists(&self, path: &Path) -> bool {
        match self.changes.borrow().get(path) {
            Some(change) => change.is_some(),
            None => self.base.exists(path),
        }
    }

    fn dir_exists(&self, path: &Path) -> bool {
        self.base.dir_exists(path)
    }

    fn read_file(&self, path: &Path) -> Result<String, WorkspaceError> {
        match self.changes.borrow().get(path) {
            Some(Some(content)) => Ok(content.clone()),
            Some(None) => Err(WorkspaceError::NotFound(path.to_path_buf())),
            None => self.base.read_file(path),
        }
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), WorkspaceError> {
        self.changes
            .borrow_mut()
            .insert(path.to_path_buf(), Some(content.to_string()));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), WorkspaceError> {
        if !self.exists(path) {
            return Err(WorkspaceError::NotFound(path.to_path_buf()));
        }
        self.changes.borrow_mut().insert(path.to_path_buf(), None);
        Ok(())
    }

    // Overlay writes never create directories.
    fn remove_dir(&self, _: &Path) -> Result<(), WorkspaceError> {
        Ok(())
    }

    fn run_command(&self, command: &str) -> Result<CommandOutput, WorkspaceError> {
        Err(WorkspaceError::Command {
            command: command.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "commands do not run against an in-memory overlay",
            ),
        })
    }
}

/// Substitute every `{file}` in a command template with the shell-quoted path.
pub fn expand_file_placeholder(template: &str, path: &Path) -> String {
    template.replace("{file}", &shell_quote(&path.to_string_lossy()))
}

fn shell_quote(value: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Tempfile in the same directory, fsync, then rename over `path`.
///
/// Either the full write lands or nothing changes. Existing permissions are
/// carried over.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = std::fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
