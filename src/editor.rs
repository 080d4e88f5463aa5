//! Bridge to a live editor or language server.
//!
//! Both operations are best effort: callers record or log failures and carry
//! on.

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("editor unavailable: {0}")]
    Unavailable(String),
}

pub trait EditorBridge {
    /// Apply the server's automatic fixes (code actions) to `absolute_path`.
    /// Returns whether anything changed.
    fn apply_code_actions(&self, absolute_path: &Path) -> Result<bool, EditorError>;

    /// Tell open views that `absolute_path` changed on disk.
    fn notify_saved(&self, absolute_path: &Path) -> Result<(), EditorError>;
}

/// No editor attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEditor;

impl EditorBridge for NoopEditor {
    fn apply_code_actions(&self, _: &Path) -> Result<bool, EditorError> {
        Ok(false)
    }

    fn notify_saved(&self, _: &Path) -> Result<(), EditorError> {
        Ok(())
    }
}
