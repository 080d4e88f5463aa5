//! Edit block data model.
//!
//! Edit blocks are produced upstream (from model output) and consumed here
//! unchanged; the orchestrator never mutates the caller's blocks. Line numbers
//! in [`FileRange`] are 1-based and inclusive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::apply::ApplyError;
use crate::autofix::AutofixResult;
use crate::check::CheckResult;

/// Kind of change an edit block requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditType {
    Create,
    Update,
    Append,
    Delete,
}

impl fmt::Display for EditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EditType::Create => "create",
            EditType::Update => "update",
            EditType::Append => "append",
            EditType::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A span of lines in a file, 1-based and inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRange {
    pub file_path: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

impl FileRange {
    pub fn new(file_path: impl Into<PathBuf>, start_line: usize, end_line: usize) -> Self {
        Self {
            file_path: file_path.into(),
            start_line,
            end_line,
        }
    }

    /// Number of lines covered (0 for an inverted range).
    pub fn len(&self) -> usize {
        (self.end_line + 1).saturating_sub(self.start_line)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for FileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}",
            self.file_path.display(),
            self.start_line,
            self.end_line
        )
    }
}

/// A snippet previously shown to the proposer, optionally tied to a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisibleCodeBlock {
    pub file_path: PathBuf,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub code: String,
}

/// A structured change proposal for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditBlock {
    /// Path relative to the working directory
    pub file_path: PathBuf,
    /// Absolute path, used for symbol lookup and editor notification
    #[serde(default)]
    pub absolute_file_path: PathBuf,
    #[serde(default)]
    pub old_lines: Vec<String>,
    #[serde(default)]
    pub new_lines: Vec<String>,
    pub edit_type: EditType,
    /// Reporting only; need not be unique
    #[serde(default)]
    pub sequence_number: u32,
    /// `None` means the whole file was visible; `Some(vec![])` means nothing was.
    #[serde(default)]
    pub visible_file_ranges: Option<Vec<FileRange>>,
    #[serde(default)]
    pub visible_code_blocks: Vec<VisibleCodeBlock>,
}

impl EditBlock {
    /// Build an update block with the whole file visible.
    pub fn update<S: Into<String>>(
        file_path: impl Into<PathBuf>,
        old_lines: impl IntoIterator<Item = S>,
        new_lines: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::with_lines(file_path, EditType::Update, old_lines, new_lines)
    }

    /// Build a create block holding `new_lines` as the full file body.
    pub fn create<S: Into<String>>(
        file_path: impl Into<PathBuf>,
        new_lines: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::with_lines(file_path, EditType::Create, Vec::<S>::new(), new_lines)
    }

    /// Build an append block.
    pub fn append<S: Into<String>>(
        file_path: impl Into<PathBuf>,
        new_lines: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::with_lines(file_path, EditType::Append, Vec::<S>::new(), new_lines)
    }

    /// Build a delete block.
    pub fn delete(file_path: impl Into<PathBuf>) -> Self {
        Self::with_lines(
            file_path,
            EditType::Delete,
            Vec::<String>::new(),
            Vec::<String>::new(),
        )
    }

    fn with_lines<S: Into<String>>(
        file_path: impl Into<PathBuf>,
        edit_type: EditType,
        old_lines: impl IntoIterator<Item = S>,
        new_lines: impl IntoIterator<Item = S>,
    ) -> Self {
        let file_path = file_path.into();
        Self {
            absolute_file_path: file_path.clone(),
            file_path,
            old_lines: old_lines.into_iter().map(Into::into).collect(),
            new_lines: new_lines.into_iter().map(Into::into).collect(),
            edit_type,
            sequence_number: 0,
            visible_file_ranges: None,
            visible_code_blocks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_visible_ranges(mut self, ranges: Vec<FileRange>) -> Self {
        self.visible_file_ranges = Some(ranges);
        self
    }

    #[must_use]
    pub fn with_sequence_number(mut self, sequence_number: u32) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    #[must_use]
    pub fn with_absolute_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.absolute_file_path = path.into();
        self
    }

    #[must_use]
    pub fn with_code_block(mut self, code_block: VisibleCodeBlock) -> Self {
        self.visible_code_blocks.push(code_block);
        self
    }

    /// Whether `path` names this block's file (relative or absolute form).
    pub fn targets(&self, path: &Path) -> bool {
        path == self.file_path || path == self.absolute_file_path
    }
}

/// Outcome of applying one edit block. One report per input block, in input order.
#[derive(Debug, Serialize)]
pub struct ApplyEditBlockReport {
    pub original_edit_block: EditBlock,
    pub did_apply: bool,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<ApplyError>,
    pub autofix_result: Option<AutofixResult>,
    pub autofix_error: Option<String>,
    pub check_result: Option<CheckResult>,
    /// Set when the block applied but could not be staged
    pub stage_error: Option<String>,
    /// Diff of the structural edit, before autofix
    pub initial_diff: String,
    /// Diff after autofix and checks
    pub final_diff: String,
}

impl ApplyEditBlockReport {
    pub(crate) fn new(block: &EditBlock) -> Self {
        Self {
            original_edit_block: block.clone(),
            did_apply: false,
            error: None,
            autofix_result: None,
            autofix_error: None,
            check_result: None,
            stage_error: None,
            initial_diff: String::new(),
            final_diff: String::new(),
        }
    }

    pub(crate) fn failed(block: &EditBlock, error: ApplyError) -> Self {
        let mut report = Self::new(block);
        report.error = Some(error);
        report
    }
}

fn serialize_error<S>(error: &Option<ApplyError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
