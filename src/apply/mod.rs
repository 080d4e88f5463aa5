//! Apply a batch of edit blocks to a working directory.
//!
//! Blocks are processed strictly in input order, one report per block. A
//! failing block never stops the batch. Same-file blocks see the content left
//! by earlier ones, and their declared visible ranges are translated through
//! the line shifts of every earlier successful edit to that file.
//!
//! Per block: structural apply, best-effort autofix, then (when checks are
//! enabled) check, followed by stage on success or restore on failure.

mod hint;

pub use hint::failure_hint;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::autofix::Autofixer;
use crate::block::{ApplyEditBlockReport, EditBlock, EditType, FileRange};
use crate::check::{CheckResult, CheckRunner};
use crate::diff::{line_hunks, unified_diff, LineHunk};
use crate::editor::{EditorBridge, NoopEditor};
use crate::matching::MatchConfig;
use crate::rewrite::{append_content, create_content, rewrite_content, RewriteError};
use crate::vcs::Vcs;
use crate::visibility::{translate_ranges, visible_spans, NoSymbols, SymbolLookup};
use crate::workspace::{WorkingDir, WorkspaceError};

#[derive(Error, Debug)]
pub enum ApplyError {
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("cannot create {0}: file already exists")]
    AlreadyExists(PathBuf),

    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to access {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: WorkspaceError,
    },

    #[error("checks failed for {path}; the edit was reverted\n{output}\nhint: {hint}")]
    CheckFailed {
        path: PathBuf,
        output: String,
        hint: String,
    },

    #[error("checks failed for {path} and restoring it also failed: {restore_error}\ncheck output:\n{check_output}")]
    RestoreFailed {
        path: PathBuf,
        check_output: String,
        restore_error: String,
    },
}

impl ApplyError {
    fn workspace(path: &Path, source: WorkspaceError) -> Self {
        match source {
            WorkspaceError::NotFound(_) => ApplyError::NotFound(path.to_path_buf()),
            source => ApplyError::Workspace {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Collaborators and settings for one batch.
pub struct ApplyContext<'a> {
    workdir: &'a dyn WorkingDir,
    vcs: &'a dyn Vcs,
    checks: &'a dyn CheckRunner,
    editor: &'a dyn EditorBridge,
    symbols: &'a dyn SymbolLookup,
    autofixer: Autofixer,
    matching: MatchConfig,
}

impl<'a> ApplyContext<'a> {
    /// Context with no editor, no symbol lookup, no autofix commands and
    /// default matching thresholds.
    pub fn new(workdir: &'a dyn WorkingDir, vcs: &'a dyn Vcs, checks: &'a dyn CheckRunner) -> Self {
        Self {
            workdir,
            vcs,
            checks,
            editor: &NoopEditor,
            symbols: &NoSymbols,
            autofixer: Autofixer::default(),
            matching: MatchConfig::default(),
        }
    }

    #[must_use]
    pub fn with_editor(mut self, editor: &'a dyn EditorBridge) -> Self {
        self.editor = editor;
        self
    }

    #[must_use]
    pub fn with_symbols(mut self, symbols: &'a dyn SymbolLookup) -> Self {
        self.symbols = symbols;
        self
    }

    #[must_use]
    pub fn with_autofixer(mut self, autofixer: Autofixer) -> Self {
        self.autofixer = autofixer;
        self
    }

    #[must_use]
    pub fn with_matching(mut self, matching: MatchConfig) -> Self {
        self.matching = matching;
        self
    }
}

/// Line hunks of every successful edit so far, per file, in apply order.
type ShiftHistory = HashMap<PathBuf, Vec<Vec<LineHunk>>>;

/// Apply `blocks` in order. Returns one report per block, in the same order.
pub fn apply_edit_blocks(
    ctx: &ApplyContext<'_>,
    blocks: &[EditBlock],
    run_checks: bool,
) -> Vec<ApplyEditBlockReport> {
    let mut history = ShiftHistory::new();

    blocks
        .iter()
        .map(|block| {
            let report = apply_block(ctx, block, run_checks, &mut history);
            match &report.error {
                None => log::info!(
                    "block #{} ({} {}) applied",
                    block.sequence_number,
                    block.edit_type,
                    block.file_path.display()
                ),
                Some(e) => log::info!(
                    "block #{} ({} {}) failed: {}",
                    block.sequence_number,
                    block.edit_type,
                    block.file_path.display(),
                    e
                ),
            }
            report
        })
        .collect()
}

fn apply_block(
    ctx: &ApplyContext<'_>,
    block: &EditBlock,
    run_checks: bool,
    history: &mut ShiftHistory,
) -> ApplyEditBlockReport {
    let path = block.file_path.as_path();

    let prepared = match block.edit_type {
        EditType::Delete => return delete_block(ctx, block, run_checks, history),
        EditType::Create => prepare_create(ctx, block),
        EditType::Update => prepare_update(ctx, block, history),
        EditType::Append => prepare_append(ctx, block),
    };
    let created_dirs = match block.edit_type {
        EditType::Create => missing_parents(ctx.workdir, path),
        _ => Vec::new(),
    };
    let written = prepared.and_then(|(original, content)| {
        ctx.workdir
            .write_file(path, &content)
            .map_err(|e| ApplyError::workspace(path, e))?;
        Ok((original, content))
    });
    let (original, written) = match written {
        Ok(result) => result,
        Err(e) => return ApplyEditBlockReport::failed(block, e),
    };

    let mut report = ApplyEditBlockReport::new(block);
    report.did_apply = true;
    report.initial_diff = unified_diff(path, original.as_deref().unwrap_or(""), path, &written);

    match ctx.autofixer.run(ctx.workdir, ctx.editor, path) {
        Ok(result) => report.autofix_result = Some(result),
        Err(e) => {
            report.autofix_error = Some(e.to_string());
            report.autofix_result = Some(e.result);
        }
    }

    let current = ctx.workdir.read_file(path).unwrap_or_else(|e| {
        log::warn!("{}: re-read after autofix failed: {}", path.display(), e);
        written.clone()
    });

    if run_checks {
        let check = ctx.checks.run(ctx.workdir, path).unwrap_or_else(|e| {
            log::warn!("{}: checks could not run: {}", path.display(), e);
            CheckResult::failed(e.to_string())
        });
        let passed = check.passed;
        let output = check.output.clone();
        report.check_result = Some(check);

        if !passed {
            report.did_apply = false;
            report.error = Some(match restore(ctx, path, original.as_deref(), &created_dirs) {
                Ok(()) => ApplyError::CheckFailed {
                    path: path.to_path_buf(),
                    hint: failure_hint(block, &output),
                    output,
                },
                Err(restore_error) => ApplyError::RestoreFailed {
                    path: path.to_path_buf(),
                    check_output: output,
                    restore_error,
                },
            });
            return report;
        }

        if let Err(e) = ctx.vcs.stage(path) {
            log::warn!("{}: staging failed: {}", path.display(), e);
            report.stage_error = Some(e.to_string());
        }
    }

    report.final_diff = unified_diff(path, original.as_deref().unwrap_or(""), path, &current);

    match &original {
        Some(before) => history
            .entry(block.file_path.clone())
            .or_default()
            .push(line_hunks(before, &current)),
        // Ranges declared against a file that did not exist mean nothing.
        None => {
            history.remove(&block.file_path);
        }
    }

    if let Err(e) = ctx.editor.notify_saved(&absolute_path(ctx, block)) {
        log::warn!("{}: editor notification failed: {}", path.display(), e);
    }

    report
}

/// Pre-edit content (`None` for a new file) and the content to write.
type Prepared = (Option<String>, String);

fn prepare_create(ctx: &ApplyContext<'_>, block: &EditBlock) -> Result<Prepared, ApplyError> {
    if ctx.workdir.exists(&block.file_path) {
        return Err(ApplyError::AlreadyExists(block.file_path.clone()));
    }
    Ok((None, create_content(&block.new_lines)))
}

fn prepare_update(
    ctx: &ApplyContext<'_>,
    block: &EditBlock,
    history: &ShiftHistory,
) -> Result<Prepared, ApplyError> {
    let path = block.file_path.as_path();
    let original = ctx
        .workdir
        .read_file(path)
        .map_err(|e| ApplyError::workspace(path, e))?;

    let ranges = block
        .visible_file_ranges
        .as_deref()
        .map(|ranges| translated_ranges(block, ranges, history));
    let located = EditBlock {
        absolute_file_path: absolute_path(ctx, block),
        ..block.clone()
    };
    let visible = visible_spans(&located, ranges.as_deref(), ctx.symbols);

    let content = rewrite_content(block, &original, visible.as_deref(), &ctx.matching)?;
    Ok((Some(original), content))
}

fn prepare_append(ctx: &ApplyContext<'_>, block: &EditBlock) -> Result<Prepared, ApplyError> {
    let path = block.file_path.as_path();
    let original = ctx
        .workdir
        .read_file(path)
        .map_err(|e| ApplyError::workspace(path, e))?;
    let content = append_content(&original, &block.new_lines);
    Ok((Some(original), content))
}

/// Declared ranges for this block's file, shifted through earlier edits.
fn translated_ranges(block: &EditBlock, ranges: &[FileRange], history: &ShiftHistory) -> Vec<FileRange> {
    let own: Vec<FileRange> = ranges
        .iter()
        .filter(|r| block.targets(&r.file_path))
        .cloned()
        .collect();

    match history.get(&block.file_path) {
        Some(shifts) => translate_ranges(&own, shifts),
        None => own,
    }
}

fn delete_block(
    ctx: &ApplyContext<'_>,
    block: &EditBlock,
    run_checks: bool,
    history: &mut ShiftHistory,
) -> ApplyEditBlockReport {
    let path = block.file_path.as_path();

    let original = match ctx.workdir.read_file(path) {
        Ok(content) => content,
        Err(e) => return ApplyEditBlockReport::failed(block, ApplyError::workspace(path, e)),
    };
    if let Err(e) = ctx.workdir.remove_file(path) {
        return ApplyEditBlockReport::failed(block, ApplyError::workspace(path, e));
    }
    if let Err(e) = ctx.editor.notify_saved(&absolute_path(ctx, block)) {
        log::warn!("{}: editor notification failed: {}", path.display(), e);
    }

    let mut report = ApplyEditBlockReport::new(block);
    report.did_apply = true;
    report.initial_diff = unified_diff(path, &original, path, "");
    report.final_diff = report.initial_diff.clone();
    history.remove(&block.file_path);

    if run_checks {
        if let Err(e) = ctx.vcs.stage(path) {
            log::warn!("{}: staging deletion failed: {}", path.display(), e);
            report.stage_error = Some(e.to_string());
        }
    }

    report
}

/// Put `path` back the way it was before this block.
///
/// Pre-existing files are checked out from version control; if that fails or
/// does not reproduce the captured content, the captured content is written
/// back directly. New files are removed along with the directories
/// (`created_dirs`, deepest first) that were made for them.
fn restore(
    ctx: &ApplyContext<'_>,
    path: &Path,
    original: Option<&str>,
    created_dirs: &[PathBuf],
) -> Result<(), String> {
    let Some(original) = original else {
        ctx.workdir
            .remove_file(path)
            .map_err(|e| format!("could not remove new file: {e}"))?;
        for dir in created_dirs {
            if let Err(e) = ctx.workdir.remove_dir(dir) {
                log::warn!("{}: could not remove created directory: {}", dir.display(), e);
                break;
            }
        }
        return Ok(());
    };

    let vcs_error = match ctx.vcs.restore(path) {
        Ok(()) => match ctx.workdir.read_file(path) {
            Ok(content) if content == original => return Ok(()),
            Ok(_) => "checked-out content differs from the pre-edit content".to_string(),
            Err(e) => e.to_string(),
        },
        Err(e) => e.to_string(),
    };

    log::warn!(
        "{}: version-control restore unusable ({}), writing captured content",
        path.display(),
        vcs_error
    );
    ctx.workdir
        .write_file(path, original)
        .map_err(|e| format!("vcs restore: {vcs_error}; direct write: {e}"))
}

/// Ancestors of `path` that do not exist yet, deepest first.
fn missing_parents(workdir: &dyn WorkingDir, path: &Path) -> Vec<PathBuf> {
    path.ancestors()
        .skip(1)
        .filter(|dir| !dir.as_os_str().is_empty())
        .take_while(|dir| !workdir.dir_exists(dir))
        .map(Path::to_path_buf)
        .collect()
}

fn absolute_path(ctx: &ApplyContext<'_>, block: &EditBlock) -> PathBuf {
    if block.absolute_file_path.as_os_str().is_empty() || block.absolute_file_path.is_relative() {
        ctx.workdir.resolve(&block.file_path)
    } else {
        block.absolute_file_path.clone()
    }
}
