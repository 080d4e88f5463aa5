//! Fuzzpatch: apply model-proposed edit blocks to source files
//!
//! An edit block names a file, the lines expected to be there ("old lines")
//! and their replacement. Model output is rarely an exact copy of the file, so
//! old lines are located with a tolerant line matcher rather than byte-exact
//! search.
//!
//! # Architecture
//!
//! - [`matching`]: anchor search and line alignment, the acceptance gate and
//!   disambiguation of repeated matches. Pure.
//! - [`visibility`]: which lines the proposer actually saw, including symbols
//!   that moved since, and range translation across same-file edits.
//! - [`rewrite`]: (block, file text) to new file text. Pure.
//! - [`apply`]: the batch orchestrator. Structural apply, autofix, checks,
//!   then stage or restore, with one report per block.
//!
//! Collaborators are traits so the orchestrator can run against a real
//! checkout or an in-memory overlay: [`WorkingDir`], [`Vcs`], [`CheckRunner`],
//! [`EditorBridge`] and [`SymbolLookup`].
//!
//! # Safety
//!
//! - Atomic file writes (tempfile + fsync + rename)
//! - Working-directory boundary enforcement
//! - A failed check always restores the pre-edit content, or reports that it
//!   could not
//! - Matches outside the visible ranges are never applied
//!
//! # Example
//!
//! ```no_run
//! use fuzzpatch::{apply_edit_blocks, ApplyContext, CommandCheckRunner, EditBlock, GitVcs, LocalWorkspace};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workdir = LocalWorkspace::new("/path/to/repo")?;
//! let vcs = GitVcs::new("/path/to/repo");
//! let checks = CommandCheckRunner::new(vec!["cargo check --quiet".to_string()], true);
//! let ctx = ApplyContext::new(&workdir, &vcs, &checks);
//!
//! let block = EditBlock::update("src/lib.rs", ["    run();"], ["    run_twice();"]);
//! for report in apply_edit_blocks(&ctx, &[block], true) {
//!     match report.error {
//!         None => println!("applied:\n{}", report.final_diff),
//!         Some(e) => eprintln!("failed: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod apply;
pub mod autofix;
pub mod block;
pub mod check;
pub mod config;
pub mod diff;
pub mod editor;
pub mod matching;
pub mod pool;
pub mod rewrite;
pub mod safety;
pub mod ts;
pub mod vcs;
pub mod visibility;
pub mod workspace;

// Re-exports
pub use apply::{apply_edit_blocks, failure_hint, ApplyContext, ApplyError};
pub use autofix::{AutofixError, AutofixResult, Autofixer};
pub use block::{ApplyEditBlockReport, EditBlock, EditType, FileRange, VisibleCodeBlock};
pub use check::{CheckError, CheckResult, CheckRunner, CommandCheckRunner};
pub use config::{load_from_path, load_from_str, ConfigError, PatcherConfig};
pub use diff::{line_hunks, unified_diff, LineHunk};
pub use editor::{EditorBridge, EditorError, NoopEditor};
pub use matching::{MatchConfig, MatchRegion};
pub use rewrite::{rewrite_content, RewriteError};
pub use safety::{SafetyError, WorkspaceGuard};
pub use ts::{TreeSitterError, TreeSitterSymbols};
pub use vcs::{GitVcs, NoVcs, Vcs, VcsError};
pub use visibility::{NoSymbols, SymbolError, SymbolLookup};
pub use workspace::{CommandOutput, LocalWorkspace, OverlayWorkspace, WorkingDir, WorkspaceError};
