//! Version-control collaborator: stage and restore single paths.

use git2::build::CheckoutBuilder;
use git2::Repository;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Index-mutating git calls race even across paths; serialize them.
static INDEX_LOCK: Mutex<()> = Mutex::new(());

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error resolving repository paths: {0}")]
    Io(#[from] std::io::Error),

    #[error("repository at {0} has no working tree")]
    BareRepository(PathBuf),

    #[error("{path} is outside the repository working tree {workdir}")]
    OutsideRepository { path: PathBuf, workdir: PathBuf },

    #[error("{0} is not in the index")]
    NotTracked(PathBuf),

    #[error("no version control configured")]
    Unavailable,
}

pub trait Vcs {
    /// Stage `path` so a later restore of another block cannot undo it.
    fn stage(&self, path: &Path) -> Result<(), VcsError>;

    /// Restore `path` to its staged (or committed) content.
    fn restore(&self, path: &Path) -> Result<(), VcsError>;
}

/// Git through libgit2. The working directory may be any folder inside the
/// repository; paths stay relative to it.
#[derive(Debug, Clone)]
pub struct GitVcs {
    root: PathBuf,
}

impl GitVcs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the enclosing repository and map `path` to a repository-relative path.
    fn open(&self, path: &Path) -> Result<(Repository, PathBuf), VcsError> {
        let repo = Repository::discover(&self.root)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| VcsError::BareRepository(repo.path().to_path_buf()))?
            .canonicalize()?;

        let root = self.root.canonicalize()?;
        let relative = root
            .strip_prefix(&workdir)
            .map_err(|_| VcsError::OutsideRepository {
                path: root.join(path),
                workdir: workdir.clone(),
            })?
            .join(path);
        Ok((repo, relative))
    }
}

impl Vcs for GitVcs {
    fn stage(&self, path: &Path) -> Result<(), VcsError> {
        let _guard = INDEX_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (repo, relative) = self.open(path)?;
        let mut index = repo.index()?;

        if self.root.join(path).exists() {
            index.add_path(&relative)?;
        } else {
            index.remove_path(&relative)?;
        }
        index.write()?;

        log::debug!("staged {}", relative.display());
        Ok(())
    }

    fn restore(&self, path: &Path) -> Result<(), VcsError> {
        let _guard = INDEX_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (repo, relative) = self.open(path)?;
        let mut index = repo.index()?;

        if index.get_path(&relative, 0).is_none() {
            return Err(VcsError::NotTracked(relative));
        }

        let mut checkout = CheckoutBuilder::new();
        checkout
            .force()
            .disable_pathspec_match(true)
            .path(relative.as_path());
        repo.checkout_index(Some(&mut index), Some(&mut checkout))?;

        log::debug!("restored {} from the index", relative.display());
        Ok(())
    }
}

/// For working directories outside version control. Staging is a no-op and
/// restore always fails, so callers fall back to rewriting captured content.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVcs;

impl Vcs for NoVcs {
    fn stage(&self, _: &Path) -> Result<(), VcsError> {
        Ok(())
    }

    fn restore(&self, _: &Path) -> Result<(), VcsError> {
        Err(VcsError::Unavailable)
    }
}
