use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Keeps edits inside the working directory and out of toolchain state.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical working directory
    root: PathBuf,
    /// Canonical directories that are never edited, even inside `root`
    forbidden: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("path escapes the working directory: {path} (root: {root})")]
    OutsideWorkspace { path: PathBuf, root: PathBuf },

    #[error("path is in a protected directory: {path} (protected: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("path contains parent-directory components: {0}")]
    ParentTraversal(PathBuf),

    #[error("failed to resolve path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl WorkspaceGuard {
    /// Guard `root`, protecting cargo/rustup state, `.git` and `target`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = root.as_ref().canonicalize()?;

        let mut candidates = vec![root.join(".git"), root.join("target")];
        if let Some(home) = home::home_dir() {
            candidates.push(home.join(".cargo/registry"));
            candidates.push(home.join(".cargo/git"));
            candidates.push(home.join(".rustup"));
        }
        let forbidden = candidates
            .into_iter()
            .filter_map(|dir| dir.canonicalize().ok())
            .collect();

        Ok(Self { root, forbidden })
    }

    /// Guard with an explicit protected list.
    pub fn with_forbidden(
        root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, SafetyError> {
        Ok(Self {
            root: root.as_ref().canonicalize()?,
            forbidden,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate an existing path; returns its canonical form.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let canonical = self.absolute(path.as_ref()).canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    /// Validate a path that may not exist yet.
    ///
    /// The nearest existing ancestor is canonicalized (so symlinked parents
    /// are caught) and the missing tail is re-attached. `..` is rejected.
    pub fn validate_new_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let absolute = self.absolute(path.as_ref());
        if absolute
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(SafetyError::ParentTraversal(absolute));
        }

        let mut existing = absolute.as_path();
        let mut tail = Vec::new();
        while !existing.exists() {
            let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                break;
            };
            tail.push(name.to_os_string());
            existing = parent;
        }

        let mut canonical = existing.canonicalize()?;
        for name in tail.iter().rev() {
            canonical.push(name);
        }
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                root: self.root.clone(),
            });
        }

        if let Some(forbidden) = self.forbidden.iter().find(|f| canonical.starts_with(f)) {
            return Err(SafetyError::ForbiddenPath {
                path: canonical.to_path_buf(),
                forbidden: forbidden.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn accepts_existing_file_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "").unwrap();

        let guard = WorkspaceGuard::new(dir.path()).unwrap();
        assert!(guard.validate_path("src/lib.rs").is_ok());
    }

    #[test]
    fn rejects_file_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(&root).unwrap();
        let outside = dir.path().join("outside.rs");
        fs::write(&outside, "").unwrap();

        let guard = WorkspaceGuard::new(&root).unwrap();
        assert!(matches!(
            guard.validate_path(&outside),
            Err(SafetyError::OutsideWorkspace { .. })
        ));
    }

    #[test]
    fn rejects_git_internals() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config"), "").unwrap();

        let guard = WorkspaceGuard::new(dir.path()).unwrap();
        assert!(matches!(
            guard.validate_path(".git/config"),
            Err(SafetyError::ForbiddenPath { .. })
        ));
    }

    #[test]
    fn new_path_under_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let guard = WorkspaceGuard::new(dir.path()).unwrap();

        let validated = guard.validate_new_path("a/b/new.rs").unwrap();
        assert!(validated.ends_with("a/b/new.rs"));
        assert!(validated.starts_with(guard.root()));
    }

    #[test]
    fn new_path_cannot_climb_out() {
        let dir = tempfile::tempdir().unwrap();
        let guard = WorkspaceGuard::new(dir.path()).unwrap();

        assert!(matches!(
            guard.validate_new_path("missing/../../escape.rs"),
            Err(SafetyError::ParentTraversal(_))
        ));
    }

    #[test]
    #[cfg(unix)]
    fn symlinked_parent_is_resolved() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let outside = dir.path().join("outside");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&outside).unwrap();
        symlink(&outside, root.join("link")).unwrap();

        let guard = WorkspaceGuard::with_forbidden(&root, Vec::new()).unwrap();
        assert!(matches!(
            guard.validate_new_path("link/new.rs"),
            Err(SafetyError::OutsideWorkspace { .. })
        ));
    }
}
