use fuzzpatch::{
    apply_edit_blocks, ApplyContext, ApplyError, CommandCheckRunner, EditBlock, GitVcs,
    LocalWorkspace,
};
use git2::{IndexAddOption, Repository, Signature};
use std::path::PathBuf;

use super::{read, workspace_with};

const MAIN: &str = "fn main() {\n    let total = 2 + 2;\n    println!(\"{total}\");\n}\n";

fn committed_repo() -> (tempfile::TempDir, Repository) {
    let dir = workspace_with(&[("src/main.rs", MAIN)]);
    let repo = Repository::init(dir.path()).unwrap();
    {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"], IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
    }
    (dir, repo)
}

/// Paths whose staged content differs from HEAD.
fn staged_paths(repo: &Repository) -> Vec<PathBuf> {
    let head = repo.head().unwrap().peel_to_tree().unwrap();
    let mut index = repo.index().unwrap();
    index.read(true).unwrap();
    let diff = repo
        .diff_tree_to_index(Some(&head), Some(&index), None)
        .unwrap();
    diff.deltas()
        .filter_map(|d| d.new_file().path().map(|p| p.to_path_buf()))
        .collect()
}

#[test]
fn failed_check_restores_and_stages_nothing() {
    let (dir, repo) = committed_repo();
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let vcs = GitVcs::new(dir.path());
    let checks = CommandCheckRunner::new(Vec::new(), true);
    let ctx = ApplyContext::new(&ws, &vcs, &checks);

    let block = EditBlock::update(
        "src/main.rs",
        ["    let total = 2 + 2;"],
        ["    let total = (2 + 2;"],
    );
    let reports = apply_edit_blocks(&ctx, &[block], true);

    assert!(matches!(
        reports[0].error,
        Some(ApplyError::CheckFailed { .. })
    ));
    assert_eq!(read(dir.path(), "src/main.rs"), MAIN);
    assert!(staged_paths(&repo).is_empty());
    assert!(repo.statuses(None).unwrap().is_empty());
}

#[test]
fn passing_check_stages_the_file() {
    let (dir, repo) = committed_repo();
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let vcs = GitVcs::new(dir.path());
    let checks = CommandCheckRunner::new(Vec::new(), true);
    let ctx = ApplyContext::new(&ws, &vcs, &checks);

    let block = EditBlock::update(
        "src/main.rs",
        ["    let total = 2 + 2;"],
        ["    let total = 2 + 3;"],
    );
    let reports = apply_edit_blocks(&ctx, &[block], true);

    assert!(reports[0].error.is_none(), "{:?}", reports[0].error);
    assert!(reports[0].stage_error.is_none());
    assert_eq!(staged_paths(&repo), vec![PathBuf::from("src/main.rs")]);
}

#[test]
fn staged_deletion_leaves_the_index() {
    let (dir, repo) = committed_repo();
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let vcs = GitVcs::new(dir.path());
    let checks = CommandCheckRunner::new(Vec::new(), false);
    let ctx = ApplyContext::new(&ws, &vcs, &checks);

    let reports = apply_edit_blocks(&ctx, &[EditBlock::delete("src/main.rs")], true);

    assert!(reports[0].error.is_none(), "{:?}", reports[0].error);
    assert!(reports[0].stage_error.is_none());
    let mut index = repo.index().unwrap();
    index.read(true).unwrap();
    assert!(index.get_path(std::path::Path::new("src/main.rs"), 0).is_none());
}

#[test]
fn later_failure_does_not_undo_earlier_staged_block() {
    let (dir, _repo) = committed_repo();
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let vcs = GitVcs::new(dir.path());
    let checks = CommandCheckRunner::new(Vec::new(), true);
    let ctx = ApplyContext::new(&ws, &vcs, &checks);

    let blocks = [
        EditBlock::update(
            "src/main.rs",
            ["    let total = 2 + 2;"],
            ["    let total = 2 + 3;"],
        ),
        EditBlock::update(
            "src/main.rs",
            ["    println!(\"{total}\");"],
            ["    println!(\"{total}\";"],
        ),
    ];
    let reports = apply_edit_blocks(&ctx, &blocks, true);

    assert!(reports[0].error.is_none());
    assert!(reports[1].error.is_some());
    assert_eq!(
        read(dir.path(), "src/main.rs"),
        MAIN.replace("2 + 2", "2 + 3")
    );
}
