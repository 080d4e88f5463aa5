use fuzzpatch::{
    apply_edit_blocks, ApplyContext, ApplyError, CommandCheckRunner, EditBlock, FileRange,
    LocalWorkspace, NoVcs, OverlayWorkspace, RewriteError, WorkingDir,
};
use std::path::Path;

use super::{read, workspace_with};

const TWO_FNS: &str = "fn a() {\n    work();\n}\nfn b() {\n    work();\n}\n";

#[test]
fn whitespace_drift_still_applies() {
    let dir = workspace_with(&[(
        "src/lib.rs",
        "pub fn hello() {\n    println!(\"Hello\");\n}\n",
    )]);
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let checks = CommandCheckRunner::default();
    let ctx = ApplyContext::new(&ws, &NoVcs, &checks);

    let block = EditBlock::update(
        "src/lib.rs",
        ["pub fn hello() {", "  println!(\"Hello\");", "}"],
        ["pub fn hello() {", "    println!(\"Hello, world\");", "}"],
    );
    let reports = apply_edit_blocks(&ctx, &[block], false);

    assert!(reports[0].error.is_none(), "{:?}", reports[0].error);
    assert_eq!(
        read(dir.path(), "src/lib.rs"),
        "pub fn hello() {\n    println!(\"Hello, world\");\n}\n"
    );
    assert!(reports[0].final_diff.contains("+    println!(\"Hello, world\");"));
}

#[test]
fn repeated_lines_are_ambiguous_without_ranges() {
    let dir = workspace_with(&[("src/lib.rs", TWO_FNS)]);
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let checks = CommandCheckRunner::default();
    let ctx = ApplyContext::new(&ws, &NoVcs, &checks);

    let block = EditBlock::update("src/lib.rs", ["    work();"], ["    rest();"]);
    let reports = apply_edit_blocks(&ctx, &[block], false);

    match &reports[0].error {
        Some(ApplyError::Rewrite(RewriteError::MultipleMatches { regions, .. })) => {
            assert_eq!(regions.len(), 2);
            assert!(regions[0].content.contains("fn a()"));
            assert!(regions[1].content.contains("fn b()"));
        }
        other => panic!("expected MultipleMatches, got {other:?}"),
    }
    assert_eq!(read(dir.path(), "src/lib.rs"), TWO_FNS);
}

#[test]
fn visible_range_picks_the_occurrence_that_was_shown() {
    let dir = workspace_with(&[("src/lib.rs", TWO_FNS)]);
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let checks = CommandCheckRunner::default();
    let ctx = ApplyContext::new(&ws, &NoVcs, &checks);

    let block = EditBlock::update("src/lib.rs", ["    work();"], ["    rest();"])
        .with_visible_ranges(vec![FileRange::new("src/lib.rs", 4, 6)]);
    let reports = apply_edit_blocks(&ctx, &[block], false);

    assert!(reports[0].error.is_none(), "{:?}", reports[0].error);
    assert_eq!(
        read(dir.path(), "src/lib.rs"),
        "fn a() {\n    work();\n}\nfn b() {\n    rest();\n}\n"
    );
}

#[test]
fn match_outside_visible_ranges_is_rejected() {
    let dir = workspace_with(&[("src/lib.rs", TWO_FNS)]);
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let checks = CommandCheckRunner::default();
    let ctx = ApplyContext::new(&ws, &NoVcs, &checks);

    let block = EditBlock::update("src/lib.rs", ["fn b() {"], ["fn c() {"])
        .with_visible_ranges(vec![FileRange::new("src/lib.rs", 1, 2)]);
    let reports = apply_edit_blocks(&ctx, &[block], false);

    match &reports[0].error {
        Some(ApplyError::Rewrite(RewriteError::NoMatchFound { closest_line, .. })) => {
            assert_eq!(*closest_line, Some(4));
        }
        other => panic!("expected NoMatchFound, got {other:?}"),
    }
    assert_eq!(read(dir.path(), "src/lib.rs"), TWO_FNS);
}

#[test]
fn declared_ranges_follow_earlier_edits_in_the_batch() {
    let dir = workspace_with(&[("src/lib.rs", TWO_FNS)]);
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let checks = CommandCheckRunner::default();
    let ctx = ApplyContext::new(&ws, &NoVcs, &checks);

    let header = EditBlock::update(
        "src/lib.rs",
        ["fn a() {"],
        ["// generated", "// do not edit", "fn a() {"],
    )
    .with_sequence_number(1);
    // Range declared against the file as it was before the batch.
    let second = EditBlock::update("src/lib.rs", ["    work();"], ["    rest();"])
        .with_visible_ranges(vec![FileRange::new("src/lib.rs", 4, 6)])
        .with_sequence_number(2);

    let reports = apply_edit_blocks(&ctx, &[header, second], false);

    assert!(reports.iter().all(|r| r.error.is_none()));
    assert_eq!(
        read(dir.path(), "src/lib.rs"),
        "// generated\n// do not edit\nfn a() {\n    work();\n}\nfn b() {\n    rest();\n}\n"
    );
}

#[test]
fn range_survives_earlier_edit_that_shrinks_across_its_start() {
    let dir = workspace_with(&[("notes.txt", "a\nb\nc\nd\ne\nf\ng\nh\ni\nj\n")]);
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let checks = CommandCheckRunner::default();
    let ctx = ApplyContext::new(&ws, &NoVcs, &checks);

    let blocks = [
        EditBlock::update("notes.txt", ["c", "d", "e", "f"], ["X"]),
        // Declared against the original file, where `g` was line 7.
        EditBlock::update("notes.txt", ["g"], ["G"])
            .with_visible_ranges(vec![FileRange::new("notes.txt", 5, 8)]),
    ];
    let reports = apply_edit_blocks(&ctx, &blocks, false);

    assert!(reports[1].error.is_none(), "{:?}", reports[1].error);
    assert_eq!(read(dir.path(), "notes.txt"), "a\nb\nX\nG\nh\ni\nj\n");
}

#[test]
fn failed_syntax_check_restores_exact_content() {
    let original = "fn main() {\n    let x = 1;\n    println!(\"{x}\");\n}\n";
    let dir = workspace_with(&[("src/main.rs", original)]);
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let checks = CommandCheckRunner::new(Vec::new(), true);
    let ctx = ApplyContext::new(&ws, &NoVcs, &checks);

    let block = EditBlock::update("src/main.rs", ["    let x = 1;"], ["    let x = {1;"]);
    let reports = apply_edit_blocks(&ctx, &[block], true);

    let report = &reports[0];
    assert!(!report.did_apply);
    assert!(!report.check_result.as_ref().unwrap().passed);
    match &report.error {
        Some(ApplyError::CheckFailed { hint, .. }) => assert!(hint.contains("delimiter")),
        other => panic!("expected CheckFailed, got {other:?}"),
    }
    assert_eq!(read(dir.path(), "src/main.rs"), original);
}

#[test]
fn create_then_append_in_one_batch() {
    let dir = workspace_with(&[]);
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let checks = CommandCheckRunner::default();
    let ctx = ApplyContext::new(&ws, &NoVcs, &checks);

    let blocks = [
        EditBlock::create("notes/todo.txt", ["first", ""]),
        EditBlock::append("notes/todo.txt", ["second"]),
    ];
    let reports = apply_edit_blocks(&ctx, &blocks, false);

    assert!(reports.iter().all(|r| r.error.is_none()));
    assert_eq!(read(dir.path(), "notes/todo.txt"), "first\nsecond\n");
}

#[test]
fn overlay_preview_leaves_disk_untouched() {
    let dir = workspace_with(&[("src/lib.rs", TWO_FNS), ("old.txt", "bye\n")]);
    let disk = LocalWorkspace::new(dir.path()).unwrap();
    let overlay = OverlayWorkspace::new(&disk);
    let checks = CommandCheckRunner::default();
    let ctx = ApplyContext::new(&overlay, &NoVcs, &checks);

    let blocks = [
        EditBlock::update("src/lib.rs", ["fn b() {"], ["fn c() {"]),
        EditBlock::delete("old.txt"),
    ];
    let reports = apply_edit_blocks(&ctx, &blocks, false);

    assert!(reports.iter().all(|r| r.did_apply));
    assert_eq!(read(dir.path(), "src/lib.rs"), TWO_FNS);
    assert!(dir.path().join("old.txt").exists());

    assert!(overlay
        .read_file(Path::new("src/lib.rs"))
        .unwrap()
        .contains("fn c() {"));
    assert!(!overlay.exists(Path::new("old.txt")));
    assert_eq!(overlay.changed_paths().len(), 2);
}

#[test]
fn paths_outside_the_working_directory_are_refused() {
    let dir = workspace_with(&[]);
    let ws = LocalWorkspace::new(dir.path()).unwrap();
    let checks = CommandCheckRunner::default();
    let ctx = ApplyContext::new(&ws, &NoVcs, &checks);

    let reports = apply_edit_blocks(&ctx, &[EditBlock::create("../escape.txt", ["x"])], false);

    assert!(matches!(reports[0].error, Some(ApplyError::Workspace { .. })));
    assert!(!dir.path().parent().unwrap().join("escape.txt").exists());
}
