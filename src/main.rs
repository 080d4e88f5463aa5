use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use fuzzpatch::apply::{apply_edit_blocks, ApplyContext};
use fuzzpatch::config::{load_for_workspace, load_from_path, PatcherConfig};
use fuzzpatch::matching::{best_match, find_matches, split_lines, SearchScope};
use fuzzpatch::{
    ApplyEditBlockReport, Autofixer, CommandCheckRunner, EditBlock, GitVcs, LocalWorkspace,
    NoVcs, OverlayWorkspace, TreeSitterSymbols, Vcs, WorkingDir,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fuzzpatch")]
#[command(about = "Apply model-proposed edit blocks with fuzzy, visibility-aware matching", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON array of edit blocks to a working directory
    Apply {
        /// JSON file holding the edit blocks
        #[arg(short, long)]
        blocks: PathBuf,

        /// Working directory (auto-detected if not specified)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Config file (defaults to fuzzpatch.toml in the working directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run checks after each block; restore the file if they fail
        #[arg(long)]
        check: bool,

        /// Show the diff of each applied block
        #[arg(short, long)]
        diff: bool,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what the blocks would change without writing anything
    Preview {
        #[arg(short, long)]
        blocks: PathBuf,

        #[arg(short, long)]
        workspace: Option<PathBuf>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show where a snippet matches in a file, with scores
    Locate {
        /// File to search
        #[arg(short, long)]
        file: PathBuf,

        /// File holding the old lines to look for
        #[arg(short, long)]
        old: PathBuf,

        /// Show every candidate, not only acceptable ones
        #[arg(long)]
        relaxed: bool,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            blocks,
            workspace,
            config,
            check,
            diff,
            json,
        } => cmd_apply(&blocks, workspace, config, check, diff, json),

        Commands::Preview {
            blocks,
            workspace,
            config,
        } => cmd_preview(&blocks, workspace, config),

        Commands::Locate {
            file,
            old,
            relaxed,
            config,
        } => cmd_locate(&file, &old, relaxed, config),
    }
}

/// Resolve the working directory.
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. FUZZPATCH_WORKSPACE environment variable
/// 3. Nearest ancestor of the current directory containing `.git`
/// 4. The current directory
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return path
            .canonicalize()
            .with_context(|| format!("workspace {} does not exist", path.display()));
    }

    if let Ok(env_path) = env::var("FUZZPATCH_WORKSPACE") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!("Warning: FUZZPATCH_WORKSPACE is set but path doesn't exist: {env_path}")
                .yellow()
        );
    }

    let current = env::current_dir()?;
    if let Some(repo) = current.ancestors().find(|dir| dir.join(".git").exists()) {
        return Ok(repo.to_path_buf());
    }
    Ok(current)
}

fn load_config(workspace: &Path, explicit: Option<PathBuf>) -> Result<PatcherConfig> {
    let config = match explicit {
        Some(path) => load_from_path(&path)?,
        None => load_for_workspace(workspace)?,
    };
    Ok(config)
}

fn read_blocks(path: &Path) -> Result<Vec<EditBlock>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read edit blocks from {}", path.display()))?;
    let blocks: Vec<EditBlock> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of edit blocks", path.display()))?;
    if blocks.is_empty() {
        anyhow::bail!("{} contains no edit blocks", path.display());
    }
    Ok(blocks)
}

fn cmd_apply(
    blocks_path: &Path,
    workspace: Option<PathBuf>,
    config: Option<PathBuf>,
    run_checks: bool,
    show_diff: bool,
    json: bool,
) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let config = load_config(&workspace, config)?;
    let blocks = read_blocks(blocks_path)?;

    let workdir = LocalWorkspace::new(&workspace)?;
    let vcs: Box<dyn Vcs> = if workspace.join(".git").exists() {
        Box::new(GitVcs::new(&workspace))
    } else {
        if run_checks {
            eprintln!(
                "{}",
                "Warning: not a git checkout; failed checks restore from captured content".yellow()
            );
        }
        Box::new(NoVcs)
    };
    let checks = CommandCheckRunner::from_config(&config.check);
    let symbols = TreeSitterSymbols;
    let ctx = ApplyContext::new(&workdir, vcs.as_ref(), &checks)
        .with_symbols(&symbols)
        .with_autofixer(Autofixer::from_config(&config.autofix))
        .with_matching(config.matching);

    if !json {
        println!("Workspace: {}", workspace.display());
        println!("Blocks: {}", blocks.len());
        println!();
    }

    let reports = apply_edit_blocks(&ctx, &blocks, run_checks);

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_reports(&reports, show_diff);
    }

    if reports.iter().any(|r| r.error.is_some()) {
        std::process::exit(1);
    }
    Ok(())
}

fn print_reports(reports: &[ApplyEditBlockReport], show_diff: bool) {
    let mut applied = 0;
    let mut failed = 0;

    for report in reports {
        let block = &report.original_edit_block;
        let label = format!(
            "#{} {} {}",
            block.sequence_number,
            block.edit_type,
            block.file_path.display()
        );

        match &report.error {
            None => {
                applied += 1;
                println!("  {} {}", "✓".green(), label);
            }
            Some(e) => {
                failed += 1;
                println!("  {} {}", "✗".red(), label);
                for line in e.to_string().lines() {
                    println!("      {}", line.dimmed());
                }
            }
        }

        if let Some(e) = &report.autofix_error {
            println!("      {}", format!("autofix: {e}").yellow());
        }
        if let Some(e) = &report.stage_error {
            println!("      {}", format!("not staged: {e}").yellow());
        }
        if show_diff && report.did_apply {
            print_diff(&report.final_diff);
        }
    }

    println!();
    println!(
        "Summary: {} applied, {} failed",
        applied.to_string().green(),
        if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        }
    );
}

fn print_diff(diff: &str) {
    for line in diff.lines() {
        let colored = if line.starts_with("+++") || line.starts_with("---") {
            line.dimmed()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else if line.starts_with("@@") {
            line.cyan()
        } else {
            line.normal()
        };
        println!("    {colored}");
    }
}

fn cmd_preview(blocks_path: &Path, workspace: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let config = load_config(&workspace, config)?;
    let blocks = read_blocks(blocks_path)?;

    let disk = LocalWorkspace::new(&workspace)?;
    let overlay = OverlayWorkspace::new(&disk);
    let vcs = NoVcs;
    let checks = CommandCheckRunner::default();
    let symbols = TreeSitterSymbols;
    let ctx = ApplyContext::new(&overlay, &vcs, &checks)
        .with_symbols(&symbols)
        .with_matching(config.matching);

    println!("{}", "[PREVIEW - nothing is written]".cyan());
    let reports = apply_edit_blocks(&ctx, &blocks, false);
    print_reports(&reports, true);

    let changed = overlay.changed_paths();
    if !changed.is_empty() {
        println!("Would change:");
        for path in changed {
            let marker = match (disk.exists(&path), overlay.exists(&path)) {
                (false, _) => "A",
                (true, true) => "M",
                (true, false) => "D",
            };
            println!("  {} {}", marker.yellow(), path.display());
        }
    }
    Ok(())
}

fn cmd_locate(file: &Path, old: &Path, relaxed: bool, config: Option<PathBuf>) -> Result<()> {
    let config = match config {
        Some(path) => load_from_path(&path)?,
        None => PatcherConfig::default(),
    };
    let target = split_lines(
        &fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?,
    );
    let old_lines: Vec<String> = fs::read_to_string(old)
        .with_context(|| format!("failed to read {}", old.display()))?
        .lines()
        .map(str::to_string)
        .collect();

    let candidates = find_matches(&old_lines, &target, SearchScope::Whole, &config.matching);
    let acceptable: Vec<_> = candidates
        .iter()
        .filter(|c| c.is_acceptable(&config.matching))
        .collect();

    match acceptable.len() {
        0 => println!("{}", "No acceptable match".red()),
        1 => println!("{}", "Unique match".green()),
        n => println!("{}", format!("Ambiguous: {n} acceptable matches").yellow()),
    }

    let shown: Vec<_> = if relaxed {
        candidates.iter().collect()
    } else if acceptable.is_empty() {
        best_match(&candidates).into_iter().collect()
    } else {
        acceptable
    };

    for candidate in shown {
        let mark = if candidate.is_acceptable(&config.matching) {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "  {} {}:{}-{}  score {:.3}  confident {:.1}%{}",
            mark,
            file.display(),
            candidate.start_line(),
            candidate.end_line(),
            candidate.score,
            candidate.high_score_ratio * 100.0,
            if candidate.successful { "" } else { "  (ran past end of file)" }
        );
        for (missing, found) in candidate
            .failed_to_match
            .iter()
            .zip(candidate.found_instead.iter().map(Some).chain(std::iter::repeat(None)))
            .take(config.matching.max_diagnostic_lines)
        {
            println!("      {} {}", "-".red(), missing);
            if let Some(found) = found {
                println!("      {} {}", "+".green(), found);
            }
        }
    }
    Ok(())
}
