use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use seed_patcher::config::{load_patch_sets, PatchReport, PatchSet, RuleOutcome};
use seed_patcher::pipeline::{run, RunOptions, RunReport};
use seed_patcher::safety::Target;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};

/// Environment variable holding an `EnvFilter` directive; overrides `-v`.
const LOG_ENV: &str = "SEED_PATCHER_LOG";

#[derive(Parser)]
#[command(name = "seed-patcher")]
#[command(about = "Declarative text patching for SQL seed files", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply patch sets to a file
    Apply {
        /// File to patch
        #[arg(short, long)]
        input: PathBuf,

        /// Patch set file, or a directory of them applied in name order
        #[arg(short, long)]
        patches: PathBuf,

        /// Where to write the result (default: <input>.patched)
        #[arg(short, long, conflicts_with = "in_place")]
        output: Option<PathBuf>,

        /// Overwrite the input, keeping a snapshot of the original
        #[arg(long)]
        in_place: bool,

        /// Snapshot path (default for --in-place: <input>.orig)
        #[arg(long)]
        backup: Option<PathBuf>,

        /// Dry run - show what would be changed without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Fail without writing if any rule matches zero times
        #[arg(long)]
        strict: bool,
    },

    /// Check that every rule still matches, without writing
    Check {
        /// File to check
        #[arg(short, long)]
        input: PathBuf,

        /// Patch set file or directory
        #[arg(short, long)]
        patches: PathBuf,
    },

    /// List patch sets and their rules
    List {
        /// Patch set file or directory
        #[arg(short, long)]
        patches: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Apply {
            input,
            patches,
            output,
            in_place,
            backup,
            dry_run,
            diff,
            strict,
        } => {
            let mut target = Target::new(input);
            target.output = output;
            target.in_place = in_place;
            target.snapshot = backup;
            cmd_apply(&target, &patches, RunOptions { dry_run, strict }, diff)
        }

        Commands::Check { input, patches } => cmd_check(&input, &patches),

        Commands::List { patches } => cmd_list(&patches),
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_sets(patches: &Path) -> Result<Vec<PatchSet>> {
    let loaded = load_patch_sets(patches)?;
    for (file, set) in &loaded {
        println!(
            "Loaded {}@{} ({} rules) from {}",
            set.meta.name,
            set.meta.version(),
            set.rules.len(),
            file.display()
        );
    }
    Ok(loaded.into_iter().map(|(_, set)| set).collect())
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => continue,
        };
        print!("{}", sign);
        if change.missing_newline() {
            println!();
        }
    }
}

#[derive(Default)]
struct Tally {
    applied: usize,
    already_applied: usize,
    no_match: usize,
}

fn print_rules(report: &PatchReport) -> Tally {
    let mut tally = Tally::default();

    for rule in &report.rules {
        let label = format!("{}/{}", rule.set, rule.rule_id);
        match &rule.outcome {
            RuleOutcome::Applied { .. } => {
                println!("{} {}: {}", "✓".green(), label, rule.outcome);
                tally.applied += 1;
            }
            RuleOutcome::AlreadyApplied { .. } => {
                println!("{} {}: {}", "⊙".yellow(), label, rule.outcome);
                tally.already_applied += 1;
            }
            RuleOutcome::NoMatch { hint } => {
                eprintln!("{} {}: {}", "✗".red(), label, "matched zero times".red());
                if let Some(hint) = hint {
                    eprintln!("  Hint: {}", hint);
                }
                eprintln!("  Possible causes:");
                eprintln!("    - Input drifted from the text the rule was written against");
                eprintln!("    - An earlier rule already rewrote this text");
                tally.no_match += 1;
            }
        }
    }

    tally
}

fn print_summary(report: &RunReport, tally: &Tally) {
    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {} replacements",
        format!("{}", report.patch.replacements()).green()
    );
    println!("  {} rules applied", format!("{}", tally.applied).green());
    println!(
        "  {} already applied",
        format!("{}", tally.already_applied).yellow()
    );
    println!("  {} matched zero times", format!("{}", tally.no_match).red());
}

fn cmd_apply(target: &Target, patches: &Path, options: RunOptions, show_diff: bool) -> Result<()> {
    let sets = load_sets(patches)?;
    println!("Input: {}", target.input.display());
    if options.dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
    }
    println!();

    let report = run(target, &sets, options)?;
    let tally = print_rules(&report.patch);

    if show_diff && report.changed() {
        display_diff(&report.output, &report.original, &report.patch.text);
    }

    print_summary(&report, &tally);
    println!();

    if report.written {
        println!("Wrote {}", report.output.display());
        if let Some(snapshot) = &report.snapshot {
            println!("Original saved to {}", snapshot.display());
        }
    } else if options.dry_run {
        println!("Would write {}", report.output.display());
    } else {
        println!("{}", "No changes; nothing written".dimmed());
    }

    Ok(())
}

fn cmd_check(input: &Path, patches: &Path) -> Result<()> {
    let sets = load_sets(patches)?;
    println!("{}", "Checking patch sets...".bold());
    println!("Input: {}", input.display());
    println!();

    let options = RunOptions {
        dry_run: true,
        strict: false,
    };
    let report = run(&Target::new(input), &sets, options)?;
    let tally = print_rules(&report.patch);
    print_summary(&report, &tally);

    if tally.no_match > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(patches: &Path) -> Result<()> {
    for (file, set) in load_patch_sets(patches)? {
        println!(
            "{} {} ({})",
            set.meta.name.bold(),
            set.meta.version().dimmed(),
            file.display()
        );
        if let Some(description) = &set.meta.description {
            println!("  {}", description);
        }
        for rule in &set.rules {
            let limit = rule
                .max_occurrences
                .map(|n| format!(", first {n}"))
                .unwrap_or_default();
            println!("  - {} [{}{}]", rule.id, rule.kind, limit);
            if let Some(description) = &rule.description {
                println!("      {}", description.dimmed());
            }
        }
        println!();
    }
    Ok(())
}
