//! Orthodraft CLI
//!
//! Command-line interface for:
//! - Building draft reaction networks for many organisms from one config
//! - Running the individual steps (selection, projection, overlap
//!   diagnostics) on files, for inspection and debugging

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

use orthodraft_homology::{
    CandidateGeneMap, HomologyRecordStore, Selection, SelectionThresholds, ThresholdFilter,
};
use orthodraft_network::{
    GeneCorrespondenceTable, ReactionFate, ReactionNetwork, ReactionRuleProjector,
};
use orthodraft_pipeline::{BuildConfig, BuildOrchestrator, BuildReport};
use orthodraft_upset::{ClusterEnumerator, UpsetReport};

mod summary;

#[derive(Parser)]
#[command(name = "orthodraft")]
#[command(author, version, about = "Orthodraft: draft metabolic networks by orthology")]
struct Cli {
    /// More log output (repeatable: info, debug, trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build draft networks for every organism in a config file.
    ///
    /// Exits non-zero when any organism failed; the others are still built
    /// and listed in `<work_dir>/report.json`.
    Build {
        /// Build configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
        /// Reuse stage checkpoints from a previous run
        #[arg(long)]
        resume: bool,
    },

    /// Filter alignment hits into ortholog candidates.
    Select {
        /// Comma-separated 10-field hits file
        #[arg(long)]
        hits: PathBuf,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        /// Write the selection (candidates + rejections) as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Project a reference network onto one organism.
    Project {
        /// Reference network (`.json`, or a `reaction\trule` table)
        #[arg(long)]
        reference: PathBuf,
        /// Candidates JSON: the output of `select`, or a bare
        /// `{reference_gene: [subject_gene, ...]}` object
        #[arg(long)]
        candidates: PathBuf,
        /// `gene\tprotein` correspondence table
        #[arg(long)]
        correspondence: PathBuf,
        /// Write the draft network as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print exclusive overlaps of labelled sets.
    Clusters {
        /// JSON object: label → array of members
        #[arg(long)]
        sets: PathBuf,
        /// Also list subsets with no members
        #[arg(long)]
        keep_empty: bool,
        /// Emit rows as JSON instead of the text log
        #[arg(long)]
        json: bool,
    },

    /// Print the default selection thresholds as JSON.
    Thresholds,
}

/// Threshold overrides; unset flags keep the defaults.
#[derive(Args, Debug, Default, Clone)]
struct ThresholdArgs {
    /// Minimum percent identity
    #[arg(long)]
    min_identity: Option<f64>,
    /// Maximum subject/query length difference, percent of query length
    #[arg(long)]
    max_length_diff: Option<f64>,
    /// Maximum E-value
    #[arg(long)]
    max_e_value: Option<f64>,
    /// Minimum alignment coverage, percent of query length
    #[arg(long)]
    min_coverage: Option<f64>,
    /// Minimum bit score
    #[arg(long)]
    min_bit_score: Option<f64>,
}

impl ThresholdArgs {
    fn resolve(&self) -> Result<SelectionThresholds> {
        let mut t = SelectionThresholds::default();
        if let Some(v) = self.min_identity {
            t.set_min_identity(v)?;
        }
        if let Some(v) = self.max_length_diff {
            t.set_max_length_diff_pct(v)?;
        }
        if let Some(v) = self.max_e_value {
            t.set_max_e_value(v)?;
        }
        if let Some(v) = self.min_coverage {
            t.set_min_coverage_pct(v)?;
        }
        if let Some(v) = self.min_bit_score {
            t.set_min_bit_score(v)?;
        }
        Ok(t)
    }
}

fn log_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn init_tracing(level: LevelFilter) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(log_level(cli.verbose, cli.quiet));

    match cli.command {
        Commands::Build { config, resume } => {
            let report = cmd_build(&config, resume)?;
            if !report.all_succeeded() {
                std::process::exit(1);
            }
        }
        Commands::Select {
            hits,
            thresholds,
            out,
        } => cmd_select(&hits, &thresholds, out.as_deref())?,
        Commands::Project {
            reference,
            candidates,
            correspondence,
            out,
        } => cmd_project(&reference, &candidates, &correspondence, out.as_deref())?,
        Commands::Clusters {
            sets,
            keep_empty,
            json,
        } => cmd_clusters(&sets, keep_empty, json)?,
        Commands::Thresholds => {
            println!("{}", serde_json::to_string_pretty(&SelectionThresholds::default())?);
        }
    }
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_build(config_path: &Path, resume: bool) -> Result<BuildReport> {
    let mut config = BuildConfig::load(config_path)?;
    config.resume |= resume;
    tracing::info!(
        config = %config_path.display(),
        organisms = config.organisms.len(),
        resume = config.resume,
        "loaded build config"
    );
    println!(
        "{} {} organism(s) into {}",
        "Building".green().bold(),
        config.organisms.len(),
        config.work_dir.display()
    );

    let orchestrator = BuildOrchestrator::new(config)?;
    let report = orchestrator.run()?;
    let failed = report.failed().count();
    tracing::info!(
        built = report.organisms.len() - failed,
        failed,
        report = %orchestrator.report_path().display(),
        "build command finished"
    );
    summary::print_build_report(&report);
    println!("  {} {}", "→".cyan(), orchestrator.report_path().display());
    Ok(report)
}

fn cmd_select(hits: &Path, thresholds: &ThresholdArgs, out: Option<&Path>) -> Result<()> {
    let thresholds = thresholds.resolve()?;
    let parsed = HomologyRecordStore::read_path(hits)
        .with_context(|| format!("failed to read hits {}", hits.display()))?;
    let selection = ThresholdFilter::new(thresholds).select(&parsed.records)?;

    println!(
        "{} {} of {} hits ({} skipped lines)",
        "Selected".green().bold(),
        selection.selected,
        selection.considered,
        parsed.skipped.len()
    );
    println!(
        "  {} {} reference genes, {} candidate pairs",
        "→".yellow(),
        selection.candidates.len(),
        selection.candidates.pair_count()
    );
    for line in summary::rejection_lines(&selection.rejections.counts()) {
        println!("  {} {line}", "✗".red());
    }

    if let Some(out) = out {
        write_json(out, &selection)?;
        println!("  {} {}", "→".cyan(), out.display());
    }
    Ok(())
}

/// `project --candidates` accepts either a full selection or a bare map.
#[derive(Deserialize)]
#[serde(untagged)]
enum CandidatesFile {
    Selection(Box<Selection>),
    Map(CandidateGeneMap),
}

impl CandidatesFile {
    fn into_candidates(self) -> CandidateGeneMap {
        match self {
            CandidatesFile::Selection(s) => s.candidates,
            CandidatesFile::Map(m) => m,
        }
    }
}

fn read_candidates(path: &Path) -> Result<CandidateGeneMap> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read candidates {}", path.display()))?;
    let file: CandidatesFile = serde_json::from_str(&text)
        .map_err(|e| anyhow!("invalid candidates file {}: {e}", path.display()))?;
    Ok(file.into_candidates())
}

fn cmd_project(
    reference: &Path,
    candidates: &Path,
    correspondence: &Path,
    out: Option<&Path>,
) -> Result<()> {
    let network = ReactionNetwork::read_path(reference)?;
    let candidates = read_candidates(candidates)?;
    let table = GeneCorrespondenceTable::read_tsv(correspondence)?;

    let outcome = ReactionRuleProjector::new(&candidates, &table).run(&network.reactions);
    println!(
        "{} {} of {} reactions",
        "Kept".green().bold(),
        outcome.reactions.len(),
        network.len()
    );
    println!(
        "  {} {} without orthologs, {} without gene correspondence",
        "→".yellow(),
        outcome.count(ReactionFate::DroppedNoOrtholog),
        outcome.count(ReactionFate::DroppedNoCorrespondence)
    );

    let draft = ReactionNetwork::new(format!("{}_draft", network.id), outcome.into_reactions());
    match out {
        Some(out) => {
            draft.write_json(out)?;
            println!("  {} {}", "→".cyan(), out.display());
        }
        None => println!("{}", draft.to_json_string()?),
    }
    Ok(())
}

fn cmd_clusters(sets: &Path, keep_empty: bool, json: bool) -> Result<()> {
    let text = fs::read_to_string(sets)
        .with_context(|| format!("failed to read sets {}", sets.display()))?;
    let named: BTreeMap<String, BTreeSet<String>> = serde_json::from_str(&text)
        .with_context(|| {
            format!("expected a JSON object of label → member array in {}", sets.display())
        })?;

    let clusters = ClusterEnumerator::new(!keep_empty).enumerate(&named)?;
    let title = sets
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sets".to_string());
    let report = UpsetReport::from_clusters(title, &clusters);
    if json {
        println!("{}", report.to_json_string()?);
    } else {
        print!("{}", report.render_log());
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}
