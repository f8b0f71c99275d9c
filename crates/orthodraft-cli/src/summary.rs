//! Colored per-organism summary for `orthodraft build`.

use colored::Colorize;
use std::collections::BTreeMap;

use orthodraft_pipeline::{BuildReport, OrganismStatus, OrganismSummary};

/// One `criterion: n rejected` line per criterion that rejected anything.
pub fn rejection_lines(counts: &BTreeMap<String, usize>) -> Vec<String> {
    counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(criterion, count)| format!("{criterion}: {count} rejected"))
        .collect()
}

fn print_built(s: &OrganismSummary) {
    let resumed = s
        .resumed_from
        .map(|stage| format!(" (resumed from {})", stage.name()))
        .unwrap_or_default();
    println!("  {} {}{}", "ok".green().bold(), s.organism.bold(), resumed.dimmed());
    println!(
        "     hits: {} considered, {} selected, {} candidate genes",
        s.hits_considered, s.hits_selected, s.candidate_genes
    );
    if s.genes_timed_out > 0 || s.hits_skipped_lines > 0 {
        println!(
            "     {} {} aligner timeouts, {} unparsable hit lines",
            "!".yellow(),
            s.genes_timed_out,
            s.hits_skipped_lines
        );
    }
    for line in rejection_lines(&s.rejections) {
        println!("     {} {line}", "✗".red());
    }
    println!(
        "     reactions: {} reference → {} drafted → {} kept \
         ({} no ortholog, {} no correspondence)",
        s.reference_reactions,
        s.drafted_reactions,
        s.final_reactions,
        s.dropped_no_ortholog,
        s.dropped_no_correspondence
    );
    println!("     {} {}", "→".cyan(), s.draft_path.display());
}

pub fn print_build_report(report: &BuildReport) {
    for outcome in &report.organisms {
        match &outcome.status {
            OrganismStatus::Built(summary) => print_built(summary),
            OrganismStatus::Failed { error } => {
                println!("  {} {}: {}", "failed".red().bold(), outcome.organism.bold(), error);
            }
        }
    }
    let failed = report.failed().count();
    let built = report.organisms.len() - failed;
    let line = format!("{built} built, {failed} failed");
    if failed == 0 {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line.red().bold());
    }
}
