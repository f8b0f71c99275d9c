//! Per-organism summaries and the run-level report.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use orthodraft_homology::SelectionThresholds;
use orthodraft_upset::{ClusterEnumerator, ClusterError, Clusters, UpsetReport};

use crate::checkpoint::Stage;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganismSummary {
    pub organism: String,
    /// Latest checkpoint reused instead of recomputed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_from: Option<Stage>,

    pub genes_searched: usize,
    pub genes_without_hits: usize,
    pub genes_timed_out: usize,
    pub hits_skipped_lines: usize,
    pub hits_considered: usize,
    pub hits_selected: usize,
    pub candidate_genes: usize,
    /// Criterion → rejected hits. A hit failing several criteria counts in each.
    pub rejections: BTreeMap<String, usize>,

    pub reference_reactions: usize,
    pub drafted_reactions: usize,
    pub dropped_no_ortholog: usize,
    pub dropped_no_correspondence: usize,
    pub final_reactions: usize,
    pub reaction_ids: BTreeSet<String>,
    pub draft_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrganismStatus {
    Built(Box<OrganismSummary>),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganismOutcome {
    pub organism: String,
    pub status: OrganismStatus,
}

impl OrganismOutcome {
    pub fn summary(&self) -> Option<&OrganismSummary> {
        match &self.status {
            OrganismStatus::Built(s) => Some(&**s),
            OrganismStatus::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OrganismStatus::Built(_) => None,
            OrganismStatus::Failed { error } => Some(error.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub thresholds: SelectionThresholds,
    pub organisms: Vec<OrganismOutcome>,
}

impl BuildReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &OrganismSummary> {
        self.organisms.iter().filter_map(OrganismOutcome::summary)
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.organisms
            .iter()
            .filter_map(|o| o.error().map(|e| (o.organism.as_str(), e)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn outcome(&self, organism: &str) -> Option<&OrganismOutcome> {
        self.organisms.iter().find(|o| o.organism == organism)
    }

    /// Exclusive overlaps of the final reaction sets of every built organism.
    pub fn reaction_clusters(
        &self,
        remove_zero: bool,
    ) -> Result<Clusters<String, String>, ClusterError> {
        let named: BTreeMap<String, BTreeSet<String>> = self
            .succeeded()
            .map(|s| (s.organism.clone(), s.reaction_ids.clone()))
            .collect();
        ClusterEnumerator::new(remove_zero).enumerate(&named)
    }

    pub fn reaction_upset(&self) -> Result<UpsetReport, ClusterError> {
        let clusters = self.reaction_clusters(true)?;
        Ok(UpsetReport::from_clusters("draft reactions by organism", &clusters))
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("failed to write report {}", path.display()))
    }
}
