//! One organism's build: evidence → selection → projection → correspondence.
//!
//! Each stage either reuses its checkpoint (when resuming and nothing
//! upstream changed) or is recomputed, in which case every later checkpoint
//! is discarded first. Only the thresholds are compared against a stored
//! checkpoint; a changed reference network or input file needs a fresh
//! build (`resume: false`).

use rayon::ThreadPool;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use orthodraft_homology::{HomologyRecordStore, SelectionThresholds, ThresholdFilter};
use orthodraft_network::{
    projection, GeneCorrespondenceTable, ReactionFate, ReactionNetwork, ReactionRuleProjector,
};
use orthodraft_upset::{ClusterEnumerator, UpsetReport};

use crate::checkpoint::{
    AlignedData, CheckpointStore, DraftedData, FinalizedData, SelectedData, Stage,
};
use crate::config::{EvidenceSource, OrganismConfig};
use crate::error::BuildError;
use crate::report::OrganismSummary;
use crate::search::{read_fasta, search_all, SequenceSearch};

pub const DRAFT_FILE: &str = "draft.json";
pub const REJECTIONS_LOG: &str = "rejections.log";

/// Everything one organism task needs. Shared pieces are borrowed read-only.
pub struct OrganismBuild<'a> {
    pub organism: &'a OrganismConfig,
    pub reference: &'a ReactionNetwork,
    pub thresholds: SelectionThresholds,
    pub work_dir: &'a Path,
    pub resume: bool,
    pub searcher: &'a dyn SequenceSearch,
    pub search_pool: &'a ThreadPool,
}

struct StageRunner<'s> {
    store: &'s CheckpointStore,
    /// Set once a stage has been recomputed; later stages then recompute too.
    stale: bool,
    resumed_from: Option<Stage>,
}

impl StageRunner<'_> {
    fn run<T, A, C>(&mut self, stage: Stage, accept: A, compute: C) -> Result<T, BuildError>
    where
        T: Serialize + DeserializeOwned,
        A: FnOnce(&T) -> bool,
        C: FnOnce() -> Result<T, BuildError>,
    {
        if !self.stale {
            if let Some(data) = self.store.load::<T>(stage)? {
                if accept(&data) {
                    self.resumed_from = Some(stage);
                    return Ok(data);
                }
                tracing::info!(
                    stage = stage.name(),
                    "checkpoint no longer matches inputs; recomputing"
                );
            }
        }
        self.stale = true;
        self.store.invalidate_from(stage)?;
        let data = compute()?;
        self.store.save(stage, &data)?;
        Ok(data)
    }
}

impl OrganismBuild<'_> {
    fn require(&self, what: &'static str, path: &Path) -> Result<(), BuildError> {
        if path.exists() {
            Ok(())
        } else {
            Err(BuildError::MissingInput {
                what,
                path: path.to_path_buf(),
            })
        }
    }

    fn check_inputs(&self) -> Result<(), BuildError> {
        self.require("correspondence file", &self.organism.correspondence)?;
        match &self.organism.evidence {
            EvidenceSource::Hits(path) => self.require("alignment hits file", path),
            EvidenceSource::Search { queries, subject } => {
                self.require("query FASTA", queries)?;
                self.require("subject FASTA", subject)
            }
        }
    }

    fn align(&self, store: &CheckpointStore) -> Result<AlignedData, BuildError> {
        match &self.organism.evidence {
            EvidenceSource::Hits(path) => {
                let parsed =
                    HomologyRecordStore::read_path(path).map_err(|e| BuildError::io(path, e))?;
                let genes: BTreeSet<&str> =
                    parsed.records.iter().map(|r| r.query_id.as_str()).collect();
                Ok(AlignedData {
                    genes_searched: genes.len(),
                    skipped_lines: parsed.skipped.len(),
                    records: parsed.records,
                    ..AlignedData::default()
                })
            }
            EvidenceSource::Search { queries, subject } => {
                let queries = read_fasta(queries)?;
                tracing::info!(
                    organism = %self.organism.name,
                    queries = queries.len(),
                    "running aligner"
                );
                let results =
                    search_all(&queries, subject, self.searcher, self.search_pool, store.dir())?;
                Ok(AlignedData {
                    skipped_lines: results.hits.skipped.len(),
                    records: results.hits.records,
                    genes_searched: results.genes_searched,
                    genes_without_hits: results.genes_without_hits,
                    genes_timed_out: results.genes_timed_out,
                })
            }
        }
    }

    pub fn run(&self) -> Result<OrganismSummary, BuildError> {
        let name = self.organism.name.as_str();
        self.check_inputs()?;

        let store = CheckpointStore::new(self.work_dir, name);
        let mut stages = StageRunner {
            store: &store,
            stale: !self.resume,
            resumed_from: None,
        };

        let aligned: AlignedData = stages.run(Stage::Aligned, |_| true, || self.align(&store))?;

        let thresholds = self.thresholds;
        let selected: SelectedData = stages.run(
            Stage::Selected,
            |d: &SelectedData| d.thresholds == thresholds,
            || {
                let selection = ThresholdFilter::new(thresholds).select(&aligned.records)?;
                Ok(SelectedData {
                    thresholds,
                    selection,
                })
            },
        )?;

        let drafted: DraftedData = stages.run(
            Stage::Drafted,
            |_| true,
            || {
                Ok(DraftedData {
                    projection: projection::project(
                        &self.reference.reactions,
                        &selected.selection.candidates,
                    ),
                })
            },
        )?;

        let finalized: FinalizedData = stages.run(
            Stage::Finalized,
            |_| true,
            || {
                let table = GeneCorrespondenceTable::read_tsv(&self.organism.correspondence)?;
                tracing::debug!(
                    organism = name,
                    genes = table.gene_count(),
                    proteins = table.protein_count(),
                    "correspondence table loaded"
                );
                let draft = drafted.projection.clone();
                let projected = draft.reactions.len();
                let projector = ReactionRuleProjector::new(&selected.selection.candidates, &table);
                let rewrite = projector.rewrite_atoms_to_genes(draft.reactions);
                Ok(FinalizedData {
                    outcome: projection::finish(
                        projected,
                        draft.dropped,
                        draft.unresolved_atoms,
                        rewrite,
                    ),
                })
            },
        )?;
        let outcome = finalized.outcome;

        let draft = ReactionNetwork::new(format!("{name}_draft"), outcome.clone().into_reactions());
        let draft_path = store.dir().join(DRAFT_FILE);
        draft.write_json(&draft_path)?;

        let rejection_sets = selected.selection.rejections.to_named_sets();
        let clusters = ClusterEnumerator::new(true).enumerate(&rejection_sets)?;
        let title = format!("{name}: rejected hits by criterion");
        let log = UpsetReport::from_clusters(title, &clusters).render_log();
        let log_path = store.dir().join(REJECTIONS_LOG);
        fs::write(&log_path, log).map_err(|e| BuildError::io(&log_path, e))?;

        let selection = &selected.selection;
        let summary = OrganismSummary {
            organism: name.to_string(),
            resumed_from: stages.resumed_from,
            genes_searched: aligned.genes_searched,
            genes_without_hits: aligned.genes_without_hits.len(),
            genes_timed_out: aligned.genes_timed_out.len(),
            hits_skipped_lines: aligned.skipped_lines,
            hits_considered: selection.considered,
            hits_selected: selection.selected,
            candidate_genes: selection.candidates.len(),
            rejections: selection.rejections.counts(),
            reference_reactions: self.reference.len(),
            drafted_reactions: outcome.projected,
            dropped_no_ortholog: outcome.count(ReactionFate::DroppedNoOrtholog),
            dropped_no_correspondence: outcome.count(ReactionFate::DroppedNoCorrespondence),
            final_reactions: outcome.reactions.len(),
            reaction_ids: outcome.reactions.iter().map(|r| r.id().to_string()).collect(),
            draft_path,
        };
        tracing::info!(
            organism = name,
            considered = summary.hits_considered,
            selected = summary.hits_selected,
            drafted = summary.drafted_reactions,
            kept = summary.final_reactions,
            "organism draft finished"
        );
        Ok(summary)
    }
}
