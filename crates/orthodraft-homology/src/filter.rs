//! Threshold-based ortholog selection.
//!
//! A hit is kept only if it passes all five [`Criterion`]s. Every passing hit
//! is kept: there is no best-hit reduction, so one reference gene may map to
//! several subject genes and vice versa.
//!
//! Rejected hits are bucketed by criterion. A hit failing several criteria
//! appears in several buckets; downstream upset diagnostics rely on that.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::record::HomologyRecord;
use crate::thresholds::SelectionThresholds;

// ============================================================================
// Criteria
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Criterion {
    #[serde(rename = "Identity")]
    Identity,
    #[serde(rename = "Length difference")]
    LengthDifference,
    #[serde(rename = "Coverage")]
    Coverage,
    #[serde(rename = "Bit score")]
    BitScore,
    #[serde(rename = "E-value")]
    EValue,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Identity,
        Criterion::LengthDifference,
        Criterion::Coverage,
        Criterion::BitScore,
        Criterion::EValue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Criterion::Identity => "Identity",
            Criterion::LengthDifference => "Length difference",
            Criterion::Coverage => "Coverage",
            Criterion::BitScore => "Bit score",
            Criterion::EValue => "E-value",
        }
    }

    /// Whether `r` satisfies this criterion. All bounds are inclusive.
    pub fn holds(self, r: &HomologyRecord, t: &SelectionThresholds) -> bool {
        match self {
            Criterion::Identity => r.pct_identity >= t.min_identity(),
            // Both sides scaled by 100 so whole-number percentages compare exactly.
            Criterion::LengthDifference => {
                let qlen = r.query_len as f64;
                let slen = r.subject_len as f64 * 100.0;
                let low = qlen * (100.0 - t.max_length_diff_pct());
                let high = qlen * (100.0 + t.max_length_diff_pct());
                low <= slen && slen <= high
            }
            Criterion::Coverage => {
                r.align_len as f64 * 100.0 >= t.min_coverage_pct() * r.query_len as f64
            }
            Criterion::BitScore => r.bit_score >= t.min_bit_score(),
            Criterion::EValue => r.e_value <= t.max_e_value(),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Candidate map
// ============================================================================

/// Reference gene id → subject gene ids that passed selection.
///
/// Keys are ordered; each gene's candidates keep first-insertion order and
/// hold no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateGeneMap {
    genes: BTreeMap<String, Vec<String>>,
}

impl CandidateGeneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference_gene: &str, subject_gene: &str) {
        let entry = self.genes.entry(reference_gene.to_string()).or_default();
        if !entry.iter().any(|s| s == subject_gene) {
            entry.push(subject_gene.to_string());
        }
    }

    pub fn get(&self, reference_gene: &str) -> Option<&[String]> {
        self.genes.get(reference_gene).map(Vec::as_slice)
    }

    pub fn contains(&self, reference_gene: &str, subject_gene: &str) -> bool {
        self.get(reference_gene)
            .is_some_and(|subjects| subjects.iter().any(|s| s == subject_gene))
    }

    /// Number of reference genes with at least one candidate.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Number of (reference, subject) pairs.
    pub fn pair_count(&self) -> usize {
        self.genes.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.genes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Order-independent view, for comparing two maps.
    pub fn as_sets(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        self.genes
            .iter()
            .map(|(k, v)| (k.as_str(), v.iter().map(String::as_str).collect()))
            .collect()
    }
}

impl<Q: AsRef<str>, S: AsRef<str>> FromIterator<(Q, S)> for CandidateGeneMap {
    fn from_iter<I: IntoIterator<Item = (Q, S)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (q, s) in iter {
            map.insert(q.as_ref(), s.as_ref());
        }
        map
    }
}

// ============================================================================
// Rejections
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RejectionReport {
    buckets: BTreeMap<Criterion, Vec<HomologyRecord>>,
}

impl RejectionReport {
    fn push(&mut self, criterion: Criterion, record: &HomologyRecord) {
        self.buckets
            .entry(criterion)
            .or_default()
            .push(record.clone());
    }

    pub fn bucket(&self, criterion: Criterion) -> &[HomologyRecord] {
        self.buckets
            .get(&criterion)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Criterion, &[HomologyRecord])> {
        self.buckets.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    /// Criterion name → number of hits in its bucket. Every criterion is
    /// present, with zero when nothing failed it.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        Criterion::ALL
            .iter()
            .map(|c| (c.name().to_string(), self.bucket(*c).len()))
            .collect()
    }

    /// Criterion name → set of `query|subject` keys, for upset diagnostics.
    pub fn to_named_sets(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.buckets
            .iter()
            .map(|(c, records)| {
                (
                    c.name().to_string(),
                    records.iter().map(HomologyRecord::key).collect(),
                )
            })
            .collect()
    }
}

// ============================================================================
// Selection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("no alignment evidence: selection has not been run on any hits")]
    NoEvidence,
}

/// Outcome of one selection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub considered: usize,
    pub selected: usize,
    pub candidates: CandidateGeneMap,
    pub rejections: RejectionReport,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdFilter {
    thresholds: SelectionThresholds,
}

impl ThresholdFilter {
    pub fn new(thresholds: SelectionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SelectionThresholds {
        &self.thresholds
    }

    /// Criteria that `record` fails, in [`Criterion::ALL`] order.
    pub fn failed_criteria(&self, record: &HomologyRecord) -> Vec<Criterion> {
        Criterion::ALL
            .into_iter()
            .filter(|c| !c.holds(record, &self.thresholds))
            .collect()
    }

    pub fn passes(&self, record: &HomologyRecord) -> bool {
        Criterion::ALL
            .iter()
            .all(|c| c.holds(record, &self.thresholds))
    }

    pub fn select(&self, records: &[HomologyRecord]) -> Result<Selection, SelectionError> {
        if records.is_empty() {
            return Err(SelectionError::NoEvidence);
        }

        let mut selection = Selection {
            considered: records.len(),
            ..Selection::default()
        };
        for record in records {
            let failed = self.failed_criteria(record);
            if failed.is_empty() {
                selection
                    .candidates
                    .insert(&record.query_id, &record.subject_id);
                selection.selected += 1;
            } else {
                for criterion in failed {
                    selection.rejections.push(criterion, record);
                }
            }
        }

        tracing::debug!(
            considered = selection.considered,
            selected = selection.selected,
            genes = selection.candidates.len(),
            "threshold selection finished"
        );
        Ok(selection)
    }
}

/// Convenience wrapper around [`ThresholdFilter::select`].
pub fn select(
    records: &[HomologyRecord],
    thresholds: &SelectionThresholds,
) -> Result<Selection, SelectionError> {
    ThresholdFilter::new(*thresholds).select(records)
}
