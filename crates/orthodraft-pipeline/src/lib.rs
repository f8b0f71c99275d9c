//! Orthodraft pipeline: draft reaction networks for many organisms at once.
//!
//! ```text
//!   BuildConfig ──► BuildOrchestrator ──► (per organism, in parallel)
//!                                          ├─ Aligned    hits file or aligner runs
//!                                          ├─ Selected   threshold filter
//!                                          ├─ Drafted    ortholog projection
//!                                          └─ Finalized  gene correspondence
//!                                        ──► BuildReport (report.json)
//! ```
//!
//! - [`config`]: JSON build configuration and environment overrides
//! - [`search`]: the external aligner seam and query staging
//! - [`checkpoint`]: named, atomically written stage checkpoints
//! - [`organism`]: the single-organism stage machine
//! - [`orchestrator`]: pools, failure isolation, run report
//! - [`report`]: per-organism summaries

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod organism;
pub mod report;
pub mod search;

pub use checkpoint::{CheckpointStore, Stage};
pub use config::{
    AlignerConfig, BuildConfig, EvidenceSource, OrganismConfig, SEARCH_TIMEOUT_SECS_ENV,
};
pub use error::BuildError;
pub use orchestrator::{BuildOrchestrator, REACTIONS_UPSET_LOG, REPORT_FILE};
pub use organism::{OrganismBuild, DRAFT_FILE, REJECTIONS_LOG};
pub use report::{BuildReport, OrganismOutcome, OrganismStatus, OrganismSummary};
pub use search::{
    parse_fasta, read_fasta, search_all, AlignmentError, CommandSearch, GeneSearchResults,
    SearchOutcome, SequenceSearch,
};
