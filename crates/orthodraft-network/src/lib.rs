//! Orthodraft network: reference reactions, gene correspondence, projection.
//!
//! - [`rule`]: OR-only gene-reaction rules
//! - [`network`]: reactions and networks, JSON and rule-table IO
//! - [`correspondence`]: gene ↔ protein table with two-step atom resolution
//! - [`projection`]: the ortholog pass and the correspondence pass

use std::path::PathBuf;

pub mod correspondence;
pub mod network;
pub mod projection;
pub mod rule;

pub use correspondence::GeneCorrespondenceTable;
pub use network::{Reaction, ReactionNetwork};
pub use projection::{
    project, rewrite_atoms_to_genes, DraftOutcome, DraftReaction, FinalizedReaction, Projection,
    ReactionFate, ReactionRuleProjector, Rewrite, UnresolvedAtom,
};
pub use rule::ReactionRule;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid network JSON: {0}")]
    Json(#[from] serde_json::Error),
}
