//! Projection of reference gene rules onto a target organism.
//!
//! Two passes, each modelled as a typestate so a reaction cannot skip or
//! repeat a pass:
//!
//! ```text
//!   Reaction ──project──► DraftReaction ──rewrite_atoms_to_genes──► FinalizedReaction
//!      │                        │
//!      └─► DroppedNoOrtholog    └─► DroppedNoCorrespondence
//! ```
//!
//! 1. Every atom is replaced by its ortholog candidates (concatenated, duplicates kept).
//!    Atoms without candidates are skipped; a reaction with no candidates at all is dropped.
//! 2. Every atom of a draft rule is resolved to a gene id through the
//!    correspondence table. The rule becomes the sorted, deduplicated set of
//!    resolved genes; a reaction left with nothing is dropped.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use orthodraft_homology::CandidateGeneMap;

use crate::correspondence::GeneCorrespondenceTable;
use crate::network::Reaction;
use crate::rule::ReactionRule;

// ============================================================================
// Typestate
// ============================================================================

/// A reaction that survived the ortholog pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftReaction(Reaction);

/// A reaction whose rule names target-organism genes only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalizedReaction(Reaction);

impl DraftReaction {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn as_reaction(&self) -> &Reaction {
        &self.0
    }

    pub fn into_reaction(self) -> Reaction {
        self.0
    }
}

impl FinalizedReaction {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn as_reaction(&self) -> &Reaction {
        &self.0
    }

    pub fn into_reaction(self) -> Reaction {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionFate {
    FinalizedWithGenes,
    DroppedNoOrtholog,
    DroppedNoCorrespondence,
}

impl ReactionFate {
    pub fn is_kept(self) -> bool {
        matches!(self, ReactionFate::FinalizedWithGenes)
    }
}

/// An atom that could not be carried over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedAtom {
    pub reaction_id: String,
    pub atom: String,
}

// ============================================================================
// Pass 1: orthologs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub reactions: Vec<DraftReaction>,
    /// Reactions with no ortholog for any atom.
    pub dropped: Vec<String>,
    pub unresolved_atoms: Vec<UnresolvedAtom>,
}

pub fn project(reference_rules: &[Reaction], candidates: &CandidateGeneMap) -> Projection {
    let mut out = Projection::default();
    for reaction in reference_rules {
        let mut to_add: Vec<&str> = Vec::new();
        for atom in reaction.gene_rule.atoms() {
            match candidates.get(atom) {
                Some(subjects) if !subjects.is_empty() => {
                    to_add.extend(subjects.iter().map(String::as_str));
                }
                _ => {
                    tracing::debug!(reaction = %reaction.id, atom = %atom, "no ortholog for atom");
                    out.unresolved_atoms.push(UnresolvedAtom {
                        reaction_id: reaction.id.clone(),
                        atom: atom.clone(),
                    });
                }
            }
        }

        if to_add.is_empty() {
            tracing::debug!(reaction = %reaction.id, "dropping reaction: no ortholog");
            out.dropped.push(reaction.id.clone());
            continue;
        }
        let rule = ReactionRule::from_atoms(to_add);
        out.reactions.push(DraftReaction(reaction.with_rule(rule)));
    }
    out
}

// ============================================================================
// Pass 2: correspondence
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewrite {
    pub reactions: Vec<FinalizedReaction>,
    /// Reactions whose every atom failed to resolve to a gene.
    pub dropped: Vec<String>,
    pub unresolved_atoms: Vec<UnresolvedAtom>,
}

pub fn rewrite_atoms_to_genes(
    draft_reactions: Vec<DraftReaction>,
    correspondence: &GeneCorrespondenceTable,
) -> Rewrite {
    let mut out = Rewrite::default();
    for DraftReaction(reaction) in draft_reactions {
        let mut genes: BTreeSet<String> = BTreeSet::new();
        for atom in reaction.gene_rule.atoms() {
            match correspondence.resolve(atom) {
                Some(gene) => {
                    genes.insert(gene.to_string());
                }
                None => {
                    tracing::debug!(
                        reaction = %reaction.id,
                        atom = %atom,
                        "atom has no gene correspondence"
                    );
                    out.unresolved_atoms.push(UnresolvedAtom {
                        reaction_id: reaction.id.clone(),
                        atom: atom.clone(),
                    });
                }
            }
        }

        if genes.is_empty() {
            tracing::debug!(reaction = %reaction.id, "dropping reaction: no gene correspondence");
            out.dropped.push(reaction.id);
            continue;
        }
        let rule = ReactionRule::from_atoms(genes);
        out.reactions.push(FinalizedReaction(reaction.with_rule(rule)));
    }
    out
}

// ============================================================================
// Both passes
// ============================================================================

/// Result of running both passes over a reference network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOutcome {
    pub projected: usize,
    pub reactions: Vec<FinalizedReaction>,
    pub fates: BTreeMap<String, ReactionFate>,
    pub unresolved_orthologs: Vec<UnresolvedAtom>,
    pub unresolved_genes: Vec<UnresolvedAtom>,
}

impl DraftOutcome {
    pub fn count(&self, fate: ReactionFate) -> usize {
        self.fates.values().filter(|f| **f == fate).count()
    }

    pub fn into_reactions(self) -> Vec<Reaction> {
        self.reactions
            .into_iter()
            .map(FinalizedReaction::into_reaction)
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReactionRuleProjector<'a> {
    candidates: &'a CandidateGeneMap,
    correspondence: &'a GeneCorrespondenceTable,
}

impl<'a> ReactionRuleProjector<'a> {
    pub fn new(
        candidates: &'a CandidateGeneMap,
        correspondence: &'a GeneCorrespondenceTable,
    ) -> Self {
        Self {
            candidates,
            correspondence,
        }
    }

    pub fn project(&self, reference_rules: &[Reaction]) -> Projection {
        project(reference_rules, self.candidates)
    }

    pub fn rewrite_atoms_to_genes(&self, draft_reactions: Vec<DraftReaction>) -> Rewrite {
        rewrite_atoms_to_genes(draft_reactions, self.correspondence)
    }

    pub fn run(&self, reference_rules: &[Reaction]) -> DraftOutcome {
        let projection = self.project(reference_rules);
        let projected = projection.reactions.len();
        let rewrite = self.rewrite_atoms_to_genes(projection.reactions);
        finish(projected, projection.dropped, projection.unresolved_atoms, rewrite)
    }
}

/// Combine the two passes' bookkeeping into a [`DraftOutcome`].
pub fn finish(
    projected: usize,
    dropped_no_ortholog: Vec<String>,
    unresolved_orthologs: Vec<UnresolvedAtom>,
    rewrite: Rewrite,
) -> DraftOutcome {
    let mut fates = BTreeMap::new();
    for id in dropped_no_ortholog {
        fates.insert(id, ReactionFate::DroppedNoOrtholog);
    }
    for id in rewrite.dropped {
        fates.insert(id, ReactionFate::DroppedNoCorrespondence);
    }
    for r in &rewrite.reactions {
        fates.insert(r.id().to_string(), ReactionFate::FinalizedWithGenes);
    }
    DraftOutcome {
        projected,
        reactions: rewrite.reactions,
        fates,
        unresolved_orthologs,
        unresolved_genes: rewrite.unresolved_atoms,
    }
}
