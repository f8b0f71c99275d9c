//! Gene ↔ protein correspondence.
//!
//! Built once per organism from a header-less `gene\tprotein` table. A
//! protein belongs to exactly one gene; a gene may own several proteins.
//! Lookups are case-insensitive.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::NetworkError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneCorrespondenceTable {
    gene_to_proteins: BTreeMap<String, BTreeSet<String>>,
    /// Uppercased protein id → owning gene id.
    protein_to_gene: HashMap<String, String>,
    /// Uppercased gene id → gene id as written in the table.
    genes: HashMap<String, String>,
}

impl GeneCorrespondenceTable {
    pub fn build<I, G, P>(annotation_pairs: I) -> Self
    where
        I: IntoIterator<Item = (G, P)>,
        G: AsRef<str>,
        P: AsRef<str>,
    {
        let mut table = Self::default();
        for (gene, protein) in annotation_pairs {
            table.insert(gene.as_ref(), protein.as_ref());
        }
        table
    }

    fn insert(&mut self, gene: &str, protein: &str) {
        let gene = gene.trim();
        let protein = protein.trim();
        if gene.is_empty() || protein.is_empty() {
            return;
        }

        let gene_key = gene.to_uppercase();
        let gene_id = self
            .genes
            .get(&gene_key)
            .cloned()
            .unwrap_or_else(|| gene.to_string());

        let key = protein.to_uppercase();
        match self.protein_to_gene.get(&key) {
            Some(owner) if owner != &gene_id => {
                tracing::warn!(
                    protein,
                    owner = %owner,
                    ignored = %gene_id,
                    "protein already owned by another gene; keeping first owner"
                );
                return;
            }
            Some(_) => {}
            None => {
                self.protein_to_gene.insert(key, gene_id.clone());
            }
        }
        // Registered only once the row is accepted.
        self.genes.entry(gene_key).or_insert_with(|| gene_id.clone());
        self.gene_to_proteins
            .entry(gene_id)
            .or_default()
            .insert(protein.to_string());
    }

    pub fn parse_tsv(text: &str) -> Self {
        let mut table = Self::default();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut cols = line.split('\t');
            match (cols.next(), cols.next()) {
                (Some(gene), Some(protein))
                    if !gene.trim().is_empty() && !protein.trim().is_empty() =>
                {
                    table.insert(gene, protein)
                }
                _ => {
                    tracing::warn!(line = idx + 1, "skipping malformed correspondence row");
                }
            }
        }
        table
    }

    pub fn read_tsv(path: &Path) -> Result<Self, NetworkError> {
        let text = fs::read_to_string(path).map_err(|source| NetworkError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse_tsv(&text))
    }

    /// Resolve a rule atom to a gene id.
    ///
    /// Protein lookup first; on a miss the atom is accepted if it is itself a
    /// known gene id. Anything else resolves to nothing.
    pub fn resolve(&self, atom: &str) -> Option<&str> {
        let key = atom.trim().to_uppercase();
        if let Some(gene) = self.protein_to_gene.get(&key) {
            return Some(gene.as_str());
        }
        self.genes.get(&key).map(String::as_str)
    }

    pub fn proteins_of(&self, gene: &str) -> Option<&BTreeSet<String>> {
        let gene_id = self.genes.get(&gene.trim().to_uppercase())?;
        self.gene_to_proteins.get(gene_id)
    }

    pub fn gene_count(&self) -> usize {
        self.gene_to_proteins.len()
    }

    pub fn protein_count(&self) -> usize {
        self.protein_to_gene.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gene_to_proteins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> GeneCorrespondenceTable {
        GeneCorrespondenceTable::build([
            ("geneA", "protA.1"),
            ("geneA", "protA.2"),
            ("geneB", "protB"),
        ])
    }

    #[test]
    fn protein_resolves_to_owner() {
        let t = table();
        assert_eq!(t.resolve("protA.2"), Some("geneA"));
        assert_eq!(t.resolve("PROTB"), Some("geneB"));
    }

    #[test]
    fn gene_resolves_to_itself() {
        let t = table();
        assert_eq!(t.resolve("geneB"), Some("geneB"));
        assert_eq!(t.resolve("genea"), Some("geneA"));
    }

    #[test]
    fn unknown_atom_resolves_to_nothing() {
        assert_eq!(table().resolve("protC"), None);
        assert_eq!(table().resolve("protA"), None);
    }

    #[test]
    fn protein_lookup_wins_over_gene_lookup() {
        // `X` is both a protein of geneY and the name of a gene.
        let t = GeneCorrespondenceTable::build([("geneY", "X"), ("X", "protX")]);
        assert_eq!(t.resolve("X"), Some("geneY"));
    }

    #[test]
    fn first_owner_is_kept() {
        let t = GeneCorrespondenceTable::build([("g1", "p"), ("g2", "p")]);
        assert_eq!(t.resolve("p"), Some("g1"));
        assert_eq!(t.protein_count(), 1);
    }

    #[test]
    fn gene_whose_only_row_conflicts_is_not_registered() {
        let t = GeneCorrespondenceTable::build([("g1", "p"), ("g2", "P")]);
        assert_eq!(t.resolve("g2"), None);
        assert_eq!(t.proteins_of("g2"), None);
        assert_eq!(t.gene_count(), 1);

        let t = GeneCorrespondenceTable::build([("g1", "p"), ("g2", "p"), ("g2", "q")]);
        assert_eq!(t.resolve("g2"), Some("g2"));
        assert_eq!(t.resolve("q"), Some("g2"));
        assert_eq!(t.gene_count(), 2);
    }

    #[test]
    fn tsv_parsing_skips_bad_rows() {
        let t = GeneCorrespondenceTable::parse_tsv("g1\tp1\n\nbroken\ng1\tp2\ng2\tp3\n");
        assert_eq!(t.gene_count(), 2);
        assert_eq!(t.protein_count(), 3);
        assert_eq!(t.proteins_of("G1").map(|p| p.len()), Some(2));
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let pairs = [("g1", "p1"), ("g2", "p2"), ("g1", "p3")];
        assert_eq!(
            GeneCorrespondenceTable::build(pairs),
            GeneCorrespondenceTable::build(pairs)
        );
    }
}
