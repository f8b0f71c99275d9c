//! Reaction networks as handed over by (and back to) the modelling toolkit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::rule::ReactionRule;
use crate::NetworkError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub gene_rule: ReactionRule,
    /// Everything else the toolkit attached to the reaction (equation,
    /// bounds, compartments…). Carried through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Reaction {
    pub fn new(id: impl Into<String>, gene_rule: impl Into<ReactionRule>) -> Self {
        Self {
            id: id.into(),
            name: None,
            gene_rule: gene_rule.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Copy of this reaction carrying a different rule.
    pub fn with_rule(&self, gene_rule: ReactionRule) -> Self {
        Self {
            gene_rule,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionNetwork {
    pub id: String,
    pub reactions: Vec<Reaction>,
}

impl ReactionNetwork {
    pub fn new(id: impl Into<String>, reactions: Vec<Reaction>) -> Self {
        Self {
            id: id.into(),
            reactions,
        }
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Parse a `reaction_id\trule[\tname]` table. Rows without a tab are
    /// skipped with a warning; a reaction with an empty rule is kept (it will
    /// simply never project).
    pub fn parse_rule_table(id: &str, text: &str) -> Self {
        let mut reactions = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 2 || cols[0].trim().is_empty() {
                tracing::warn!(line = idx + 1, "skipping malformed rule-table row");
                continue;
            }
            let mut reaction = Reaction::new(cols[0].trim(), ReactionRule::parse(cols[1]));
            if let Some(name) = cols.get(2).map(|s| s.trim()).filter(|s| !s.is_empty()) {
                reaction.name = Some(name.to_string());
            }
            reactions.push(reaction);
        }
        Self::new(id, reactions)
    }

    pub fn from_json_str(text: &str) -> Result<Self, NetworkError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String, NetworkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a network; `.json` files are read as JSON, anything else as a
    /// rule table named after the file stem.
    pub fn read_path(path: &Path) -> Result<Self, NetworkError> {
        let text = fs::read_to_string(path).map_err(|source| NetworkError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            let id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("reference");
            Ok(Self::parse_rule_table(id, &text))
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<(), NetworkError> {
        let text = self.to_json_string()?;
        fs::write(path, text).map_err(|source| NetworkError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_table_rows() {
        let net = ReactionNetwork::parse_rule_table(
            "ref",
            "R1\tg1 or g2\tFirst\nbroken row\nR2\t\n# comment\nR3\tg3\n",
        );
        assert_eq!(net.len(), 3);
        assert_eq!(net.reactions[0].name.as_deref(), Some("First"));
        assert_eq!(net.reactions[0].gene_rule.atoms(), &["g1", "g2"]);
        assert!(net.reaction("R2").is_some_and(|r| r.gene_rule.is_empty()));
    }

    #[test]
    fn json_round_trip_keeps_rule_as_text() {
        let mut r = Reaction::new("R1", "a or b");
        r.attributes.insert("equation".into(), "A => B".into());
        let net = ReactionNetwork::new("ref", vec![r]);
        let text = net.to_json_string().unwrap();
        assert!(text.contains("\"gene_rule\": \"a OR b\""));
        assert_eq!(ReactionNetwork::from_json_str(&text).unwrap(), net);
    }

    #[test]
    fn with_rule_copies_everything_else() {
        let mut r = Reaction::new("R1", "a");
        r.name = Some("n".into());
        let copy = r.with_rule(ReactionRule::parse("x or y"));
        assert_eq!(copy.name, r.name);
        assert_eq!(copy.gene_rule.to_string(), "x OR y");
        assert_eq!(r.gene_rule.to_string(), "a");
    }
}
