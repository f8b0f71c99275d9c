//! OR-only gene-reaction rules.
//!
//! Rules are read as a flat disjunction of atoms. Nothing else is
//! interpreted: a fragment such as `(a and b)` stays one verbatim atom.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ReactionRule {
    atoms: Vec<String>,
}

impl ReactionRule {
    pub fn parse(text: &str) -> Self {
        let mut atoms = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for token in text.split_whitespace() {
            if token.eq_ignore_ascii_case("or") {
                push_atom(&mut atoms, &current);
                current.clear();
            } else {
                current.push(token);
            }
        }
        push_atom(&mut atoms, &current);
        Self { atoms }
    }

    pub fn from_atoms<I, S>(atoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            atoms: atoms
                .into_iter()
                .map(Into::into)
                .filter(|a: &String| !a.trim().is_empty())
                .collect(),
        }
    }

    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

fn push_atom(atoms: &mut Vec<String>, tokens: &[&str]) {
    let joined = tokens.join(" ");
    let atom = joined.trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace());
    if !atom.is_empty() {
        atoms.push(atom.to_string());
    }
}

impl fmt::Display for ReactionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.atoms.join(" OR "))
    }
}

impl From<String> for ReactionRule {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for ReactionRule {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<ReactionRule> for String {
    fn from(rule: ReactionRule) -> Self {
        rule.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_or_case_insensitively() {
        let r = ReactionRule::parse("g1 or G2 OR g3");
        assert_eq!(r.atoms(), &["g1", "G2", "g3"]);
        assert_eq!(r.to_string(), "g1 OR G2 OR g3");
    }

    #[test]
    fn strips_outer_parentheses() {
        let r = ReactionRule::parse("(g1 or g2)");
        assert_eq!(r.atoms(), &["g1", "g2"]);
    }

    #[test]
    fn non_or_logic_is_kept_verbatim() {
        let r = ReactionRule::parse("(a and b) or c");
        assert_eq!(r.atoms(), &["a and b", "c"]);
    }

    #[test]
    fn empty_text_is_empty_rule() {
        assert!(ReactionRule::parse("  ").is_empty());
        assert!(ReactionRule::parse("or").is_empty());
    }

    #[test]
    fn atom_ids_containing_or_are_not_split() {
        let r = ReactionRule::parse("orf12 OR flavor1");
        assert_eq!(r.atoms(), &["orf12", "flavor1"]);
    }
}
