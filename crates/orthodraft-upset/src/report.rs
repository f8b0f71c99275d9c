//! Upset-style reports built from [`Clusters`].

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Write as _};

use crate::cluster::Clusters;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsetRow {
    pub labels: Vec<String>,
    pub count: usize,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsetReport {
    pub title: String,
    pub rows: Vec<UpsetRow>,
}

impl UpsetReport {
    /// Rows are ordered by descending count, ties by label list.
    pub fn from_clusters<L, T>(title: impl Into<String>, clusters: &Clusters<L, T>) -> Self
    where
        L: Ord + Display,
        T: Ord + Display,
    {
        let mut rows: Vec<UpsetRow> = clusters
            .iter()
            .map(|c| UpsetRow {
                labels: c.labels.iter().map(ToString::to_string).collect(),
                count: c.members.len(),
                members: c.members.iter().map(ToString::to_string).collect(),
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.labels.cmp(&b.labels)));
        Self {
            title: title.into(),
            rows,
        }
    }

    pub fn total(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    /// Human-readable grouping of members by the subset they exclusively
    /// belong to.
    pub fn render_log(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {} ({} elements)", self.title, self.total());
        for row in &self.rows {
            let _ = writeln!(out, "{} ({})", row.labels.join(" & "), row.count);
            for member in &row.members {
                let _ = writeln!(out, "  {member}");
            }
        }
        out
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterEnumerator;
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn rows_sorted_and_rendered() {
        let sets = BTreeMap::from([
            ("org1", BTreeSet::from(["R1", "R2", "R3"])),
            ("org2", BTreeSet::from(["R2", "R3"])),
        ]);
        let clusters = ClusterEnumerator::new(true).enumerate(&sets).unwrap();
        let report = UpsetReport::from_clusters("reactions", &clusters);

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].labels, vec!["org1", "org2"]);
        assert_eq!(report.rows[0].count, 2);
        assert_eq!(report.total(), 3);

        let log = report.render_log();
        assert!(log.starts_with("# reactions (3 elements)\n"));
        assert!(log.contains("org1 & org2 (2)\n  R2\n  R3\n"));
        assert!(log.contains("org1 (1)\n  R1\n"));
    }
}
