//! Tabular alignment hits.
//!
//! The alignment tool is asked for exactly ten comma-separated fields per
//! match (see [`FIELD_ORDER`]). Each line becomes one immutable
//! [`HomologyRecord`]. Malformed lines are skipped and reported, never fatal.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Column order requested from the alignment tool.
pub const FIELD_ORDER: [&str; 10] = [
    "query_id",
    "query_len",
    "subject_id",
    "subject_len",
    "align_len",
    "n_identical",
    "pct_identity",
    "score",
    "e_value",
    "bit_score",
];

/// One pairwise alignment hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomologyRecord {
    pub query_id: String,
    pub query_len: u64,
    pub subject_id: String,
    pub subject_len: u64,
    pub align_len: u64,
    pub n_identical: u64,
    pub pct_identity: f64,
    pub score: f64,
    pub e_value: f64,
    pub bit_score: f64,
}

impl HomologyRecord {
    /// Stable `query|subject` key, used when hits are grouped into diagnostic sets.
    pub fn key(&self) -> String {
        format!("{}|{}", self.query_id, self.subject_id)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: expected {expected} comma-separated fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: missing {field}")]
    MissingIdentifier { line: usize, field: &'static str },

    #[error("line {line}: invalid {field} `{value}`")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::FieldCount { line, .. }
            | ParseError::MissingIdentifier { line, .. }
            | ParseError::InvalidNumber { line, .. } => *line,
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Parse one line of tabular output. `line_no` is 1-based and only used for
/// error reporting.
pub fn parse_record(line: &str, line_no: usize) -> Result<HomologyRecord, ParseError> {
    let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    if fields.len() != FIELD_ORDER.len() {
        return Err(ParseError::FieldCount {
            line: line_no,
            expected: FIELD_ORDER.len(),
            found: fields.len(),
        });
    }

    let ident = |idx: usize| -> Result<String, ParseError> {
        let value = fields[idx];
        if value.is_empty() {
            return Err(ParseError::MissingIdentifier {
                line: line_no,
                field: FIELD_ORDER[idx],
            });
        }
        Ok(value.to_string())
    };
    let int = |idx: usize| -> Result<u64, ParseError> {
        fields[idx].parse::<u64>().map_err(|_| ParseError::InvalidNumber {
            line: line_no,
            field: FIELD_ORDER[idx],
            value: fields[idx].to_string(),
        })
    };
    let float = |idx: usize| -> Result<f64, ParseError> {
        match fields[idx].parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(ParseError::InvalidNumber {
                line: line_no,
                field: FIELD_ORDER[idx],
                value: fields[idx].to_string(),
            }),
        }
    };

    Ok(HomologyRecord {
        query_id: ident(0)?,
        query_len: int(1)?,
        subject_id: ident(2)?,
        subject_len: int(3)?,
        align_len: int(4)?,
        n_identical: int(5)?,
        pct_identity: float(6)?,
        score: float(7)?,
        e_value: float(8)?,
        bit_score: float(9)?,
    })
}

/// Parsed hits plus the lines that were skipped.
#[derive(Debug, Clone, Default)]
pub struct ParsedHits {
    pub records: Vec<HomologyRecord>,
    pub skipped: Vec<ParseError>,
}

impl ParsedHits {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn extend(&mut self, other: ParsedHits) {
        self.records.extend(other.records);
        self.skipped.extend(other.skipped);
    }
}

/// Turns raw tool output into [`HomologyRecord`]s.
pub struct HomologyRecordStore;

impl HomologyRecordStore {
    /// Parse raw lines, logging and skipping malformed ones.
    pub fn parse<I, S>(raw_lines: I) -> Vec<HomologyRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::parse_lines(raw_lines).records
    }

    /// Like [`HomologyRecordStore::parse`] but keeps the per-line errors.
    pub fn parse_lines<I, S>(raw_lines: I) -> ParsedHits
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = ParsedHits::default();
        for (idx, raw) in raw_lines.into_iter().enumerate() {
            let line = raw.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_record(line, idx + 1) {
                Ok(record) => out.records.push(record),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping malformed alignment line");
                    out.skipped.push(err);
                }
            }
        }
        out
    }

    pub fn parse_str(text: &str) -> ParsedHits {
        Self::parse_lines(text.lines())
    }

    pub fn read_path(path: &Path) -> io::Result<ParsedHits> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse_str(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "G1,100,S1,95,90,72,80.0,400,1e-60,150.5";

    #[test]
    fn parses_all_ten_fields() {
        let r = parse_record(LINE, 1).unwrap();
        assert_eq!(r.query_id, "G1");
        assert_eq!(r.query_len, 100);
        assert_eq!(r.subject_id, "S1");
        assert_eq!(r.subject_len, 95);
        assert_eq!(r.align_len, 90);
        assert_eq!(r.n_identical, 72);
        assert_eq!(r.pct_identity, 80.0);
        assert_eq!(r.score, 400.0);
        assert_eq!(r.e_value, 1e-60);
        assert_eq!(r.bit_score, 150.5);
        assert_eq!(r.key(), "G1|S1");
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = parse_record("G1,100,S1", 7).unwrap_err();
        assert_eq!(
            err,
            ParseError::FieldCount {
                line: 7,
                expected: 10,
                found: 3
            }
        );
        assert_eq!(err.line(), 7);
    }

    #[test]
    fn rejects_missing_identifier() {
        let err = parse_record(",100,S1,95,90,72,80.0,400,1e-60,150", 2).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingIdentifier {
                field: "query_id",
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_numeric_field() {
        let err = parse_record("G1,abc,S1,95,90,72,80.0,400,1e-60,150", 3).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidNumber {
                field: "query_len",
                ..
            }
        ));
    }

    #[test]
    fn one_bad_line_does_not_abort_the_rest() {
        let text = format!("{LINE}\nnot,a,record\n\n# comment\n{}", LINE.replace("S1", "S2"));
        let parsed = HomologyRecordStore::parse_str(&text);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line(), 2);
    }

    #[test]
    fn empty_input_is_valid() {
        let parsed = HomologyRecordStore::parse(Vec::<String>::new());
        assert!(parsed.is_empty());
    }
}
