//! Build configuration (JSON).
//!
//! Relative paths are resolved against the directory holding the config file.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use orthodraft_homology::{SelectionThresholds, FIELD_ORDER};

pub const SEARCH_TIMEOUT_SECS_ENV: &str = "ORTHODRAFT_SEARCH_TIMEOUT_SECS";

/// Alignment tool invocation. `{query}` and `{subject}` in `args` are
/// replaced with the staged query file and the subject proteome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignerConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        let outfmt = format!(
            "10 {}",
            [
                "qseqid", "qlen", "sseqid", "slen", "length", "nident", "pident", "score",
                "evalue", "bitscore",
            ]
            .join(" ")
        );
        debug_assert_eq!(outfmt.split(' ').count(), FIELD_ORDER.len() + 1);
        Self {
            program: PathBuf::from("blastp"),
            args: vec![
                "-query".to_string(),
                "{query}".to_string(),
                "-subject".to_string(),
                "{subject}".to_string(),
                "-outfmt".to_string(),
                outfmt,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    /// Pre-computed tabular hits.
    Hits(PathBuf),
    /// Run the aligner: one call per reference protein in `queries`
    /// against the `subject` proteome.
    Search { queries: PathBuf, subject: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganismConfig {
    pub name: String,
    /// `gene\tprotein` table for this organism.
    pub correspondence: PathBuf,
    pub evidence: EvidenceSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub work_dir: PathBuf,
    /// Reference network (`.json`, or a `reaction\trule` table).
    pub reference: PathBuf,
    #[serde(default)]
    pub thresholds: SelectionThresholds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organism_workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_workers: Option<usize>,
    /// Per-call aligner timeout in seconds; `0` disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_timeout_secs: Option<u64>,
    #[serde(default)]
    pub resume: bool,
    #[serde(default)]
    pub aligner: AlignerConfig,
    pub organisms: Vec<OrganismConfig>,
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn resolve(base: &Path, p: &mut PathBuf) {
    if p.is_relative() {
        *p = base.join(&*p);
    }
}

impl BuildConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: BuildConfig = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_relative_to(base);
        config.validate()?;
        Ok(config)
    }

    pub fn resolve_relative_to(&mut self, base: &Path) {
        resolve(base, &mut self.work_dir);
        resolve(base, &mut self.reference);
        for org in &mut self.organisms {
            resolve(base, &mut org.correspondence);
            match &mut org.evidence {
                EvidenceSource::Hits(p) => resolve(base, p),
                EvidenceSource::Search { queries, subject } => {
                    resolve(base, queries);
                    resolve(base, subject);
                }
            }
        }
    }

    /// Organism names become directory names, so they must be unique and
    /// path-safe.
    pub fn validate(&self) -> Result<()> {
        if self.organisms.is_empty() {
            return Err(anyhow!("config lists no organisms"));
        }
        let mut seen = BTreeSet::new();
        for org in &self.organisms {
            let name = org.name.as_str();
            let safe = !name.is_empty()
                && name != "."
                && name != ".."
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
            if !safe {
                return Err(anyhow!(
                    "invalid organism name {name:?} (use letters, digits, `_`, `-`, `.`)"
                ));
            }
            if !seen.insert(name) {
                return Err(anyhow!("duplicate organism name {name:?}"));
            }
        }
        if self.organism_workers == Some(0) || self.search_workers == Some(0) {
            return Err(anyhow!("worker counts must be at least 1"));
        }
        Ok(())
    }

    /// Outer pool size: one task per organism, leaving a core for the
    /// controlling process.
    pub fn organism_workers(&self) -> usize {
        let default = available_cores().saturating_sub(1).max(1);
        self.organism_workers
            .unwrap_or(default)
            .min(self.organisms.len().max(1))
    }

    pub fn search_workers(&self) -> usize {
        self.search_workers
            .unwrap_or_else(|| available_cores().saturating_sub(1).max(1))
    }

    /// Effective aligner timeout.
    ///
    /// Precedence: `ORTHODRAFT_SEARCH_TIMEOUT_SECS`, then the config value,
    /// then no timeout. `0` disables it.
    pub fn search_timeout(&self) -> Result<Option<Duration>> {
        let secs = match std::env::var(SEARCH_TIMEOUT_SECS_ENV) {
            Ok(v) if !v.trim().is_empty() => {
                let v = v.trim();
                v.parse::<u64>().map_err(|_| {
                    anyhow!(
                        "invalid {SEARCH_TIMEOUT_SECS_ENV}={v:?} \
                         (expected integer seconds; 0 disables)"
                    )
                })?
            }
            Ok(_) | Err(std::env::VarError::NotPresent) => self.search_timeout_secs.unwrap_or(0),
            Err(e) => return Err(anyhow!("failed to read {SEARCH_TIMEOUT_SECS_ENV}: {e}")),
        };
        Ok((secs > 0).then(|| Duration::from_secs(secs)))
    }
}
