//! Running the external alignment tool, one call per reference protein.
//!
//! Query files are staged in a scratch directory owned by the calling
//! organism task; the directory is removed on every exit path when its
//! [`tempfile::TempDir`] guard drops. Calls run on a dedicated rayon pool,
//! separate from the per-organism pool.

use bio::io::fasta;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use orthodraft_homology::{HomologyRecordStore, ParsedHits};

use crate::config::AlignerConfig;
use crate::error::BuildError;

// ============================================================================
// Search abstraction
// ============================================================================

/// Result of one query against the subject proteome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Raw tabular lines; empty means the tool ran and found nothing.
    Hits(Vec<String>),
    /// The call was killed after the timeout; treated as "no hit".
    TimedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum AlignmentError {
    #[error("failed to start `{}`: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{}` exited with {status}: {stderr}", program.display())]
    Failed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("IO error while running the aligner: {0}")]
    Io(#[from] io::Error),
}

pub trait SequenceSearch: Send + Sync {
    fn search(&self, query: &Path, subject: &Path) -> Result<SearchOutcome, AlignmentError>;
}

// ============================================================================
// Command-line aligner
// ============================================================================

#[derive(Debug, Clone)]
pub struct CommandSearch {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandSearch {
    pub fn new(config: &AlignerConfig, timeout: Option<Duration>) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout,
        }
    }

    fn render_args(&self, query: &Path, subject: &Path) -> Vec<String> {
        let query = query.to_string_lossy();
        let subject = subject.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{query}", &query).replace("{subject}", &subject))
            .collect()
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

impl SequenceSearch for CommandSearch {
    fn search(&self, query: &Path, subject: &Path) -> Result<SearchOutcome, AlignmentError> {
        let mut child = Command::new(&self.program)
            .args(self.render_args(query, subject))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| AlignmentError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Pipes are drained concurrently so a chatty tool cannot block on a
        // full pipe while we poll for exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if self.timeout.is_some_and(|t| start.elapsed() > t) {
                let _ = child.kill();
                let _ = child.wait();
                // Not joined: a grandchild may still hold the pipes open. The
                // drain threads finish on their own once it exits.
                drop((stdout, stderr));
                return Ok(SearchOutcome::TimedOut);
            }
            thread::sleep(Duration::from_millis(25));
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        if !status.success() {
            return Err(AlignmentError::Failed {
                program: self.program.clone(),
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        let lines = String::from_utf8_lossy(&stdout)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        Ok(SearchOutcome::Hits(lines))
    }
}

// ============================================================================
// Query staging
// ============================================================================

/// Read query proteins with rust-bio. Records without an id or sequence
/// are skipped with a warning.
pub fn parse_fasta<R: io::Read>(reader: R) -> io::Result<Vec<fasta::Record>> {
    let mut records = Vec::new();
    for result in fasta::Reader::new(reader).records() {
        let record = result?;
        if record.id().is_empty() || record.seq().is_empty() {
            tracing::warn!(id = record.id(), "skipping FASTA record without id or sequence");
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

pub fn read_fasta(path: &Path) -> Result<Vec<fasta::Record>, BuildError> {
    let file = File::open(path).map_err(|e| BuildError::io(path, e))?;
    parse_fasta(file).map_err(|e| BuildError::io(path, e))
}

/// Header is the bare id, so the aligner reports it unchanged as `qseqid`.
fn stage_query(path: &Path, query: &fasta::Record) -> io::Result<()> {
    let mut writer = fasta::Writer::to_file(path)?;
    writer.write(query.id(), None, query.seq())?;
    writer.flush()
}

/// Hits gathered for one organism.
#[derive(Debug, Clone, Default)]
pub struct GeneSearchResults {
    pub hits: ParsedHits,
    pub genes_searched: usize,
    pub genes_without_hits: Vec<String>,
    pub genes_timed_out: Vec<String>,
}

/// Search every query against `subject` on `pool`, staging query files
/// under a fresh scratch directory inside `scratch_parent`.
pub fn search_all(
    queries: &[fasta::Record],
    subject: &Path,
    searcher: &dyn SequenceSearch,
    pool: &ThreadPool,
    scratch_parent: &Path,
) -> Result<GeneSearchResults, BuildError> {
    fs::create_dir_all(scratch_parent).map_err(|e| BuildError::io(scratch_parent, e))?;
    let scratch = tempfile::Builder::new()
        .prefix("scratch-")
        .tempdir_in(scratch_parent)
        .map_err(|e| BuildError::io(scratch_parent, e))?;

    let outcomes: Vec<Result<(usize, SearchOutcome), BuildError>> = pool.install(|| {
        queries
            .par_iter()
            .enumerate()
            .map(|(idx, query)| {
                let path = scratch.path().join(format!("query_{idx}.fasta"));
                stage_query(&path, query).map_err(|e| BuildError::io(&path, e))?;
                let outcome = searcher
                    .search(&path, subject)
                    .map_err(|source| BuildError::Alignment {
                        gene: query.id().to_string(),
                        source,
                    })?;
                let _ = fs::remove_file(&path);
                Ok((idx, outcome))
            })
            .collect()
    });

    let mut results = GeneSearchResults {
        genes_searched: queries.len(),
        ..GeneSearchResults::default()
    };
    for outcome in outcomes {
        let (idx, outcome) = outcome?;
        let gene = queries[idx].id().to_string();
        match outcome {
            SearchOutcome::TimedOut => {
                tracing::warn!(gene = %gene, "aligner timed out; treating as no hit");
                results.genes_timed_out.push(gene);
            }
            SearchOutcome::Hits(lines) if lines.is_empty() => {
                results.genes_without_hits.push(gene);
            }
            SearchOutcome::Hits(lines) => {
                results.hits.extend(HomologyRecordStore::parse_lines(lines));
            }
        }
    }
    // `scratch` drops here (or on any early return above) and removes the directory.
    Ok(results)
}
