//! Multi-organism build.
//!
//! ```text
//!   organism pool (organism_workers)        search pool (search_workers)
//!   ┌──────────┐ ┌──────────┐               ┌────────┐ ┌────────┐
//!   │ ecoli    │ │ bsub     │ ... ──────►   │ query  │ │ query  │ ...
//!   └──────────┘ └──────────┘               └────────┘ └────────┘
//! ```
//!
//! Organisms are independent: the reference network and thresholds are
//! shared read-only, and each organism writes only below its own directory.
//! A failure (error or panic) in one organism is recorded in the report and
//! never stops the others.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use orthodraft_network::ReactionNetwork;
use orthodraft_upset::MAX_LABELS;

use crate::config::BuildConfig;
use crate::organism::OrganismBuild;
use crate::report::{BuildReport, OrganismOutcome, OrganismStatus};
use crate::search::{CommandSearch, SequenceSearch};

pub const REPORT_FILE: &str = "report.json";
pub const REACTIONS_UPSET_LOG: &str = "reactions_upset.log";

pub struct BuildOrchestrator {
    config: BuildConfig,
    searcher: Arc<dyn SequenceSearch>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl BuildOrchestrator {
    /// Orchestrator running the configured command-line aligner.
    pub fn new(config: BuildConfig) -> Result<Self> {
        let timeout = config.search_timeout()?;
        let searcher = Arc::new(CommandSearch::new(&config.aligner, timeout));
        Ok(Self { config, searcher })
    }

    pub fn with_searcher(config: BuildConfig, searcher: Arc<dyn SequenceSearch>) -> Self {
        Self { config, searcher }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn report_path(&self) -> PathBuf {
        self.config.work_dir.join(REPORT_FILE)
    }

    /// Build every organism and write the run report.
    ///
    /// Only setup problems (unreadable reference, pool creation, report
    /// write) return `Err`; per-organism failures land in the report.
    pub fn run(&self) -> Result<BuildReport> {
        let config = &self.config;
        let started_at = Utc::now();
        fs::create_dir_all(&config.work_dir)
            .with_context(|| format!("failed to create work dir {}", config.work_dir.display()))?;

        let reference = ReactionNetwork::read_path(&config.reference)
            .with_context(|| {
                format!("failed to load reference network {}", config.reference.display())
            })?;
        if reference.is_empty() {
            tracing::warn!(
                reference = %config.reference.display(),
                "reference network has no reactions"
            );
        }

        let organism_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.organism_workers())
            .thread_name(|i| format!("organism-{i}"))
            .build()
            .map_err(|e| anyhow!("failed to build organism pool: {e}"))?;
        let search_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.search_workers())
            .thread_name(|i| format!("search-{i}"))
            .build()
            .map_err(|e| anyhow!("failed to build search pool: {e}"))?;

        tracing::info!(
            organisms = config.organisms.len(),
            reactions = reference.len(),
            organism_workers = config.organism_workers(),
            search_workers = config.search_workers(),
            resume = config.resume,
            "starting draft build"
        );

        let organisms: Vec<OrganismOutcome> = organism_pool.install(|| {
            config
                .organisms
                .par_iter()
                .map(|organism| {
                    let build = OrganismBuild {
                        organism,
                        reference: &reference,
                        thresholds: config.thresholds,
                        work_dir: &config.work_dir,
                        resume: config.resume,
                        searcher: self.searcher.as_ref(),
                        search_pool: &search_pool,
                    };
                    let status = match panic::catch_unwind(AssertUnwindSafe(|| build.run())) {
                        Ok(Ok(summary)) => OrganismStatus::Built(Box::new(summary)),
                        Ok(Err(e)) => {
                            tracing::error!(
                                organism = %organism.name,
                                error = %e,
                                "organism build failed"
                            );
                            OrganismStatus::Failed { error: e.to_string() }
                        }
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            tracing::error!(
                                organism = %organism.name,
                                panic = %message,
                                "organism build panicked"
                            );
                            OrganismStatus::Failed {
                                error: format!("panicked: {message}"),
                            }
                        }
                    };
                    OrganismOutcome {
                        organism: organism.name.clone(),
                        status,
                    }
                })
                .collect()
        });

        let report = BuildReport {
            started_at,
            finished_at: Utc::now(),
            thresholds: config.thresholds,
            organisms,
        };
        report.write_json(&self.report_path())?;

        let built = report.succeeded().count();
        if built > 0 && built <= MAX_LABELS {
            let upset = report.reaction_upset()?;
            let path = config.work_dir.join(REACTIONS_UPSET_LOG);
            fs::write(&path, upset.render_log())
                .with_context(|| format!("failed to write {}", path.display()))?;
        } else if built > MAX_LABELS {
            tracing::warn!(
                built,
                max = MAX_LABELS,
                "too many organisms for the reaction overlap log; skipping it"
            );
        }

        tracing::info!(
            built,
            failed = report.organisms.len() - built,
            report = %self.report_path().display(),
            "draft build finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
