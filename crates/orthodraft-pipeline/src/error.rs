use std::path::PathBuf;

use orthodraft_homology::SelectionError;
use orthodraft_network::NetworkError;
use orthodraft_upset::ClusterError;

use crate::search::AlignmentError;

/// Failure of one organism's build. Never crosses into sibling organisms.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing {what}: {}", path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("no alignment evidence for this organism")]
    NoEvidence,

    #[error("alignment failed for query `{gene}`: {source}")]
    Alignment {
        gene: String,
        #[source]
        source: AlignmentError,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable checkpoint {}: {message}", path.display())]
    Checkpoint { path: PathBuf, message: String },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("worker pool error: {0}")]
    Pool(String),
}

impl From<SelectionError> for BuildError {
    fn from(value: SelectionError) -> Self {
        match value {
            SelectionError::NoEvidence => BuildError::NoEvidence,
        }
    }
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}
