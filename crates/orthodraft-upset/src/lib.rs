//! Orthodraft upset: exclusive-overlap diagnostics for labelled sets.
//!
//! Used for organisms (which draft reactions does each subset of organisms
//! share exclusively?) and for rejection reasons (which hits failed exactly
//! this combination of criteria?).

pub mod cluster;
pub mod report;

pub use cluster::{
    enumerate, exclusive_intersection, subset_masks, Cluster, ClusterEnumerator, ClusterError,
    Clusters, MAX_LABELS,
};
pub use report::{UpsetReport, UpsetRow};
