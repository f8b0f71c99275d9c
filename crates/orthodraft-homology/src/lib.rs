//! Orthodraft homology: from raw alignment hits to ortholog candidates.
//!
//! ```text
//!   tabular hits ──► HomologyRecordStore ──► ThresholdFilter ──► CandidateGeneMap
//!                                                  │
//!                                                  └──► RejectionReport (per criterion)
//! ```
//!
//! - [`record`]: the 10-field comma-separated hit format and its parser
//! - [`thresholds`]: validated selection thresholds
//! - [`filter`]: the five-criterion conjunction and the by-criterion rejections

pub mod filter;
pub mod record;
pub mod thresholds;

pub use filter::{
    select, CandidateGeneMap, Criterion, RejectionReport, Selection, SelectionError,
    ThresholdFilter,
};
pub use record::{
    parse_record, HomologyRecord, HomologyRecordStore, ParseError, ParsedHits, FIELD_ORDER,
};
pub use thresholds::{ConfigurationError, RawThresholds, SelectionThresholds};
