//! # dyad-core
//!
//! Relationship analytics engine for normalized chat exports.
//!
//! Takes a [`ParsedConversation`] (produced by an external platform
//! importer) and derives statistical and heuristic relationship metrics:
//! response-time distributions, session and activity patterns, conflict
//! and pursuit-withdrawal cycles, reciprocity, achievement badges, viral
//! composite scores, text-pattern mining, and longitudinal deltas between
//! repeated analyses.
//!
//! The pipeline is a pure batch computation: no I/O, no wall clock, no
//! randomness. The same input always produces byte-identical serialized
//! output. Sparse data degrades to explicit insufficient-data sentinels
//! rather than errors; the composite scores are heuristic entertainment
//! metrics by design, not calibrated psychology.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dyad_core::{analyze, AnalysisConfig, ParsedConversation, Platform};
//!
//! let config = AnalysisConfig::load().expect("failed to load config");
//! let conversation = ParsedConversation::new(Platform::Whatsapp, vec![], vec![]);
//! let report = analyze(&conversation, &config);
//! println!("{} sessions", report.totals.sessions);
//! ```

// Re-export commonly used items at the crate root
pub use analysis::{
    analyze, compare_snapshots, conversation_fingerprint, AnalysisDelta, AnalysisReport,
    AnalysisSnapshot,
};
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analysis;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;
