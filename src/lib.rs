//! Resolver benchmarking and adaptive selection.
//!
//! Candidates are probed against a handful of domains, each probe bounded
//! by its own timeout, and the per-resolver summaries feed two selection
//! policies: best-of-all ranking and pairwise compare.

pub mod bench;
pub mod config;
pub mod dns;
pub mod domains;
pub mod error;
pub mod output;
pub mod policy;
pub mod probe;
pub mod progress;
pub mod resolver;
pub mod service;
pub mod stats;
pub mod types;

pub use bench::Engine;
pub use probe::Lookup;
pub use progress::ProgressSink;
pub use types::{ProbeOutcome, ResolverSummary, Selection, Status};
