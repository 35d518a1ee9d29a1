//! Core domain types for the panel processing pipeline.
//!
//! Holds the panel model and its state transitions, detected-region
//! normalization, content-identity hashing, the retry/timeout utility,
//! and the status vocabularies shared by the ledger and the pipeline.

pub mod annotation;
pub mod error;
pub mod hashing;
pub mod panel;
pub mod retry;
pub mod status;
pub mod types;
pub mod voice;

pub use error::CoreError;
pub use panel::{AnalysisResult, AnalysisSource, Panel};
pub use status::{JobStatus, PanelStatus, StatusId};
