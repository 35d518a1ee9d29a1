//! Panel processing orchestration.
//!
//! Routes each panel through the local and remote inference paths with
//! strictly sequential fallback (never a race — both paths write to
//! shared job/metadata stores), drives metadata polling for background
//! jobs, and keeps the in-memory panel collection consistent. Narration
//! and audio generation share the state-update pattern but are one
//! network call each.

pub mod batch;
pub mod config;
pub mod error;
pub mod generators;
pub mod orchestrator;
pub mod poller;
pub mod store;

pub use batch::BatchOutcome;
pub use config::{PipelineConfig, PollConfig};
pub use error::PipelineError;
pub use orchestrator::PanelOrchestrator;
pub use poller::{MetadataPoller, PollResult, PollStep};
pub use store::{PanelStore, ProcessingGuard};
