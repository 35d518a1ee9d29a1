//! Inference clients for panel analysis.
//!
//! Two heterogeneous paths provide the same capability: a hosted
//! analysis service ([`remote::RemoteAnalyzer`]) and client-resident
//! model runtimes ([`local::LocalAnalyzer`]). The pipeline crate decides
//! routing and fallback between them; this crate owns wire formats,
//! transport, per-call retry/timeout discipline, and ledger bookkeeping.
//!
//! Single-shot narration/audio generation lives in [`generate`].

pub mod error;
pub mod generate;
pub mod local;
pub mod remote;
pub mod transport;
pub mod wire;

pub use error::InferenceError;
pub use generate::{GeneratorClient, HttpGeneratorClient};
pub use local::{DetectionProvider, ImageFetcher, LocalAnalysis, LocalAnalyzer};
pub use remote::{MetadataEnvelope, RemoteAnalysis, RemoteAnalyzer, RemoteOutcome};
