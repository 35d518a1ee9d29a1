//! Batch worker library surface.
//!
//! The binary in `main.rs` wires the pipeline against real HTTP
//! endpoints; the manifest handling lives here so it can be tested.

pub mod manifest;
