//! Agent-facing side of the pipeline.
//!
//! Components:
//! - `types`: wire types for the agent's snapshot payload.
//! - `client`: authenticated HTTP fetch of a snapshot.
//! - `normalizer`: host fallback and suffix-collapse cleaning.

pub mod client;
pub mod normalizer;
pub mod types;

pub use client::AgentClient;
pub use normalizer::normalize_snapshot;
pub use types::{AgentConnection, Metadata, Snapshot};
