//! Storage subsystem
//!
//! Two independent SQLite databases: the primary store holding live
//! connection rows, and the append-only archive receiving originals when
//! the merge pipeline rolls history up into time buckets.
//!
//! Components:
//! - `types`: shared data types used across the pipeline and web layer.
//! - `primary`: the primary store (batched upsert, listing, summaries).
//! - `archive`: the append-only archive store.
//! - `merge`: the cross-store move-and-compact engine.

pub mod archive;
pub mod merge;
pub mod primary;
pub mod types;

pub use archive::ArchiveStore;
pub use merge::{merge_and_archive, MergeOutcome};
pub use primary::PrimaryStore;
pub use types::{ConnectionFilter, ConnectionPage, ConnectionRecord, Granularity, HostTotals, TrafficPoint};
