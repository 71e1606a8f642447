//! The ingestion pipeline: two independent timed loops sharing only the
//! live cache, plus the shutdown hook that bounds data loss on exit.

pub mod flusher;
pub mod poller;
pub mod shutdown;

pub use flusher::Flusher;
pub use poller::Poller;
pub use shutdown::wait_for_signal;
