pub mod types;

pub use types::{AgentError, ConfigError, MergeError, StorageError};
