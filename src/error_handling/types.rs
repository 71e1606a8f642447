use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    BadFlushInterval(String),
    BadPollInterval(String),
    BadUrl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BadFlushInterval(e) => write!(f, "Flush interval error: {}", e),
            ConfigError::BadPollInterval(e) => write!(f, "Poll interval error: {}", e),
            ConfigError::BadUrl(e) => write!(f, "Agent URL error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised while fetching or decoding a snapshot from the agent.
#[derive(Debug)]
pub enum AgentError {
    Http(reqwest::Error),
    Status(reqwest::StatusCode),
    Decode(reqwest::Error),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::Http(e) => write!(f, "Agent request failed: {}", e),
            AgentError::Status(s) => write!(f, "Agent returned error status: {}", s),
            AgentError::Decode(e) => write!(f, "Agent payload decode failed: {}", e),
        }
    }
}

impl std::error::Error for AgentError {}

#[derive(Debug)]
pub enum StorageError {
    ConnectionFailed(sqlx::Error),
    QueryFailed(sqlx::Error),
    TransactionFailed(sqlx::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed(e) => write!(f, "Storage connection failed: {}", e),
            StorageError::QueryFailed(e) => write!(f, "Storage query failed: {}", e),
            StorageError::TransactionFailed(e) => write!(f, "Storage transaction failed: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug)]
pub enum MergeError {
    /// The requested range or bucket width is invalid; nothing was touched.
    InvalidRange(String),
    Storage(StorageError),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::InvalidRange(e) => write!(f, "Invalid merge range: {}", e),
            MergeError::Storage(e) => write!(f, "Merge storage error: {}", e),
        }
    }
}

impl std::error::Error for MergeError {}

impl From<StorageError> for MergeError {
    fn from(err: StorageError) -> Self {
        MergeError::Storage(err)
    }
}
