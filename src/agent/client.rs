use std::time::Duration;

use crate::agent::types::Snapshot;
use crate::error_handling::types::AgentError;

/// HTTP client for the agent's connection snapshot endpoint.
pub struct AgentClient {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl AgentClient {
    /// Builds a client with an explicit request timeout so a hung agent
    /// cannot stall the poll loop indefinitely.
    pub fn new(url: String, token: String, timeout: Duration) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AgentError::Http)?;
        Ok(Self { http, url, token })
    }

    /// Fetches one full snapshot of currently open connections.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, AgentError> {
        let mut request = self.http.get(&self.url);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request.send().await.map_err(AgentError::Http)?;
        if !response.status().is_success() {
            return Err(AgentError::Status(response.status()));
        }

        response.json::<Snapshot>().await.map_err(AgentError::Decode)
    }
}
