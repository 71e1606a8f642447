use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::types::{ConnectionFilter, ConnectionRecord, Granularity};

/// API error payload
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

/// Query parameters accepted by the connection listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size", rename = "pageSize")]
    pub page_size: u32,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, rename = "sourceIP")]
    pub source_ip: Option<String>,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<i64>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<i64>,
    #[serde(default, rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(default, rename = "sortOrder")]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

fn default_limit() -> u32 {
    10
}

impl ConnectionListQuery {
    /// Empty and zero-valued parameters mean "no filter", matching the
    /// query strings the dashboard sends.
    pub fn into_filter(self) -> ConnectionFilter {
        ConnectionFilter {
            host: self.host.filter(|s| !s.is_empty()),
            source_ip: self.source_ip.filter(|s| !s.is_empty()),
            start_date: self.start_date.filter(|v| *v > 0),
            end_date: self.end_date.filter(|v| *v > 0),
            chain: self.chain.filter(|s| !s.is_empty()),
            sort_by: self.sort_by.filter(|s| !s.is_empty()),
            sort_desc: self
                .sort_order
                .as_deref()
                .map(|order| order.eq_ignore_ascii_case("desc"))
                .unwrap_or(false),
            page: self.page.max(1),
            page_size: if self.page_size == 0 { default_page_size() } else { self.page_size },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrafficSummaryQuery {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub granularity: Option<String>,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<i64>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<i64>,
}

impl TrafficSummaryQuery {
    pub fn granularity(&self) -> Granularity {
        match self.granularity.as_deref() {
            Some("hour") => Granularity::Hour,
            _ => Granularity::Day,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostSummaryQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<i64>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<i64>,
}

/// Body of the merge trigger request. Timestamps are unix seconds,
/// `interval` is the bucket width in minutes.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    #[serde(rename = "startDate")]
    pub start_date: i64,
    #[serde(rename = "endDate")]
    pub end_date: i64,
    pub interval: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceHostRequest {
    #[serde(rename = "domainSuffix")]
    pub domain_suffix: String,
}

/// Trimmed connection shape returned by the listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub host: String,
    #[serde(rename = "sourceIP")]
    pub source_ip: String,
    pub upload: u64,
    pub download: u64,
    pub start: DateTime<Utc>,
    pub chains: Vec<String>,
}

impl From<ConnectionRecord> for ConnectionInfo {
    fn from(record: ConnectionRecord) -> Self {
        let chains = if record.chain.is_empty() {
            Vec::new()
        } else {
            vec![record.chain]
        };
        Self {
            host: record.host,
            source_ip: record.source_ip,
            upload: record.upload,
            download: record.download,
            start: record.start,
            chains,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectionListResponse {
    pub total: i64,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
    pub data: Vec<ConnectionInfo>,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub message: String,
    pub archived: usize,
    pub merged: usize,
}

#[derive(Debug, Serialize)]
pub struct ReplaceHostResponse {
    pub message: String,
    #[serde(rename = "rowsAffected")]
    pub rows_affected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_query_defaults() {
        let query: ConnectionListQuery = serde_json::from_str("{}").unwrap();
        let filter = query.into_filter();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 20);
        assert!(filter.host.is_none());
        assert!(!filter.sort_desc);
    }

    #[test]
    fn test_listing_query_drops_empty_and_zero_filters() {
        let query: ConnectionListQuery = serde_json::from_str(
            r#"{"host": "", "sourceIP": "", "startDate": 0, "sortBy": "", "page": 0}"#,
        )
        .unwrap();
        let filter = query.into_filter();
        assert!(filter.host.is_none());
        assert!(filter.source_ip.is_none());
        assert!(filter.start_date.is_none());
        assert!(filter.sort_by.is_none());
        assert_eq!(filter.page, 1);
    }

    #[test]
    fn test_sort_order_is_case_insensitive() {
        let query: ConnectionListQuery =
            serde_json::from_str(r#"{"sortBy": "upload", "sortOrder": "DESC"}"#).unwrap();
        assert!(query.into_filter().sort_desc);
    }

    #[test]
    fn test_granularity_defaults_to_day() {
        let query: TrafficSummaryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.granularity(), Granularity::Day);
        let query: TrafficSummaryQuery =
            serde_json::from_str(r#"{"granularity": "hour"}"#).unwrap();
        assert_eq!(query.granularity(), Granularity::Hour);
    }

    #[test]
    fn test_connection_info_wraps_chain_as_list() {
        use chrono::Utc;
        let record = ConnectionRecord {
            id: "a".into(),
            source_ip: "10.0.0.1".into(),
            host: "a.com".into(),
            upload: 1,
            download: 2,
            start: Utc::now(),
            chain: String::new(),
        };
        let info = ConnectionInfo::from(record);
        assert!(info.chains.is_empty());
    }
}
