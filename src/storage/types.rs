use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed proxy connection, keyed by the agent-assigned id.
///
/// `upload` and `download` are cumulative byte totals since the connection
/// started; a later sighting of the same id replaces these totals, it never
/// adds to them. `chain` holds only the last hop of the proxy chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: String,
    pub source_ip: String,
    pub host: String,
    pub upload: u64,
    pub download: u64,
    pub start: DateTime<Utc>,
    pub chain: String,
}

/// Filter, sort and pagination options for the connection listing.
#[derive(Debug, Clone, Default)]
pub struct ConnectionFilter {
    pub host: Option<String>,
    pub source_ip: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub chain: Option<String>,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
    pub page: u32,
    pub page_size: u32,
}

/// One page of the connection listing plus the unpaginated total.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionPage {
    pub total: i64,
    pub records: Vec<ConnectionRecord>,
}

/// Summed traffic for one time bucket, keyed by its formatted floor time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficPoint {
    pub time: String,
    pub upload: u64,
    pub download: u64,
}

/// Per-host traffic totals for the ranking endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostTotals {
    pub host: String,
    pub upload: u64,
    pub download: u64,
    pub total: u64,
}

/// Time-bucket granularity for the traffic summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hour,
    Day,
}

impl Granularity {
    /// strftime format producing the bucket's floor time.
    pub fn format(&self) -> &'static str {
        match self {
            Granularity::Hour => "%Y-%m-%d %H:00:00",
            Granularity::Day => "%Y-%m-%d 00:00:00",
        }
    }
}
