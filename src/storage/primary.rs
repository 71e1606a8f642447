use std::path::Path;

use chrono::DateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::error_handling::types::StorageError;
use crate::storage::types::{
    ConnectionFilter, ConnectionPage, ConnectionRecord, Granularity, HostTotals, TrafficPoint,
};

// Internal row mapping to avoid manual try_get
#[derive(Debug, sqlx::FromRow)]
struct ConnectionRow {
    id: String,
    source_ip: Option<String>,
    host: Option<String>,
    upload: i64,
    download: i64,
    start: i64,
    chain: Option<String>,
}

impl ConnectionRow {
    fn into_record(self) -> ConnectionRecord {
        ConnectionRecord {
            id: self.id,
            source_ip: self.source_ip.unwrap_or_default(),
            host: self.host.unwrap_or_default(),
            upload: self.upload as u64,
            download: self.download as u64,
            start: DateTime::from_timestamp(self.start, 0).unwrap_or(DateTime::UNIX_EPOCH),
            chain: self.chain.unwrap_or_default(),
        }
    }
}

enum Arg {
    Text(String),
    Int(i64),
}

/// Durable store of connection records, one row per connection id.
#[derive(Debug, Clone)]
pub struct PrimaryStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl PrimaryStore {
    /// Opens (creating if missing) the primary database and its schema.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(StorageError::ConnectionFailed)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS connections (
                id        TEXT NOT NULL PRIMARY KEY,
                source_ip TEXT,
                host      TEXT,
                upload    INTEGER,
                download  INTEGER,
                start     INTEGER,
                chain     TEXT
            );",
        )
        .execute(&pool)
        .await
        .map_err(StorageError::QueryFailed)?;

        Ok(Self { pool })
    }

    /// Persists a drained batch in one transaction.
    ///
    /// Rows conflict on id: the cumulative counters are overwritten, every
    /// other column keeps its first-insert value. Records with an empty
    /// host are dropped here, not stored. Returns the number of rows
    /// written.
    pub async fn bulk_upsert(&self, records: &[ConnectionRecord]) -> Result<usize, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StorageError::TransactionFailed)?;

        let mut written = 0usize;
        for record in records {
            if record.host.is_empty() {
                continue;
            }
            sqlx::query(
                "INSERT INTO connections (id, source_ip, host, upload, download, start, chain)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                   upload = excluded.upload,
                   download = excluded.download",
            )
            .bind(&record.id)
            .bind(&record.source_ip)
            .bind(&record.host)
            .bind(record.upload as i64)
            .bind(record.download as i64)
            .bind(record.start.timestamp())
            .bind(&record.chain)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::TransactionFailed)?;
            written += 1;
        }

        tx.commit()
            .await
            .map_err(StorageError::TransactionFailed)?;
        Ok(written)
    }

    /// Every record with `start` inside the closed range, earliest first.
    pub async fn select_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<ConnectionRecord>, StorageError> {
        let rows = sqlx::query_as::<_, ConnectionRow>(
            "SELECT id, source_ip, host, upload, download, start, chain
             FROM connections WHERE start >= ?1 AND start <= ?2 ORDER BY start ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::QueryFailed)?;

        Ok(rows.into_iter().map(ConnectionRow::into_record).collect())
    }

    /// Filtered, sorted, paginated listing plus the unpaginated total.
    pub async fn list_connections(
        &self,
        filter: &ConnectionFilter,
    ) -> Result<ConnectionPage, StorageError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Arg> = Vec::new();

        if let Some(host) = &filter.host {
            clauses.push("host LIKE ?");
            args.push(Arg::Text(format!("%{}%", host)));
        }
        if let Some(ip) = &filter.source_ip {
            clauses.push("source_ip LIKE ?");
            args.push(Arg::Text(format!("%{}%", ip)));
        }
        if let Some(start) = filter.start_date {
            clauses.push("start >= ?");
            args.push(Arg::Int(start));
        }
        if let Some(end) = filter.end_date {
            clauses.push("start <= ?");
            args.push(Arg::Int(end));
        }
        if let Some(chain) = &filter.chain {
            clauses.push("chain = ?");
            args.push(Arg::Text(chain.clone()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM connections{}", where_sql);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_query = match arg {
                Arg::Text(s) => count_query.bind(s.clone()),
                Arg::Int(i) => count_query.bind(*i),
            };
        }
        let total = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::QueryFailed)?;

        // Sort columns are whitelisted; anything else falls back to the
        // default ordering.
        let order_sql = match Self::sort_column(filter.sort_by.as_deref()) {
            Some(column) => format!(
                " ORDER BY {} {}",
                column,
                if filter.sort_desc { "DESC" } else { "ASC" }
            ),
            None => " ORDER BY start DESC".to_string(),
        };

        let page = filter.page.max(1);
        let page_size = if filter.page_size == 0 { 20 } else { filter.page_size };
        let offset = (page - 1) as i64 * page_size as i64;

        let list_sql = format!(
            "SELECT id, source_ip, host, upload, download, start, chain
             FROM connections{}{} LIMIT ? OFFSET ?",
            where_sql, order_sql
        );
        let mut list_query = sqlx::query_as::<_, ConnectionRow>(&list_sql);
        for arg in &args {
            list_query = match arg {
                Arg::Text(s) => list_query.bind(s.clone()),
                Arg::Int(i) => list_query.bind(*i),
            };
        }
        let rows = list_query
            .bind(page_size as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::QueryFailed)?;

        Ok(ConnectionPage {
            total,
            records: rows.into_iter().map(ConnectionRow::into_record).collect(),
        })
    }

    fn sort_column(requested: Option<&str>) -> Option<&'static str> {
        match requested {
            Some("upload") => Some("upload"),
            Some("download") => Some("download"),
            Some("start") => Some("start"),
            Some("host") | Some("metadata.host") => Some("host"),
            Some("sourceIP") | Some("metadata.sourceIP") => Some("source_ip"),
            _ => None,
        }
    }

    /// Traffic totals bucketed by hour or day for the chart endpoint.
    pub async fn traffic_summary(
        &self,
        host: Option<&str>,
        granularity: Granularity,
        start_date: Option<i64>,
        end_date: Option<i64>,
    ) -> Result<Vec<TrafficPoint>, StorageError> {
        let mut sql = String::from(
            "SELECT strftime(?, datetime(start, 'unixepoch')) AS time,
                    SUM(upload) AS upload, SUM(download) AS download
             FROM connections WHERE 1=1",
        );
        let mut args: Vec<Arg> = vec![Arg::Text(granularity.format().to_string())];

        if let Some(host) = host {
            sql.push_str(" AND host = ?");
            args.push(Arg::Text(host.to_string()));
        }
        if let Some(start) = start_date {
            sql.push_str(" AND start >= ?");
            args.push(Arg::Int(start));
        }
        if let Some(end) = end_date {
            sql.push_str(" AND start <= ?");
            args.push(Arg::Int(end));
        }
        sql.push_str(" GROUP BY time ORDER BY time");

        let mut query = sqlx::query_as::<_, (String, i64, i64)>(&sql);
        for arg in &args {
            query = match arg {
                Arg::Text(s) => query.bind(s.clone()),
                Arg::Int(i) => query.bind(*i),
            };
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::QueryFailed)?;

        Ok(rows
            .into_iter()
            .map(|(time, upload, download)| TrafficPoint {
                time,
                upload: upload as u64,
                download: download as u64,
            })
            .collect())
    }

    /// Hosts ranked by total traffic, busiest first.
    pub async fn host_summary(
        &self,
        limit: u32,
        start_date: Option<i64>,
        end_date: Option<i64>,
    ) -> Result<Vec<HostTotals>, StorageError> {
        let mut sql = String::from(
            "SELECT host, SUM(upload) AS upload, SUM(download) AS download,
                    SUM(upload) + SUM(download) AS total
             FROM connections WHERE host != ''",
        );
        let mut args: Vec<Arg> = Vec::new();

        if let Some(start) = start_date {
            sql.push_str(" AND start >= ?");
            args.push(Arg::Int(start));
        }
        if let Some(end) = end_date {
            sql.push_str(" AND start <= ?");
            args.push(Arg::Int(end));
        }
        sql.push_str(" GROUP BY host ORDER BY total DESC LIMIT ?");
        args.push(Arg::Int(limit as i64));

        let mut query = sqlx::query_as::<_, (String, i64, i64, i64)>(&sql);
        for arg in &args {
            query = match arg {
                Arg::Text(s) => query.bind(s.clone()),
                Arg::Int(i) => query.bind(*i),
            };
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::QueryFailed)?;

        Ok(rows
            .into_iter()
            .map(|(host, upload, download, total)| HostTotals {
                host,
                upload: upload as u64,
                download: download as u64,
                total: total as u64,
            })
            .collect())
    }

    /// Distinct non-empty hosts for the filter dropdown.
    pub async fn distinct_hosts(&self) -> Result<Vec<String>, StorageError> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT host FROM connections WHERE host != '' ORDER BY host",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::QueryFailed)
    }

    /// Distinct non-empty exit chains for the filter dropdown.
    pub async fn distinct_chains(&self) -> Result<Vec<String>, StorageError> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT chain FROM connections WHERE chain != '' ORDER BY chain",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::QueryFailed)
    }

    /// Rewrites every host equal to the suffix, or ending in `.suffix`,
    /// to the bare suffix. Returns the number of rows changed.
    pub async fn replace_host_suffix(&self, suffix: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("UPDATE connections SET host = ?1 WHERE host LIKE ?2 OR host = ?1")
            .bind(suffix)
            .bind(format!("%.{}", suffix))
            .execute(&self.pool)
            .await
            .map_err(StorageError::QueryFailed)?;
        Ok(result.rows_affected())
    }

    /// Rebuilds the database file to reclaim space freed by deletes.
    pub async fn vacuum(&self) -> Result<(), StorageError> {
        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(StorageError::QueryFailed)?;
        Ok(())
    }
}
