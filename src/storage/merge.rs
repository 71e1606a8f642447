//! Roll-up of historical connection rows into time-bucketed summaries.
//!
//! Originals in the requested range move to the archive store; the primary
//! store keeps one synthetic summary row per (host, bucket) group. The two
//! stores commit independently: primary first, then archive. A crash
//! between the commits leaves archived copies without the primary-side
//! delete/insert (or the reverse), which is an accepted inconsistency
//! window rather than a guaranteed-atomic move.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use uuid::Uuid;

use crate::error_handling::types::{MergeError, StorageError};
use crate::storage::archive::ArchiveStore;
use crate::storage::primary::PrimaryStore;
use crate::storage::types::ConnectionRecord;

/// Row counts from one merge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub archived: usize,
    pub merged: usize,
}

/// Merges every primary record with `start` in the closed range
/// `[start, end]` (unix seconds) into per-(host, bucket) summaries.
///
/// Bucket floors are aligned to `bucket_minutes`; counters are summed
/// exactly; the representative `chain`/`source_ip` come from the group's
/// earliest member. Each summary gets a freshly generated id, so even a
/// singleton group is replaced by a new row.
pub async fn merge_and_archive(
    primary: &PrimaryStore,
    archive: &ArchiveStore,
    start: i64,
    end: i64,
    bucket_minutes: i64,
) -> Result<MergeOutcome, MergeError> {
    if end < start {
        return Err(MergeError::InvalidRange(format!(
            "end {} precedes start {}",
            end, start
        )));
    }
    if bucket_minutes <= 0 {
        return Err(MergeError::InvalidRange(format!(
            "bucket width must be positive, got {} minutes",
            bucket_minutes
        )));
    }

    let originals = primary.select_range(start, end).await?;
    if originals.is_empty() {
        return Ok(MergeOutcome::default());
    }

    let bucket_secs = bucket_minutes * 60;
    let mut groups: HashMap<(String, i64), ConnectionRecord> = HashMap::new();
    let mut group_order: Vec<(String, i64)> = Vec::new();

    // Originals arrive ordered by start, so the first record seen for a
    // group fixes its representative chain and source address.
    for record in &originals {
        let bucket = record.start.timestamp().div_euclid(bucket_secs) * bucket_secs;
        let key = (record.host.clone(), bucket);
        match groups.get_mut(&key) {
            Some(summary) => {
                summary.upload += record.upload;
                summary.download += record.download;
            }
            None => {
                let mut summary = record.clone();
                summary.start = DateTime::from_timestamp(bucket, 0).unwrap_or(DateTime::UNIX_EPOCH);
                groups.insert(key.clone(), summary);
                group_order.push(key);
            }
        }
    }

    let mut primary_tx = primary
        .pool
        .begin()
        .await
        .map_err(StorageError::TransactionFailed)?;
    let mut archive_tx = archive
        .pool
        .begin()
        .await
        .map_err(StorageError::TransactionFailed)?;

    let archived_at = Utc::now().timestamp();
    for record in &originals {
        sqlx::query(
            "INSERT INTO connections_archive
               (id, source_ip, host, upload, download, start, chain, archived_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&record.id)
        .bind(&record.source_ip)
        .bind(&record.host)
        .bind(record.upload as i64)
        .bind(record.download as i64)
        .bind(record.start.timestamp())
        .bind(&record.chain)
        .bind(archived_at)
        .execute(&mut *archive_tx)
        .await
        .map_err(StorageError::TransactionFailed)?;

        sqlx::query("DELETE FROM connections WHERE id = ?1")
            .bind(&record.id)
            .execute(&mut *primary_tx)
            .await
            .map_err(StorageError::TransactionFailed)?;
    }

    for key in &group_order {
        let summary = &groups[key];
        sqlx::query(
            "INSERT INTO connections (id, source_ip, host, upload, download, start, chain)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&summary.source_ip)
        .bind(&summary.host)
        .bind(summary.upload as i64)
        .bind(summary.download as i64)
        .bind(summary.start.timestamp())
        .bind(&summary.chain)
        .execute(&mut *primary_tx)
        .await
        .map_err(StorageError::TransactionFailed)?;
    }

    primary_tx
        .commit()
        .await
        .map_err(StorageError::TransactionFailed)?;
    archive_tx.commit().await.map_err(|e| {
        // The primary commit already landed; the archive is now missing
        // this run's copies until the range is re-archived.
        error!("Archive commit failed after primary commit: {}", e);
        StorageError::TransactionFailed(e)
    })?;

    let outcome = MergeOutcome {
        archived: originals.len(),
        merged: group_order.len(),
    };
    info!(
        "Merged {} records into {} summaries for range [{}, {}]",
        outcome.archived, outcome.merged, start, end
    );
    Ok(outcome)
}
