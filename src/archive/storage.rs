//! SQLite-backed archive of completed scan results
//!
//! Small results are stored inline as JSON; results above 10KB go to blob
//! files next to the database.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::error::ArchiveError;
use crate::models::{ScanMode, ScanResult};

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// Results larger than this are stored as external blobs
const INLINE_THRESHOLD: usize = 10 * 1024;

/// Query alias for the most recently archived scan
pub const LATEST: &str = "latest";

type Result<T> = std::result::Result<T, ArchiveError>;

/// Listing row for an archived scan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedScan {
    pub scan_id: String,
    pub target: String,
    pub mode: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub archived_at: DateTime<Utc>,
}

/// Statistics about archive state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_size_bytes: usize,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
}

/// Statistics about a clear or purge operation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearStats {
    pub entries_removed: usize,
}

pub struct ArchiveStorage {
    conn: Connection,
    blobs_dir: PathBuf,
}

impl ArchiveStorage {
    /// Default archive location (~/.cache/vulnscope on Linux)
    pub fn default_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(ArchiveError::NoHome)?;
        Ok(cache_base.join("vulnscope"))
    }

    /// Open the archive at `dir`, or at the default location
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::open_at(dir),
            None => Self::open_at(&Self::default_dir()?),
        }
    }

    pub fn open_at(archive_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(archive_dir)
            .map_err(|e| ArchiveError::Io(format!("Failed to create archive dir: {}", e)))?;

        let db_path = archive_dir.join("archive.db");
        let blobs_dir = archive_dir.join("blobs");
        std::fs::create_dir_all(&blobs_dir)
            .map_err(|e| ArchiveError::Io(format!("Failed to create blobs dir: {}", e)))?;

        let conn = Connection::open(&db_path)?;

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Archive schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path, &blobs_dir)?;
            return Self::open_at(archive_dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS scan_results (
                scan_id TEXT PRIMARY KEY NOT NULL,
                target TEXT NOT NULL,
                mode TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                duration_secs INTEGER NOT NULL,
                total INTEGER NOT NULL,
                critical INTEGER NOT NULL,
                high INTEGER NOT NULL,
                medium INTEGER NOT NULL,
                low INTEGER NOT NULL,
                info INTEGER NOT NULL,
                data TEXT,
                blob_path TEXT,
                archived_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_archived_at ON scan_results(archived_at);
            CREATE INDEX IF NOT EXISTS idx_results_expires_at ON scan_results(expires_at);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self { conn, blobs_dir })
    }

    /// Archive a completed result, replacing any earlier copy with the same id
    pub fn put(&self, result: &ScanResult, retention: Duration) -> Result<()> {
        let json = serde_json::to_string(result)
            .map_err(|e| ArchiveError::Corrupt(format!("Failed to serialize result: {}", e)))?;
        let now = Utc::now().timestamp();
        let expires = now.saturating_add(retention.as_secs() as i64);
        let summary = &result.summary;

        let (data, blob_path) = if json.len() <= INLINE_THRESHOLD {
            (Some(json.as_str()), None)
        } else {
            (None, Some(self.write_blob(&summary.scan_id, json.as_bytes())?))
        };

        self.conn.execute(
            "INSERT OR REPLACE INTO scan_results
             (scan_id, target, mode, started_at, duration_secs, total, critical, high, medium,
              low, info, data, blob_path, archived_at, expires_at, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                summary.scan_id,
                result.config.target_url,
                summary.mode.to_string(),
                summary.start_time.timestamp(),
                summary.duration_secs(),
                summary.total,
                summary.critical,
                summary.high,
                summary.medium,
                summary.low,
                summary.info,
                data,
                blob_path,
                now,
                expires,
                json.len()
            ],
        )?;
        log::debug!(
            "Archived scan {} ({} bytes, {})",
            summary.scan_id,
            json.len(),
            if data.is_some() { "inline" } else { "blob" }
        );
        Ok(())
    }

    /// Fetch an unexpired result by exact id
    pub fn get(&self, scan_id: &str) -> Result<Option<ScanResult>> {
        let now = Utc::now().timestamp();

        let row: Option<(Option<String>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT data, blob_path FROM scan_results
                 WHERE scan_id = ?1 AND expires_at > ?2",
                params![scan_id, now],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let json = match row {
            Some((Some(data), None)) => data,
            Some((None, Some(blob_path))) => {
                let full_path = self.blobs_dir.join(&blob_path);
                match std::fs::read_to_string(&full_path) {
                    Ok(data) => data,
                    Err(e) => {
                        log::warn!("Failed to read blob {}: {}", blob_path, e);
                        let _ = self
                            .conn
                            .execute("DELETE FROM scan_results WHERE scan_id = ?1", [scan_id]);
                        return Ok(None);
                    }
                }
            }
            _ => return Ok(None),
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| ArchiveError::Corrupt(format!("{}: {}", scan_id, e)))
    }

    /// Resolve `latest`, an exact id or a unique id prefix to a result
    pub fn resolve(&self, query: &str) -> Result<ScanResult> {
        let query = query.trim();
        let scan_id = if query.eq_ignore_ascii_case(LATEST) {
            self.list(1)?
                .into_iter()
                .next()
                .map(|s| s.scan_id)
                .ok_or_else(|| ArchiveError::NotFound(LATEST.to_string()))?
        } else {
            self.resolve_prefix(query)?
        };

        self.get(&scan_id)?
            .ok_or_else(|| ArchiveError::NotFound(query.to_string()))
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<String> {
        if prefix.is_empty() {
            return Err(ArchiveError::NotFound(prefix.to_string()));
        }
        let now = Utc::now().timestamp();

        let exact: Option<String> = self
            .conn
            .query_row(
                "SELECT scan_id FROM scan_results WHERE scan_id = ?1 AND expires_at > ?2",
                params![prefix, now],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = exact {
            return Ok(id);
        }

        let mut stmt = self.conn.prepare(
            "SELECT scan_id FROM scan_results
             WHERE substr(scan_id, 1, length(?1)) = ?1 AND expires_at > ?2
             LIMIT 2",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![prefix, now], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;

        match ids.as_slice() {
            [] => Err(ArchiveError::NotFound(prefix.to_string())),
            [only] => Ok(only.clone()),
            _ => Err(ArchiveError::Ambiguous(prefix.to_string())),
        }
    }

    /// Most recently archived unexpired scans, newest first
    pub fn list(&self, limit: usize) -> Result<Vec<ArchivedScan>> {
        let now = Utc::now().timestamp();
        let mut stmt = self.conn.prepare(
            "SELECT scan_id, target, mode, started_at, duration_secs, total, critical, high,
                    medium, low, info, archived_at
             FROM scan_results
             WHERE expires_at > ?1
             ORDER BY archived_at DESC, started_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![now, limit as i64], archived_scan)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn stats(&self) -> Result<ArchiveStats> {
        let now = Utc::now().timestamp();

        let total_entries: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM scan_results", [], |r| r.get(0))?;

        let valid_entries: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM scan_results WHERE expires_at > ?1",
            [now],
            |r| r.get(0),
        )?;

        let total_size: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM scan_results",
            [],
            |r| r.get(0),
        )?;

        let (oldest, newest): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(archived_at), MAX(archived_at) FROM scan_results WHERE expires_at > ?1",
            [now],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        Ok(ArchiveStats {
            total_entries: total_entries as usize,
            valid_entries: valid_entries as usize,
            expired_entries: (total_entries - valid_entries) as usize,
            total_size_bytes: total_size as usize,
            oldest_entry: oldest,
            newest_entry: newest,
        })
    }

    /// Remove every archived result
    pub fn clear(&self) -> Result<ClearStats> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scan_results", [], |r| r.get(0))?;

        self.conn.execute("DELETE FROM scan_results", [])?;

        if self.blobs_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.blobs_dir) {
                log::warn!("Failed to clear blobs directory: {}", e);
            }
            std::fs::create_dir_all(&self.blobs_dir)
                .map_err(|e| ArchiveError::Io(format!("Failed to recreate blobs dir: {}", e)))?;
        }

        Ok(ClearStats {
            entries_removed: count as usize,
        })
    }

    /// Remove expired results and their blob files
    pub fn purge_expired(&self) -> Result<ClearStats> {
        let now = Utc::now().timestamp();
        let blobs: Vec<String> = {
            let mut stmt = self.conn.prepare(
                "SELECT blob_path FROM scan_results WHERE expires_at <= ?1 AND blob_path IS NOT NULL",
            )?;
            stmt.query_map([now], |row| row.get(0))?
                .collect::<std::result::Result<_, _>>()?
        };
        for blob in blobs {
            if let Err(e) = std::fs::remove_file(self.blobs_dir.join(&blob)) {
                log::debug!("Expired blob {} not removed: {}", blob, e);
            }
        }

        let removed = self
            .conn
            .execute("DELETE FROM scan_results WHERE expires_at <= ?1", [now])?;
        if removed > 0 {
            log::debug!("Purged {} expired archive entries", removed);
        }
        Ok(ClearStats {
            entries_removed: removed,
        })
    }

    /// Write a blob file, sharded by first 2 chars of the scan id
    fn write_blob(&self, scan_id: &str, data: &[u8]) -> Result<String> {
        let shard: String = scan_id.chars().take(2).collect();
        let shard_dir = self.blobs_dir.join(&shard);
        std::fs::create_dir_all(&shard_dir)
            .map_err(|e| ArchiveError::Io(format!("Failed to create shard dir: {}", e)))?;

        let filename = format!("{}.json", scan_id);
        let rel_path = format!("{}/{}", shard, filename);

        std::fs::write(shard_dir.join(&filename), data)
            .map_err(|e| ArchiveError::Io(format!("Failed to write blob: {}", e)))?;

        Ok(rel_path)
    }

    fn nuke(db_path: &Path, blobs_dir: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| ArchiveError::Io(format!("Failed to remove archive DB: {}", e)))?;
        }
        if blobs_dir.exists() {
            std::fs::remove_dir_all(blobs_dir)
                .map_err(|e| ArchiveError::Io(format!("Failed to remove blobs dir: {}", e)))?;
        }
        Ok(())
    }
}

fn archived_scan(row: &Row<'_>) -> rusqlite::Result<ArchivedScan> {
    let timestamp = |secs: i64| DateTime::from_timestamp(secs, 0).unwrap_or_default();
    let count = |idx: usize| -> rusqlite::Result<usize> { Ok(row.get::<_, i64>(idx)? as usize) };
    Ok(ArchivedScan {
        scan_id: row.get(0)?,
        target: row.get(1)?,
        mode: row.get(2)?,
        started_at: timestamp(row.get(3)?),
        duration_secs: row.get(4)?,
        total: count(5)?,
        critical: count(6)?,
        high: count(7)?,
        medium: count(8)?,
        low: count(9)?,
        info: count(10)?,
        archived_at: timestamp(row.get(11)?),
    })
}

impl ArchivedScan {
    pub fn scan_mode(&self) -> Option<ScanMode> {
        match self.mode.as_str() {
            "quick" => Some(ScanMode::Quick),
            "standard" => Some(ScanMode::Standard),
            "thorough" => Some(ScanMode::Thorough),
            _ => None,
        }
    }
}
