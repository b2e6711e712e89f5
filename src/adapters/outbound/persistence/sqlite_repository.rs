use crate::feed_sync::domain::{AffectedProductVersion, FeedId, Fingerprint, VulnerabilityRecord};
use crate::ports::outbound::RecordsRepository;
use crate::shared::error::SyncError;
use crate::shared::SyncResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Property key holding the time of the last completed synchronization
pub const LAST_UPDATE_KEY: &str = "last_update";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS cves (
        cve_id TEXT PRIMARY KEY,
        description TEXT NOT NULL,
        attributes TEXT NOT NULL,
        published TEXT,
        modified TEXT,
        severity TEXT
    );

    CREATE TABLE IF NOT EXISTS affected_products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        cve_id TEXT NOT NULL,
        product TEXT NOT NULL,
        vendor TEXT NOT NULL,
        version TEXT NOT NULL,
        version_prev INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS properties (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_affected_products_cve ON affected_products(cve_id);
    CREATE INDEX IF NOT EXISTS idx_affected_products_product ON affected_products(vendor, product);
"#;

/// Records repository backed by SQLite
///
/// Fingerprints live in the `properties` table under `{feed}_sha1`.
#[derive(Clone)]
pub struct SqliteRecordsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordsRepository {
    /// Opens or creates the database at the given path
    ///
    /// # Errors
    /// `SyncError::RepositoryUnavailable` when the file cannot be opened or
    /// is not a SQLite database.
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| SyncError::RepositoryUnavailable {
            details: format!("Failed to open {}: {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "Opened records database");
        Self::with_connection(conn)
    }

    /// Creates an in-memory database (for testing)
    pub fn in_memory() -> SyncResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| SyncError::RepositoryUnavailable {
            details: format!("Failed to create in-memory database: {}", e),
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> SyncResult<Self> {
        let repository = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repository.init_schema()?;
        Ok(repository)
    }

    fn init_schema(&self) -> SyncResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| classify("initialize schema", e))
    }

    fn lock(&self) -> SyncResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SyncError::RepositoryUnavailable {
            details: "database connection lock is poisoned".to_string(),
        })
    }

    fn get_property(&self, key: &str) -> SyncResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM properties WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| classify("read property", e))
    }

    fn set_property(&self, key: &str, value: &str) -> SyncResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO properties (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| classify("write property", e))?;
        Ok(())
    }

    /// Number of stored vulnerability records
    pub fn vulnerability_count(&self) -> SyncResult<u64> {
        self.count("SELECT COUNT(*) FROM cves")
    }

    /// Number of stored affected product tuples, duplicates included
    pub fn affected_count(&self) -> SyncResult<u64> {
        self.count("SELECT COUNT(*) FROM affected_products")
    }

    fn count(&self, sql: &str) -> SyncResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| classify("count rows", e))?;
        Ok(count as u64)
    }

    /// Looks up a single record by its CVE identifier
    pub fn get_vulnerability(&self, cve_id: &str) -> SyncResult<Option<VulnerabilityRecord>> {
        let conn = self.lock()?;
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT cve_id, description, attributes FROM cves WHERE cve_id = ?1",
                [cve_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| classify("read vulnerability", e))?;

        row.map(|(id, description, attributes)| {
            let attributes: BTreeMap<String, String> = serde_json::from_str(&attributes)
                .map_err(|e| SyncError::Repository {
                    details: format!("Corrupt attributes for {}: {}", id, e),
                })?;
            Ok::<_, SyncError>(VulnerabilityRecord::new(id, description, attributes))
        })
        .transpose()
    }

    /// Affected product tuples of one CVE, in insertion order
    pub fn affected_for(&self, cve_id: &str) -> SyncResult<Vec<AffectedProductVersion>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT cve_id, product, vendor, version, version_prev
                 FROM affected_products WHERE cve_id = ?1 ORDER BY id",
            )
            .map_err(|e| classify("read affected products", e))?;
        let rows = stmt
            .query_map([cve_id], |row| {
                Ok(AffectedProductVersion::new(
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })
            .map_err(|e| classify("read affected products", e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| classify("read affected products", e))
    }

    /// Time of the last completed synchronization, if any
    pub fn last_sync(&self) -> SyncResult<Option<DateTime<Utc>>> {
        self.get_property(LAST_UPDATE_KEY)?
            .map(|value| {
                DateTime::parse_from_rfc3339(&value)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| SyncError::Repository {
                        details: format!("Invalid {} value '{}': {}", LAST_UPDATE_KEY, value, e),
                    })
            })
            .transpose()
    }
}

impl RecordsRepository for SqliteRecordsRepository {
    fn delete_all(&self) -> SyncResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM affected_products; DELETE FROM cves;")
            .map_err(|e| classify("delete records", e))?;
        debug!("Deleted all vulnerability records");
        Ok(())
    }

    fn upsert_vulnerabilities(&self, records: &[VulnerabilityRecord]) -> SyncResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| classify("begin transaction", e))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO cves (cve_id, description, attributes, published, modified, severity)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(|e| classify("prepare upsert", e))?;

            for record in records {
                let attributes =
                    serde_json::to_string(record.attributes()).map_err(|e| SyncError::Repository {
                        details: format!("Failed to encode attributes of {}: {}", record.id(), e),
                    })?;
                stmt.execute(params![
                    record.id(),
                    record.description(),
                    attributes,
                    record.published(),
                    record.modified(),
                    record.severity(),
                ])
                .map_err(|e| classify("upsert vulnerability", e))?;
            }
        }
        tx.commit().map_err(|e| classify("commit upsert", e))?;
        Ok(records.len())
    }

    fn insert_affected(&self, tuples: &[AffectedProductVersion]) -> SyncResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| classify("begin transaction", e))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO affected_products (cve_id, product, vendor, version, version_prev)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| classify("prepare insert", e))?;

            for tuple in tuples {
                stmt.execute(params![
                    tuple.cve_id(),
                    tuple.product(),
                    tuple.vendor(),
                    tuple.version(),
                    tuple.version_prev(),
                ])
                .map_err(|e| classify("insert affected product", e))?;
            }
        }
        tx.commit().map_err(|e| classify("commit insert", e))?;
        Ok(tuples.len())
    }

    fn get_fingerprint(&self, feed: FeedId) -> SyncResult<Option<Fingerprint>> {
        Ok(self
            .get_property(&fingerprint_key(feed))?
            .map(Fingerprint::from_stored))
    }

    fn set_fingerprint(&self, feed: FeedId, fingerprint: &Fingerprint) -> SyncResult<()> {
        self.set_property(&fingerprint_key(feed), fingerprint.as_str())?;
        debug!(feed = %feed, fingerprint = %fingerprint, "Stored feed fingerprint");
        Ok(())
    }

    fn set_last_sync(&self, timestamp: DateTime<Utc>) -> SyncResult<()> {
        self.set_property(LAST_UPDATE_KEY, &timestamp.to_rfc3339())
    }
}

fn fingerprint_key(feed: FeedId) -> String {
    format!("{}_sha1", feed)
}

/// Maps SQLite failures onto the error taxonomy
///
/// Codes meaning the database itself cannot be used abort the whole job.
fn classify(action: &str, e: rusqlite::Error) -> SyncError {
    let unavailable = matches!(
        e.sqlite_error_code(),
        Some(
            ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
        )
    );
    let details = format!("Failed to {}: {}", action, e);
    if unavailable {
        SyncError::RepositoryUnavailable { details }
    } else {
        SyncError::Repository { details }
    }
}
