//! SQLite-backed warehouse session.
//!
//! `SqliteWarehouse` owns the single connection of a run. It is opened once at
//! startup and closed when dropped. All writes go through a `FileTransaction`,
//! one per ingested source file.

use super::loader::SqliteLoader;
use super::models::TableCounts;
use super::schema::WAREHOUSE_VERSIONED_SCHEMAS;
use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::info;

fn table_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?)
}

fn create_or_validate(conn: &mut Connection) -> Result<()> {
    let latest_version = WAREHOUSE_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &WAREHOUSE_VERSIONED_SCHEMAS[latest_version];

    if table_count(conn)? == 0 {
        info!("Creating warehouse db schema at version {}", latest_version);
        let tx = conn.transaction()?;
        latest_schema.create(&tx)?;
        tx.commit()?;
        return Ok(());
    }

    latest_schema
        .validate(conn)
        .context("Warehouse database does not match the expected schema")
}

pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    /// Open (creating if needed) the warehouse database at `db_path`.
    ///
    /// Fails if the file cannot be opened or holds tables that do not match
    /// the warehouse schema.
    pub fn open<P: AsRef<Path>>(db_path: P, busy_timeout: Duration) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open warehouse database {:?}", db_path))?;
        conn.busy_timeout(busy_timeout)?;
        let store = Self::from_connection(conn)
            .with_context(|| format!("Failed to initialize warehouse database {:?}", db_path))?;
        info!("Opened warehouse database at {:?}", db_path);
        Ok(store)
    }

    /// Create a throwaway in-memory warehouse.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        // Per-connection setting, off by default in SQLite.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        create_or_validate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Drop every warehouse table and recreate the empty schema.
    pub fn reset(&mut self) -> Result<()> {
        let schema = &WAREHOUSE_VERSIONED_SCHEMAS[WAREHOUSE_VERSIONED_SCHEMAS.len() - 1];
        let tx = self.conn.transaction()?;
        schema.drop_all(&tx)?;
        schema.create(&tx)?;
        tx.commit()?;
        info!("Warehouse tables dropped and recreated");
        Ok(())
    }

    /// Start the unit of work for one source file.
    ///
    /// Dropping the returned transaction without committing rolls it back.
    pub fn begin_file(&mut self) -> Result<FileTransaction<'_>> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin file transaction")?;
        Ok(FileTransaction { tx })
    }

    pub fn counts(&self) -> Result<TableCounts> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n as usize)
        };
        Ok(TableCounts {
            songs: count("songs")?,
            artists: count("artists")?,
            users: count("users")?,
            time: count("time")?,
            songplays: count("songplays")?,
        })
    }

    /// Read access for checks and reporting.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub struct FileTransaction<'w> {
    tx: Transaction<'w>,
}

impl FileTransaction<'_> {
    pub fn loader(&self) -> SqliteLoader<'_> {
        SqliteLoader::new(&self.tx)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("Failed to commit file transaction")
    }
}
