use redb::{Database as RedbDatabase, ReadTransaction, ReadableTable, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for DatabaseError {
    fn from(e: redb::Error) -> Self {
        DatabaseError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

/// Statistics from a purge operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct PurgeStats {
    pub teachers: u64,
    pub departments: u64,
    pub students: u64,
    pub exams: u64,
    pub notifications: u64,
    pub documents: u64,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("exam-manager.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        // Initialize application tables
        let write_txn = db.begin_write()?;
        {
            for table in [
                TEACHERS,
                DEPARTMENTS,
                STUDENTS,
                EXAMS,
                NOTIFICATIONS,
                TEACHER_INBOX,
                DOCUMENTS,
            ] {
                let _ = write_txn.open_table(table)?;
            }
            let _ = write_txn.open_table(TEACHER_EMAILS)?;
            let _ = write_txn.open_table(DEPARTMENT_NAMES)?;
            let _ = write_txn.open_table(PUBLISHED_RESULTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Get a reference to the underlying redb database (for sharing with muster).
    pub fn inner(&self) -> Arc<RedbDatabase> {
        Arc::clone(&self.db)
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    /// Fetch and decode a single record
    pub(crate) fn read_record<T: DeserializeOwned>(
        &self,
        table: RecordTable,
        key: &str,
    ) -> Result<Option<T>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(table)?;

        match table.get(key)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Decode every record in a table, in key order
    pub(crate) fn read_all<T: DeserializeOwned>(
        &self,
        table: RecordTable,
    ) -> Result<Vec<T>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(table)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            records.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(records)
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// Purge all data - for testing only
    pub fn purge_all(&self) -> Result<PurgeStats, DatabaseError> {
        let write_txn = self.begin_write()?;
        let stats = PurgeStats {
            teachers: clear_table(&write_txn, TEACHERS)?,
            departments: clear_table(&write_txn, DEPARTMENTS)?,
            students: clear_table(&write_txn, STUDENTS)?,
            exams: clear_table(&write_txn, EXAMS)?,
            notifications: clear_table(&write_txn, NOTIFICATIONS)?,
            documents: clear_table(&write_txn, DOCUMENTS)?,
        };
        clear_table(&write_txn, TEACHER_INBOX)?;
        clear_index(&write_txn, TEACHER_EMAILS)?;
        clear_index(&write_txn, DEPARTMENT_NAMES)?;
        clear_index(&write_txn, PUBLISHED_RESULTS)?;

        write_txn.commit()?;
        Ok(stats)
    }
}

// ============================================================================
// Write-transaction helpers shared by the per-entity modules
// ============================================================================

/// Decode a record inside an open write transaction.
pub(super) fn load<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: RecordTable,
    key: &str,
) -> Result<Option<T>, DatabaseError> {
    let table = txn.open_table(table)?;
    let result = match table.get(key)? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };
    Ok(result)
}

/// Encode and insert a record inside an open write transaction.
pub(super) fn store<T: Serialize>(
    txn: &WriteTransaction,
    table: RecordTable,
    key: &str,
    value: &T,
) -> Result<(), DatabaseError> {
    let mut table = txn.open_table(table)?;
    let data = rmp_serde::to_vec_named(value)?;
    table.insert(key, data.as_slice())?;
    Ok(())
}

/// Remove a record, returning whether it existed.
pub(super) fn remove(
    txn: &WriteTransaction,
    table: RecordTable,
    key: &str,
) -> Result<bool, DatabaseError> {
    let mut table = txn.open_table(table)?;
    let existed = table.remove(key)?.is_some();
    Ok(existed)
}

pub(super) fn clear_table(txn: &WriteTransaction, table: RecordTable) -> Result<u64, DatabaseError> {
    let keys: Vec<String> = {
        let table = txn.open_table(table)?;
        let keys = table
            .iter()?
            .map(|r| r.map(|(k, _)| k.value().to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        keys
    };

    let mut table = txn.open_table(table)?;
    for key in &keys {
        table.remove(key.as_str())?;
    }
    Ok(keys.len() as u64)
}

pub(super) fn clear_index(txn: &WriteTransaction, table: IndexTable) -> Result<(), DatabaseError> {
    let keys: Vec<String> = {
        let table = txn.open_table(table)?;
        let keys = table
            .iter()?
            .map(|r| r.map(|(k, _)| k.value().to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        keys
    };

    let mut table = txn.open_table(table)?;
    for key in keys {
        table.remove(key.as_str())?;
    }
    Ok(())
}
