use super::db::{remove, store, Database, DatabaseError};
use super::models::DocumentRecord;
use super::tables::*;

impl Database {
    // ========================================================================
    // Document metadata
    // ========================================================================

    pub fn put_document(&self, document: &DocumentRecord) -> Result<(), DatabaseError> {
        debug_assert!(!document.id.is_empty(), "document id must not be empty");

        let write_txn = self.begin_write()?;
        store(&write_txn, DOCUMENTS, &document.id, document)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
        self.read_record(DOCUMENTS, id)
    }

    pub fn delete_document(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = remove(&write_txn, DOCUMENTS, id)?;
        write_txn.commit()?;
        Ok(deleted)
    }

    pub fn list_documents(&self) -> Result<Vec<DocumentRecord>, DatabaseError> {
        self.read_all(DOCUMENTS)
    }
}
