use super::db::{remove, store, Database, DatabaseError};
use super::models::Student;
use super::tables::*;

impl Database {
    // ========================================================================
    // Student operations
    // ========================================================================

    /// Insert or replace a student record
    pub fn put_student(&self, student: &Student) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        store(&write_txn, STUDENTS, &student.id, student)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_student(&self, id: &str) -> Result<Option<Student>, DatabaseError> {
        self.read_record(STUDENTS, id)
    }

    pub fn delete_student(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = remove(&write_txn, STUDENTS, id)?;
        write_txn.commit()?;
        Ok(deleted)
    }

    pub fn list_students(&self) -> Result<Vec<Student>, DatabaseError> {
        self.read_all(STUDENTS)
    }
}
