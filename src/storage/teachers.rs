use redb::ReadableTable;

use super::db::{load, remove, store, Database, DatabaseError};
use super::models::{Teacher, TeacherStatus};
use super::tables::*;

impl Database {
    // ========================================================================
    // Teacher operations
    // ========================================================================

    /// Store a new teacher and index its email. Returns false, writing
    /// nothing, when the id or the email is already taken.
    pub fn insert_teacher(&self, teacher: &Teacher) -> Result<bool, DatabaseError> {
        debug_assert!(!teacher.teacher_id.is_empty(), "teacher id must not be empty");

        let email = teacher.email.to_lowercase();
        let write_txn = self.begin_write()?;
        {
            let mut email_table = write_txn.open_table(TEACHER_EMAILS)?;
            if email_table.get(email.as_str())?.is_some()
                || load::<Teacher>(&write_txn, TEACHERS, &teacher.teacher_id)?.is_some()
            {
                return Ok(false);
            }

            store(&write_txn, TEACHERS, &teacher.teacher_id, teacher)?;
            email_table.insert(email.as_str(), teacher.teacher_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    pub fn get_teacher(&self, teacher_id: &str) -> Result<Option<Teacher>, DatabaseError> {
        self.read_record(TEACHERS, teacher_id)
    }

    /// Look up a teacher by email (case-insensitive)
    pub fn get_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let email_table = read_txn.open_table(TEACHER_EMAILS)?;

        let teacher_id = match email_table.get(email.to_lowercase().as_str())? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(TEACHERS)?;
        match table.get(teacher_id.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    pub fn email_registered(&self, email: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(TEACHER_EMAILS)?;
        Ok(table.get(email.to_lowercase().as_str())?.is_some())
    }

    /// Set a teacher's status. Returns false when the teacher does not exist.
    pub fn set_teacher_status(
        &self,
        teacher_id: &str,
        status: TeacherStatus,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let updated = match load::<Teacher>(&write_txn, TEACHERS, teacher_id)? {
            Some(mut teacher) => {
                teacher.status = status;
                store(&write_txn, TEACHERS, teacher_id, &teacher)?;
                true
            }
            None => false,
        };
        write_txn.commit()?;
        Ok(updated)
    }

    /// Delete a teacher along with their email index entry and inbox
    pub fn delete_teacher(&self, teacher_id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = match load::<Teacher>(&write_txn, TEACHERS, teacher_id)? {
            Some(teacher) => {
                remove(&write_txn, TEACHERS, teacher_id)?;
                remove(&write_txn, TEACHER_INBOX, teacher_id)?;
                let mut email_table = write_txn.open_table(TEACHER_EMAILS)?;
                email_table.remove(teacher.email.to_lowercase().as_str())?;
                true
            }
            None => false,
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    pub fn list_teachers(&self) -> Result<Vec<Teacher>, DatabaseError> {
        self.read_all(TEACHERS)
    }
}
