use redb::ReadableTable;

use super::db::{load, remove, store, Database, DatabaseError};
use super::models::Department;
use super::tables::*;

impl Database {
    // ========================================================================
    // Department operations
    // ========================================================================

    /// Insert or replace a department and keep the name index in step
    pub fn put_department(&self, department: &Department) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            // Drop the old name entry if the department was renamed
            if let Some(previous) = load::<Department>(&write_txn, DEPARTMENTS, &department.id)? {
                if !previous.name.eq_ignore_ascii_case(&department.name) {
                    let mut names = write_txn.open_table(DEPARTMENT_NAMES)?;
                    names.remove(previous.name.to_lowercase().as_str())?;
                }
            }

            store(&write_txn, DEPARTMENTS, &department.id, department)?;

            let mut names = write_txn.open_table(DEPARTMENT_NAMES)?;
            names.insert(
                department.name.to_lowercase().as_str(),
                department.id.as_str(),
            )?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_department(&self, id: &str) -> Result<Option<Department>, DatabaseError> {
        self.read_record(DEPARTMENTS, id)
    }

    /// Resolve a department by name (case-insensitive)
    pub fn get_department_by_name(&self, name: &str) -> Result<Option<Department>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let names = read_txn.open_table(DEPARTMENT_NAMES)?;

        let id = match names.get(name.trim().to_lowercase().as_str())? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(DEPARTMENTS)?;
        match table.get(id.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    pub fn delete_department(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = match load::<Department>(&write_txn, DEPARTMENTS, id)? {
            Some(department) => {
                remove(&write_txn, DEPARTMENTS, id)?;
                let mut names = write_txn.open_table(DEPARTMENT_NAMES)?;
                names.remove(department.name.to_lowercase().as_str())?;
                true
            }
            None => false,
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// Remove every department. Returns how many were removed.
    pub fn clear_departments(&self) -> Result<u64, DatabaseError> {
        let departments = self.list_departments()?;

        let write_txn = self.begin_write()?;
        {
            let mut names = write_txn.open_table(DEPARTMENT_NAMES)?;
            for department in &departments {
                names.remove(department.name.to_lowercase().as_str())?;
            }
            drop(names);

            let mut table = write_txn.open_table(DEPARTMENTS)?;
            for department in &departments {
                table.remove(department.id.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(departments.len() as u64)
    }

    pub fn list_departments(&self) -> Result<Vec<Department>, DatabaseError> {
        self.read_all(DEPARTMENTS)
    }
}
