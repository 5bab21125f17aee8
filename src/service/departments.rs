use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;

use super::{required, ServiceError, ServiceResult};
use crate::storage::models::{Department, WriteOp};
use crate::storage::Database;

/// Academic year labels a department can hold subjects for.
pub const YEARS: [&str; 4] = ["1st Year", "2nd Year", "3rd Year", "4th Year"];

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// Create a department or replace one year's subjects on an existing one
/// (matched by name, case-insensitively).
pub fn prepare_upsert(db: &Database, req: &DepartmentRequest) -> ServiceResult<Department> {
    let name = required(&req.name, "Department name")?;
    let year = required(&req.year, "Year")?;
    if !YEARS.contains(&year.as_str()) {
        return Err(ServiceError::Invalid(format!(
            "Year must be one of: {}",
            YEARS.join(", ")
        )));
    }

    let mut subjects: Vec<String> = Vec::new();
    for subject in &req.subjects {
        let subject = subject.trim();
        if !subject.is_empty() && !subjects.iter().any(|s| s == subject) {
            subjects.push(subject.to_string());
        }
    }
    if subjects.is_empty() {
        return Err(ServiceError::Invalid(
            "Please add at least one subject.".into(),
        ));
    }

    let now = Utc::now();
    let department = match db.get_department_by_name(&name)? {
        Some(mut existing) => {
            existing.years.insert(year, subjects);
            existing.updated_at = now;
            existing
        }
        None => Department {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            years: BTreeMap::from([(year, subjects)]),
            created_at: now,
            updated_at: now,
        },
    };

    Ok(department)
}

pub fn find(db: &Database, id: &str) -> ServiceResult<Department> {
    db.get_department(id)?
        .ok_or_else(|| ServiceError::NotFound("Department not found".into()))
}

pub fn plan_delete(db: &Database, id: &str) -> ServiceResult<WriteOp> {
    let department = find(db, id)?;
    Ok(WriteOp::DeleteDepartment { id: department.id })
}

/// Departments ordered by name.
pub fn list(db: &Database) -> ServiceResult<Vec<Department>> {
    let mut departments = db.list_departments()?;
    departments.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(departments)
}

/// Resolve a department by name and check it offers `year`.
pub(crate) fn require_year(db: &Database, department: &str, year: &str) -> ServiceResult<Department> {
    let found = db
        .get_department_by_name(department)?
        .ok_or_else(|| ServiceError::Invalid(format!("Department '{department}' does not exist")))?;

    if !found.years.contains_key(year) {
        return Err(ServiceError::Invalid(format!(
            "Department '{}' has no subjects for {year}",
            found.name
        )));
    }
    Ok(found)
}
