use chrono::Utc;
use serde::Deserialize;

use super::departments::require_year;
use super::{matches_filter, matches_search, required, ServiceError, ServiceResult};
use crate::storage::models::{Student, WriteOp};
use crate::storage::Database;

#[derive(Debug, Default, Deserialize)]
pub struct StudentRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roll_number: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub year: String,
    /// Teacher who added the student
    #[serde(default)]
    pub teacher_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentFilter {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    /// Matches name or roll number
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

struct ValidStudent {
    name: String,
    roll_number: String,
    department: String,
    year: String,
}

fn validate(db: &Database, req: &StudentRequest) -> ServiceResult<ValidStudent> {
    if [&req.name, &req.roll_number, &req.department, &req.year]
        .iter()
        .any(|f| f.trim().is_empty())
    {
        return Err(ServiceError::Invalid(
            "Please fill all required fields.".into(),
        ));
    }

    let year = req.year.trim().to_string();
    let department = require_year(db, req.department.trim(), &year)?;

    Ok(ValidStudent {
        name: required(&req.name, "name")?,
        roll_number: required(&req.roll_number, "roll number")?,
        department: department.name,
        year,
    })
}

pub fn prepare_create(db: &Database, req: &StudentRequest) -> ServiceResult<Student> {
    let valid = validate(db, req)?;

    if let Some(ref teacher_id) = req.teacher_id {
        if db.get_teacher(teacher_id)?.is_none() {
            return Err(ServiceError::Invalid(format!(
                "Teacher '{teacher_id}' does not exist"
            )));
        }
    }

    let now = Utc::now();
    Ok(Student {
        id: format!("STU-{}", uuid::Uuid::new_v4()),
        name: valid.name,
        roll_number: valid.roll_number,
        department: valid.department,
        year: valid.year,
        teacher_id: req.teacher_id.clone(),
        created_at: now,
        updated_at: now,
    })
}

/// Replace a student's details. The adding teacher is kept unless a new one is given.
pub fn prepare_update(db: &Database, id: &str, req: &StudentRequest) -> ServiceResult<Student> {
    let existing = find(db, id)?;
    let valid = validate(db, req)?;

    Ok(Student {
        name: valid.name,
        roll_number: valid.roll_number,
        department: valid.department,
        year: valid.year,
        teacher_id: req.teacher_id.clone().or(existing.teacher_id),
        updated_at: Utc::now(),
        ..existing
    })
}

pub fn plan_delete(db: &Database, id: &str) -> ServiceResult<WriteOp> {
    let student = find(db, id)?;
    Ok(WriteOp::DeleteStudent { id: student.id })
}

pub fn find(db: &Database, id: &str) -> ServiceResult<Student> {
    db.get_student(id)?
        .ok_or_else(|| ServiceError::NotFound("Student not found".into()))
}

pub fn list(db: &Database, filter: &StudentFilter) -> ServiceResult<Vec<Student>> {
    let mut students: Vec<Student> = db
        .list_students()?
        .into_iter()
        .filter(|s| matches_filter(filter.department.as_deref(), &s.department))
        .filter(|s| matches_filter(filter.year.as_deref(), &s.year))
        .filter(|s| matches_search(filter.search.as_deref(), &[&s.name, &s.roll_number]))
        .collect();

    students.sort_by(|a, b| {
        let order = a.name.to_lowercase().cmp(&b.name.to_lowercase());
        match filter.sort {
            SortOrder::Asc => order,
            SortOrder::Desc => order.reverse(),
        }
    });
    Ok(students)
}
