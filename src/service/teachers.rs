use chrono::Utc;
use serde::Deserialize;

use super::auth::{hash_password, MIN_PASSWORD_LEN};
use super::{matches_search, required, ServiceError, ServiceResult};
use crate::storage::models::{Teacher, TeacherStatus, WriteOp};
use crate::storage::Database;

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub teacher_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub subject: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Blocked,
}

#[derive(Debug, Default, Deserialize)]
pub struct TeacherFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
}

/// Validate a signup and build the new teacher record.
pub fn prepare_signup(db: &Database, req: &SignupRequest) -> ServiceResult<Teacher> {
    let fields = [
        &req.teacher_id,
        &req.name,
        &req.email,
        &req.password,
        &req.confirm_password,
        &req.department,
        &req.subject,
    ];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(ServiceError::Invalid(
            "Please fill in all required fields.".into(),
        ));
    }

    if req.password != req.confirm_password {
        return Err(ServiceError::Invalid("Passwords do not match.".into()));
    }

    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long."
        )));
    }

    let email = req.email.trim().to_string();
    if !email.contains('@') {
        return Err(ServiceError::Invalid("Email address is not valid.".into()));
    }

    if db.email_registered(&email)? {
        return Err(ServiceError::Conflict("Email already registered.".into()));
    }

    let teacher_id = req.teacher_id.trim().to_string();
    if db.get_teacher(&teacher_id)?.is_some() {
        return Err(ServiceError::Conflict("Teacher ID already exists.".into()));
    }

    Ok(Teacher {
        teacher_id,
        name: required(&req.name, "name")?,
        email,
        password_hash: hash_password(&req.password)?,
        department: required(&req.department, "department")?,
        subject: required(&req.subject, "subject")?,
        status: TeacherStatus::Active,
        created_at: Utc::now(),
    })
}

/// Check that a replicated signup is the one stored. A concurrent signup for
/// the same id or email may have been applied first.
pub fn confirm_signup(db: &Database, teacher: &Teacher) -> ServiceResult<Teacher> {
    match db.get_teacher(&teacher.teacher_id)? {
        Some(stored) if stored.password_hash == teacher.password_hash => Ok(stored),
        Some(_) => Err(ServiceError::Conflict("Teacher ID already exists.".into())),
        None => Err(ServiceError::Conflict("Email already registered.".into())),
    }
}

/// Flip a teacher between active and blocked.
pub fn plan_toggle_status(db: &Database, teacher_id: &str) -> ServiceResult<WriteOp> {
    let teacher = find(db, teacher_id)?;
    Ok(WriteOp::SetTeacherStatus {
        teacher_id: teacher.teacher_id,
        status: teacher.status.toggled(),
    })
}

pub fn plan_delete(db: &Database, teacher_id: &str) -> ServiceResult<WriteOp> {
    let teacher = find(db, teacher_id)?;
    Ok(WriteOp::DeleteTeacher {
        teacher_id: teacher.teacher_id,
    })
}

pub fn find(db: &Database, teacher_id: &str) -> ServiceResult<Teacher> {
    db.get_teacher(teacher_id)?
        .ok_or_else(|| ServiceError::NotFound("Teacher not found".into()))
}

/// Teachers matching the search (name, email, department) and status filter,
/// ordered by name.
pub fn list(db: &Database, filter: &TeacherFilter) -> ServiceResult<Vec<Teacher>> {
    let mut teachers: Vec<Teacher> = db
        .list_teachers()?
        .into_iter()
        .filter(|t| match filter.status {
            StatusFilter::All => true,
            StatusFilter::Active => t.status == TeacherStatus::Active,
            StatusFilter::Blocked => t.status == TeacherStatus::Blocked,
        })
        .filter(|t| {
            matches_search(
                filter.search.as_deref(),
                &[&t.name, &t.email, &t.department],
            )
        })
        .collect();

    teachers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(teachers)
}
