use serde::Serialize;

use super::teachers::find as find_teacher;
use super::ServiceResult;
use crate::storage::models::{ExamStatus, TeacherStatus};
use crate::storage::Database;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExamCounts {
    pub total: usize,
    pub active: usize,
    pub submitted: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerDashboard {
    pub total_teachers: usize,
    pub active_teachers: usize,
    pub blocked_teachers: usize,
    pub departments: usize,
    pub students: usize,
    pub exams: ExamCounts,
    pub published_results: usize,
    pub pending_submissions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeacherDashboard {
    pub teacher_id: String,
    pub department: String,
    pub students: usize,
    pub exams: usize,
    pub evaluated_submissions: usize,
    pub pending_submissions: usize,
    pub unread_notifications: usize,
}

pub fn controller(db: &Database) -> ServiceResult<ControllerDashboard> {
    let teachers = db.list_teachers()?;
    let active_teachers = teachers
        .iter()
        .filter(|t| t.status == TeacherStatus::Active)
        .count();

    let mut exams = ExamCounts::default();
    let mut pending_submissions = 0;
    for exam in db.list_exams()? {
        exams.total += 1;
        match exam.status {
            ExamStatus::Active => exams.active += 1,
            ExamStatus::Submitted => exams.submitted += 1,
            ExamStatus::Completed => exams.completed += 1,
        }
        pending_submissions += exam.pending_count();
    }

    Ok(ControllerDashboard {
        total_teachers: teachers.len(),
        active_teachers,
        blocked_teachers: teachers.len() - active_teachers,
        departments: db.list_departments()?.len(),
        students: db.list_students()?.len(),
        exams,
        published_results: db.published_results()?.len(),
        pending_submissions,
    })
}

/// Counts scoped to the teacher's department.
pub fn teacher(db: &Database, teacher_id: &str) -> ServiceResult<TeacherDashboard> {
    let teacher = find_teacher(db, teacher_id)?;
    let in_department = |department: &str| department.eq_ignore_ascii_case(&teacher.department);

    let students = db
        .list_students()?
        .iter()
        .filter(|s| in_department(&s.department))
        .count();

    let mut dashboard = TeacherDashboard {
        students,
        ..TeacherDashboard::default()
    };
    for exam in db.list_exams()?.iter().filter(|e| in_department(&e.department)) {
        dashboard.exams += 1;
        dashboard.evaluated_submissions += exam.evaluated_count();
        dashboard.pending_submissions += exam.pending_count();
    }

    dashboard.unread_notifications = db
        .inbox(&teacher.teacher_id)?
        .iter()
        .filter(|n| !n.is_read_by(&teacher.teacher_id))
        .count();
    dashboard.teacher_id = teacher.teacher_id;
    dashboard.department = teacher.department;

    Ok(dashboard)
}
