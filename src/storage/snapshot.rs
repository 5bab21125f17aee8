use serde::{Deserialize, Serialize};

use super::db::{clear_index, clear_table, store, Database, DatabaseError};
use super::models::{Department, DocumentRecord, Exam, Notification, Student, Teacher};
use super::tables::*;

/// Every collection in the store, used to sync lagging followers.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub teachers: Vec<Teacher>,
    pub departments: Vec<Department>,
    pub students: Vec<Student>,
    pub exams: Vec<Exam>,
    /// (exam_id, published_at)
    pub published: Vec<(String, String)>,
    pub notifications: Vec<Notification>,
    /// (teacher_id, inbox)
    pub inboxes: Vec<(String, Vec<Notification>)>,
    pub documents: Vec<DocumentRecord>,
}

impl Database {
    pub fn export_snapshot(&self) -> Result<StoreSnapshot, DatabaseError> {
        let teachers = self.list_teachers()?;

        let mut inboxes = Vec::new();
        for teacher in &teachers {
            let inbox = self.inbox(&teacher.teacher_id)?;
            if !inbox.is_empty() {
                inboxes.push((teacher.teacher_id.clone(), inbox));
            }
        }

        let mut published: Vec<(String, String)> = self.published_results()?.into_iter().collect();
        published.sort();

        Ok(StoreSnapshot {
            teachers,
            departments: self.list_departments()?,
            students: self.list_students()?,
            exams: self.list_exams()?,
            published,
            notifications: self.list_notifications()?,
            inboxes,
            documents: self.list_documents()?,
        })
    }

    /// Replace the whole store with the snapshot contents in one transaction
    pub fn import_snapshot(&self, snapshot: &StoreSnapshot) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
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
                clear_table(&write_txn, table)?;
            }
            for table in [TEACHER_EMAILS, DEPARTMENT_NAMES, PUBLISHED_RESULTS] {
                clear_index(&write_txn, table)?;
            }

            for teacher in &snapshot.teachers {
                store(&write_txn, TEACHERS, &teacher.teacher_id, teacher)?;
                let mut emails = write_txn.open_table(TEACHER_EMAILS)?;
                emails.insert(
                    teacher.email.to_lowercase().as_str(),
                    teacher.teacher_id.as_str(),
                )?;
            }
            for department in &snapshot.departments {
                store(&write_txn, DEPARTMENTS, &department.id, department)?;
                let mut names = write_txn.open_table(DEPARTMENT_NAMES)?;
                names.insert(
                    department.name.to_lowercase().as_str(),
                    department.id.as_str(),
                )?;
            }
            for student in &snapshot.students {
                store(&write_txn, STUDENTS, &student.id, student)?;
            }
            for exam in &snapshot.exams {
                store(&write_txn, EXAMS, &exam.id, exam)?;
            }
            {
                let mut published = write_txn.open_table(PUBLISHED_RESULTS)?;
                for (exam_id, published_at) in &snapshot.published {
                    published.insert(exam_id.as_str(), published_at.as_str())?;
                }
            }
            for notification in &snapshot.notifications {
                store(&write_txn, NOTIFICATIONS, &notification.id, notification)?;
            }
            for (teacher_id, inbox) in &snapshot.inboxes {
                store(&write_txn, TEACHER_INBOX, teacher_id, inbox)?;
            }
            for document in &snapshot.documents {
                store(&write_txn, DOCUMENTS, &document.id, document)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}
