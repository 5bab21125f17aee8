use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};

use super::db::{load, remove, store, Database, DatabaseError};
use super::models::{DocumentRecord, Evaluation, Exam, ExamStatus, SubmissionStatus};
use super::tables::*;

/// Result of recording an evaluation against an exam
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    Recorded { exam_status: ExamStatus },
    /// Results are published; marks are frozen until unpublished
    ExamCompleted,
    ExamNotFound,
    SubmissionNotFound,
}

/// An exam removed by `delete_exam`, with the documents deleted alongside it.
#[derive(Debug, Clone)]
pub struct RemovedExam {
    pub exam: Exam,
    /// Excludes documents another exam still refers to
    pub document_ids: Vec<String>,
}

impl Database {
    // ========================================================================
    // Exam operations
    // ========================================================================

    /// Store a new exam together with the metadata of its documents
    pub fn create_exam(
        &self,
        exam: &Exam,
        documents: &[DocumentRecord],
    ) -> Result<(), DatabaseError> {
        debug_assert!(!exam.id.is_empty(), "exam id must not be empty");

        let write_txn = self.begin_write()?;
        {
            for document in documents {
                store(&write_txn, DOCUMENTS, &document.id, document)?;
            }
            store(&write_txn, EXAMS, &exam.id, exam)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_exam(&self, id: &str) -> Result<Option<Exam>, DatabaseError> {
        self.read_record(EXAMS, id)
    }

    pub fn list_exams(&self) -> Result<Vec<Exam>, DatabaseError> {
        let mut exams: Vec<Exam> = self.read_all(EXAMS)?;
        exams.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(exams)
    }

    /// Mark one submission evaluated. When the last pending submission is
    /// evaluated an active exam moves to `submitted`.
    pub fn record_evaluation(
        &self,
        exam_id: &str,
        student_id: &str,
        evaluation: &Evaluation,
    ) -> Result<EvaluationOutcome, DatabaseError> {
        let write_txn = self.begin_write()?;

        let outcome = match load::<Exam>(&write_txn, EXAMS, exam_id)? {
            Some(exam) if exam.status == ExamStatus::Completed => EvaluationOutcome::ExamCompleted,
            Some(mut exam) => {
                let position = exam
                    .submissions
                    .iter()
                    .position(|s| s.student_id == student_id);

                match position {
                    Some(index) => {
                        let submission = &mut exam.submissions[index];
                        submission.status = SubmissionStatus::Evaluated;
                        submission.evaluation = Some(evaluation.clone());

                        if exam.status == ExamStatus::Active && exam.pending_count() == 0 {
                            exam.status = ExamStatus::Submitted;
                        }
                        store(&write_txn, EXAMS, exam_id, &exam)?;
                        EvaluationOutcome::Recorded {
                            exam_status: exam.status,
                        }
                    }
                    None => EvaluationOutcome::SubmissionNotFound,
                }
            }
            None => EvaluationOutcome::ExamNotFound,
        };

        write_txn.commit()?;
        Ok(outcome)
    }

    /// Delete an exam, its publication entry and the metadata of documents no
    /// other exam refers to.
    pub fn delete_exam(&self, id: &str) -> Result<Option<RemovedExam>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let removed = match load::<Exam>(&write_txn, EXAMS, id)? {
            Some(exam) => {
                let shared = documents_of_other_exams(&write_txn, id)?;
                remove(&write_txn, EXAMS, id)?;

                let mut document_ids = Vec::new();
                for document_id in exam.document_ids() {
                    if shared.contains(&document_id) || document_ids.contains(&document_id) {
                        continue;
                    }
                    if remove(&write_txn, DOCUMENTS, &document_id)? {
                        document_ids.push(document_id);
                    }
                }
                {
                    let mut published = write_txn.open_table(PUBLISHED_RESULTS)?;
                    published.remove(id)?;
                }
                Some(RemovedExam { exam, document_ids })
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(removed)
    }

    // ========================================================================
    // Published results
    // ========================================================================

    /// Add an exam to the published set and mark it completed
    pub fn publish_results(
        &self,
        exam_id: &str,
        published_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let published = match load::<Exam>(&write_txn, EXAMS, exam_id)? {
            Some(mut exam) => {
                exam.status = ExamStatus::Completed;
                exam.published_at = Some(published_at);
                store(&write_txn, EXAMS, exam_id, &exam)?;

                let mut table = write_txn.open_table(PUBLISHED_RESULTS)?;
                table.insert(exam_id, published_at.to_rfc3339().as_str())?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(published)
    }

    /// Remove an exam from the published set and return it to review
    pub fn unpublish_results(&self, exam_id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let removed = {
            let mut table = write_txn.open_table(PUBLISHED_RESULTS)?;
            let removed = table.remove(exam_id)?.is_some();
            removed
        };

        if let Some(mut exam) = load::<Exam>(&write_txn, EXAMS, exam_id)? {
            if exam.status == ExamStatus::Completed {
                exam.status = ExamStatus::Submitted;
            }
            exam.published_at = None;
            store(&write_txn, EXAMS, exam_id, &exam)?;
        }

        write_txn.commit()?;
        Ok(removed)
    }

    pub fn is_published(&self, exam_id: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PUBLISHED_RESULTS)?;
        Ok(table.get(exam_id)?.is_some())
    }

    /// The published set: exam id -> publish time (RFC 3339)
    pub fn published_results(&self) -> Result<HashMap<String, String>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PUBLISHED_RESULTS)?;

        let mut published = HashMap::new();
        for result in table.iter()? {
            let (key, value) = result?;
            published.insert(key.value().to_string(), value.value().to_string());
        }
        Ok(published)
    }
}

/// Document ids referenced by every exam except `exam_id`.
fn documents_of_other_exams(
    txn: &WriteTransaction,
    exam_id: &str,
) -> Result<HashSet<String>, DatabaseError> {
    let table = txn.open_table(EXAMS)?;
    let mut ids = HashSet::new();
    for result in table.iter()? {
        let (key, value) = result?;
        if key.value() == exam_id {
            continue;
        }
        let exam: Exam = rmp_serde::from_slice(value.value())?;
        ids.extend(exam.document_ids());
    }
    Ok(ids)
}
