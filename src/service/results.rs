//! Result review, publication and the student results view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::exams::find;
use super::{matches_filter, matches_search, ServiceError, ServiceResult};
use crate::grading::{self, Grade, UNGRADED_LABEL};
use crate::storage::models::{Exam, WriteOp};
use crate::storage::Database;

/// Badge shown when a grade cannot be computed.
const UNGRADED_BADGE: &str = "bg-red-100 text-red-700";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishedFilter {
    #[default]
    All,
    Published,
    Unpublished,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewFilter {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub published: PublishedFilter,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewEntry {
    pub exam_id: String,
    pub title: String,
    pub department: String,
    pub year: String,
    pub subject: String,
    pub student_count: usize,
    pub average_marks: f64,
    pub total_marks: Option<f64>,
    pub is_published: bool,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    /// Exams with every answer sheet evaluated
    pub completed: usize,
    pub published: usize,
    pub unpublished: usize,
    pub total_students: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewQueue {
    pub stats: ReviewStats,
    pub exams: Vec<ReviewEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultsFilter {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub roll_number: Option<String>,
}

/// One student's published result for one exam.
#[derive(Debug, Clone, Serialize)]
pub struct StudentResult {
    pub exam_id: String,
    pub exam_title: String,
    pub subject: String,
    pub department: String,
    pub year: String,
    pub student_id: String,
    pub student_name: String,
    pub roll_number: String,
    pub marks: f64,
    pub total: f64,
    pub percentage: Option<f64>,
    pub grade: String,
    pub badge_class: String,
    pub published_at: Option<DateTime<Utc>>,
}

pub fn plan_publish(db: &Database, exam_id: &str) -> ServiceResult<WriteOp> {
    let exam = find(db, exam_id)?;

    if db.is_published(&exam.id)? {
        return Err(ServiceError::Conflict(
            "Results are already published.".into(),
        ));
    }
    if exam.submissions.is_empty() {
        return Err(ServiceError::Invalid(
            "This exam has no answer sheets.".into(),
        ));
    }
    if !exam.is_eligible_for_publication() {
        return Err(ServiceError::Invalid(format!(
            "{} answer sheet(s) are still pending evaluation.",
            exam.pending_count()
        )));
    }

    Ok(WriteOp::PublishResults {
        exam_id: exam.id,
        published_at: Utc::now(),
    })
}

pub fn plan_unpublish(db: &Database, exam_id: &str) -> ServiceResult<WriteOp> {
    let exam = find(db, exam_id)?;
    if !db.is_published(&exam.id)? {
        return Err(ServiceError::Invalid("Results are not published.".into()));
    }
    Ok(WriteOp::UnpublishResults { exam_id: exam.id })
}

/// Exams ready for the controller, with their publication state.
pub fn review_queue(db: &Database, filter: &ReviewFilter) -> ServiceResult<ReviewQueue> {
    let published = db.published_results()?;

    let eligible: Vec<(Exam, Option<String>)> = db
        .list_exams()?
        .into_iter()
        .filter(Exam::is_eligible_for_publication)
        .map(|exam| {
            let at = published.get(&exam.id).cloned();
            (exam, at)
        })
        .collect();

    let mut stats = ReviewStats {
        completed: eligible.len(),
        ..ReviewStats::default()
    };
    for (exam, published_at) in &eligible {
        if published_at.is_some() {
            stats.published += 1;
        } else {
            stats.unpublished += 1;
        }
        stats.total_students += exam.submissions.len();
    }

    let mut exams: Vec<ReviewEntry> = eligible
        .into_iter()
        .filter(|(exam, _)| matches_filter(filter.department.as_deref(), &exam.department))
        .filter(|(exam, _)| matches_filter(filter.year.as_deref(), &exam.year))
        .filter(|(_, at)| match filter.published {
            PublishedFilter::All => true,
            PublishedFilter::Published => at.is_some(),
            PublishedFilter::Unpublished => at.is_none(),
        })
        .filter(|(exam, _)| {
            matches_search(
                filter.search.as_deref(),
                &[&exam.title, &exam.subject, &exam.department],
            )
        })
        .map(|(exam, published_at)| ReviewEntry {
            average_marks: grading::average_marks(&exam.submissions),
            student_count: exam.submissions.len(),
            is_published: published_at.is_some(),
            published_at,
            exam_id: exam.id,
            title: exam.title,
            department: exam.department,
            year: exam.year,
            subject: exam.subject,
            total_marks: exam.total_marks,
        })
        .collect();

    exams.reverse();
    Ok(ReviewQueue { stats, exams })
}

/// The total an exam is marked out of: the configured total, else the
/// largest per-sheet maximum.
pub fn exam_total(exam: &Exam) -> f64 {
    if let Some(total) = exam.total_marks.filter(|t| *t > 0.0) {
        return total;
    }
    exam.submissions
        .iter()
        .filter_map(|s| s.evaluation.as_ref())
        .map(|e| if e.out_of > 0.0 { e.out_of } else { e.marks })
        .fold(0.0, f64::max)
}

/// Evaluated results of published exams, newest exam first.
pub fn student_results(db: &Database, filter: &ResultsFilter) -> ServiceResult<Vec<StudentResult>> {
    let published = db.published_results()?;
    let roll = filter
        .roll_number
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let mut results = Vec::new();
    for exam in db.list_exams()?.into_iter().rev() {
        if !published.contains_key(&exam.id) {
            continue;
        }
        if !matches_filter(filter.department.as_deref(), &exam.department)
            || !matches_filter(filter.year.as_deref(), &exam.year)
        {
            continue;
        }

        let total = exam_total(&exam);
        for submission in &exam.submissions {
            let Some(marks) = submission.marks().filter(|_| submission.is_evaluated()) else {
                continue;
            };
            if roll.is_some_and(|r| !submission.roll_number.eq_ignore_ascii_case(r)) {
                continue;
            }

            let grade = Grade::for_marks(marks, total);
            results.push(StudentResult {
                exam_id: exam.id.clone(),
                exam_title: exam.title.clone(),
                subject: exam.subject.clone(),
                department: exam.department.clone(),
                year: exam.year.clone(),
                student_id: submission.student_id.clone(),
                student_name: submission.student_name.clone(),
                roll_number: submission.roll_number.clone(),
                marks,
                total,
                percentage: grading::percentage(marks, total),
                grade: grade.map_or(UNGRADED_LABEL, Grade::label).to_string(),
                badge_class: grade.map_or(UNGRADED_BADGE, Grade::badge_class).to_string(),
                published_at: exam.published_at,
            });
        }
    }

    Ok(results)
}
