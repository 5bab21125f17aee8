pub mod db;
mod departments;
mod documents;
pub mod exams;
pub mod models;
mod notifications;
pub mod snapshot;
mod students;
mod tables;
mod teachers;

pub use db::{Database, DatabaseError, PurgeStats};
pub use exams::{EvaluationOutcome, RemovedExam};
pub use snapshot::StoreSnapshot;
pub use tables::*;
