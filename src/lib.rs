//! exam-manager - Online examination service for teachers and the exam controller
//!
//! This crate provides:
//! - Teacher signup/login, departments, students and exams with answer sheets
//! - Per-question evaluation, grade bands and results publication
//! - Controller notifications with per-teacher inboxes
//! - Documents in swappable object storage (local filesystem, GCS)
//! - State replicated via muster over a redb embedded database
//! - A long-poll change feed so clients refresh only when something changed

pub mod api;
pub mod changes;
pub mod config;
pub mod data_url;
pub mod grading;
pub mod object_store;
pub mod service;
pub mod state_machine;
pub mod storage;

use std::sync::Arc;

use changes::ChangeFeed;
use config::Config;
use state_machine::ExamStateMachine;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub node: Arc<muster::RedbNode<ExamStateMachine>>,
    pub object_store: Arc<dyn object_store::ObjectStore>,
    pub changes: Arc<ChangeFeed>,
}
