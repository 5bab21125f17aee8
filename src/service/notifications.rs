use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::teachers::find as find_teacher;
use super::{ServiceError, ServiceResult};
use crate::storage::models::{
    Audience, Notification, Priority, Recipient, TeacherStatus, WriteOp,
};
use crate::storage::Database;

/// Sender recorded on controller notifications.
pub const CONTROLLER_SENDER: &str = "Exam Controller";

/// Who a notification goes to: every active teacher, or a chosen list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipientSelection {
    Everyone(AllMarker),
    Teachers(Vec<String>),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllMarker {
    All,
}

impl Default for RecipientSelection {
    fn default() -> Self {
        RecipientSelection::Teachers(Vec::new())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub recipients: RecipientSelection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFilter {
    #[default]
    All,
    Unread,
    Read,
}

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub filter: ReadFilter,
}

#[derive(Debug, Clone, Serialize)]
pub struct Inbox {
    pub unread_count: usize,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkReadRequest {
    /// Omit to mark the whole inbox
    #[serde(default)]
    pub notification_ids: Option<Vec<String>>,
}

/// Validate a notification and resolve its recipients to active teachers.
pub fn prepare_send(db: &Database, req: &SendRequest) -> ServiceResult<Notification> {
    let title = req.title.trim();
    let message = req.message.trim();
    if title.is_empty() || message.is_empty() {
        return Err(ServiceError::Invalid(
            "Please fill in both title and message.".into(),
        ));
    }

    let active = db
        .list_teachers()?
        .into_iter()
        .filter(|t| t.status == TeacherStatus::Active);

    let (audience, recipients): (Audience, Vec<Recipient>) = match &req.recipients {
        RecipientSelection::Everyone(AllMarker::All) => (
            Audience::All,
            active
                .map(|t| Recipient {
                    teacher_id: t.teacher_id,
                    name: t.name,
                })
                .collect(),
        ),
        RecipientSelection::Teachers(ids) => {
            if ids.is_empty() {
                return Err(ServiceError::Invalid(
                    "Please select at least one teacher.".into(),
                ));
            }
            let recipients = active
                .filter(|t| ids.contains(&t.teacher_id))
                .map(|t| Recipient {
                    teacher_id: t.teacher_id,
                    name: t.name,
                })
                .collect();
            (Audience::Specific, recipients)
        }
    };

    if recipients.is_empty() {
        return Err(ServiceError::Invalid(
            "No active teachers to notify.".into(),
        ));
    }

    Ok(Notification {
        id: uuid::Uuid::new_v4().to_string(),
        title: title.to_string(),
        message: message.to_string(),
        priority: req.priority,
        audience,
        recipients,
        sender: CONTROLLER_SENDER.to_string(),
        sent_at: Utc::now(),
        read_by: Vec::new(),
        recipient_id: None,
        recipient_name: None,
    })
}

pub fn plan_delete(db: &Database, id: &str) -> ServiceResult<WriteOp> {
    let notification = db
        .get_notification(id)?
        .ok_or_else(|| ServiceError::NotFound("Notification not found".into()))?;
    Ok(WriteOp::DeleteNotification {
        id: notification.id,
    })
}

pub fn controller_list(db: &Database) -> ServiceResult<Vec<Notification>> {
    Ok(db.list_notifications()?)
}

pub fn inbox(db: &Database, teacher_id: &str, filter: ReadFilter) -> ServiceResult<Inbox> {
    let teacher = find_teacher(db, teacher_id)?;
    let all = db.inbox(&teacher.teacher_id)?;

    let unread_count = all
        .iter()
        .filter(|n| !n.is_read_by(&teacher.teacher_id))
        .count();

    let notifications = all
        .into_iter()
        .filter(|n| match filter {
            ReadFilter::All => true,
            ReadFilter::Unread => !n.is_read_by(&teacher.teacher_id),
            ReadFilter::Read => n.is_read_by(&teacher.teacher_id),
        })
        .collect();

    Ok(Inbox {
        unread_count,
        notifications,
    })
}

pub fn plan_mark_read(
    db: &Database,
    teacher_id: &str,
    req: &MarkReadRequest,
) -> ServiceResult<WriteOp> {
    let teacher = find_teacher(db, teacher_id)?;
    Ok(WriteOp::MarkNotificationsRead {
        teacher_id: teacher.teacher_id,
        notification_ids: req.notification_ids.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_selection_parsing() {
        let all: SendRequest =
            serde_json::from_str(r#"{"title":"t","message":"m","recipients":"all"}"#).unwrap();
        assert!(matches!(all.recipients, RecipientSelection::Everyone(_)));
        assert_eq!(all.priority, Priority::Normal);

        let some: SendRequest = serde_json::from_str(
            r#"{"title":"t","message":"m","priority":"high","recipients":["T1","T2"]}"#,
        )
        .unwrap();
        match some.recipients {
            RecipientSelection::Teachers(ids) => assert_eq!(ids, vec!["T1", "T2"]),
            other => panic!("unexpected selection: {other:?}"),
        }
        assert_eq!(some.priority, Priority::High);
    }
}
