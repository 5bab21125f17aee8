use super::db::{load, remove, store, Database, DatabaseError};
use super::models::Notification;
use super::tables::*;

impl Database {
    // ========================================================================
    // Notification operations
    // ========================================================================

    /// Record a notification in the controller log and deliver a copy to
    /// each recipient's inbox (newest first).
    pub fn send_notification(&self, notification: &Notification) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            store(&write_txn, NOTIFICATIONS, &notification.id, notification)?;

            for recipient in &notification.recipients {
                let mut inbox: Vec<Notification> =
                    load(&write_txn, TEACHER_INBOX, &recipient.teacher_id)?.unwrap_or_default();

                if inbox.iter().any(|n| n.id == notification.id) {
                    continue;
                }

                let mut copy = notification.clone();
                copy.recipient_id = Some(recipient.teacher_id.clone());
                copy.recipient_name = Some(recipient.name.clone());
                inbox.insert(0, copy);
                store(&write_txn, TEACHER_INBOX, &recipient.teacher_id, &inbox)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_notification(&self, id: &str) -> Result<Option<Notification>, DatabaseError> {
        self.read_record(NOTIFICATIONS, id)
    }

    /// The controller's sent log, newest first
    pub fn list_notifications(&self) -> Result<Vec<Notification>, DatabaseError> {
        let mut notifications: Vec<Notification> = self.read_all(NOTIFICATIONS)?;
        notifications.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(notifications)
    }

    /// Remove a notification from the controller log. Inbox copies are kept.
    pub fn delete_notification(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = remove(&write_txn, NOTIFICATIONS, id)?;
        write_txn.commit()?;
        Ok(deleted)
    }

    pub fn inbox(&self, teacher_id: &str) -> Result<Vec<Notification>, DatabaseError> {
        Ok(self
            .read_record::<Vec<Notification>>(TEACHER_INBOX, teacher_id)?
            .unwrap_or_default())
    }

    /// Mark inbox notifications read by `teacher_id`, mirroring the read
    /// receipt into the controller log. `None` marks the whole inbox.
    /// Returns how many notifications changed from unread to read.
    pub fn mark_notifications_read(
        &self,
        teacher_id: &str,
        notification_ids: Option<&[String]>,
    ) -> Result<usize, DatabaseError> {
        let write_txn = self.begin_write()?;

        let mut inbox: Vec<Notification> =
            load(&write_txn, TEACHER_INBOX, teacher_id)?.unwrap_or_default();

        let mut newly_read = Vec::new();
        for notification in inbox.iter_mut() {
            let selected = notification_ids.map_or(true, |ids| ids.contains(&notification.id));
            if selected && notification.mark_read_by(teacher_id) {
                newly_read.push(notification.id.clone());
            }
        }

        if !newly_read.is_empty() {
            store(&write_txn, TEACHER_INBOX, teacher_id, &inbox)?;

            for id in &newly_read {
                if let Some(mut logged) = load::<Notification>(&write_txn, NOTIFICATIONS, id)? {
                    if logged.mark_read_by(teacher_id) {
                        store(&write_txn, NOTIFICATIONS, id, &logged)?;
                    }
                }
            }
        }

        write_txn.commit()?;
        Ok(newly_read.len())
    }
}
