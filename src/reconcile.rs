/// Client Reconciliation Layer
///
/// Runs on the consuming side but is part of the protocol contract: on
/// (re)connect the client pulls the backlog with its last seen marker and
/// merges it with anything received live during the same window.
///
/// The merge key is the record identifier, never content: two records with
/// identical title and body but different identifiers are distinct. The read
/// flag merges monotonically (false -> true only), and the unread count is
/// always derived, never stored.
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::models::Notification;

#[derive(Debug, Default, Clone)]
pub struct NotificationInbox {
    records: BTreeMap<i64, Notification>,
}

impl NotificationInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a record pushed over the live channel.
    pub fn ingest_live(&mut self, record: Notification) {
        self.upsert(record);
    }

    /// Fold in a pulled backlog (already ordered, but order is not assumed).
    pub fn merge_backlog(&mut self, backlog: impl IntoIterator<Item = Notification>) {
        for record in backlog {
            self.upsert(record);
        }
    }

    fn upsert(&mut self, record: Notification) {
        match self.records.entry(record.id) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut existing) => {
                if record.is_read {
                    existing.get_mut().is_read = true;
                }
            }
        }
    }

    /// Records in creation order (ascending identifier).
    pub fn records(&self) -> impl Iterator<Item = &Notification> {
        self.records.values()
    }

    pub fn unread_count(&self) -> usize {
        self.records.values().filter(|n| !n.is_read).count()
    }

    /// Marker for the next backlog pull; 0 when nothing has been seen.
    pub fn last_seen_id(&self) -> i64 {
        self.records.keys().next_back().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationCategory;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(id: i64, title: &str, is_read: bool) -> Notification {
        Notification {
            id,
            recipient_id: Uuid::new_v4(),
            category: NotificationCategory::System,
            title: title.to_string(),
            body: "body".to_string(),
            is_read,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_dedup_is_by_identifier_not_content() {
        let mut inbox = NotificationInbox::new();
        inbox.ingest_live(record(1, "same", false));
        inbox.ingest_live(record(1, "same", false));
        inbox.ingest_live(record(2, "same", false)); // identical content, new id

        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox.unread_count(), 2);
    }

    #[test]
    fn test_backlog_merge_does_not_duplicate_live_records() {
        let mut inbox = NotificationInbox::new();
        inbox.ingest_live(record(3, "live", false));
        inbox.merge_backlog(vec![record(2, "older", true), record(3, "live", false)]);

        assert_eq!(inbox.len(), 2);
        let ids: Vec<i64> = inbox.records().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_read_flag_merges_monotonically() {
        let mut inbox = NotificationInbox::new();
        inbox.ingest_live(record(1, "a", false));
        // Backlog knows the record was read on another device.
        inbox.merge_backlog(vec![record(1, "a", true)]);
        assert_eq!(inbox.unread_count(), 0);

        // A stale unread copy never flips it back.
        inbox.ingest_live(record(1, "a", false));
        assert_eq!(inbox.unread_count(), 0);
    }

    #[test]
    fn test_last_seen_id_is_resume_marker() {
        let mut inbox = NotificationInbox::new();
        assert_eq!(inbox.last_seen_id(), 0);

        inbox.merge_backlog(vec![record(5, "a", false), record(9, "b", false)]);
        assert_eq!(inbox.last_seen_id(), 9);
    }

    #[test]
    fn test_records_iterate_in_creation_order() {
        let mut inbox = NotificationInbox::new();
        inbox.ingest_live(record(7, "c", false));
        inbox.ingest_live(record(2, "a", false));
        inbox.ingest_live(record(4, "b", false));

        let ids: Vec<i64> = inbox.records().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 4, 7]);
    }
}
