//! Status merge engine
//!
//! Folds status updates, in arrival order, into one entry per merge key and
//! orders the result by effective timestamp. Folding never reorders by
//! timestamp: the last applied update wins field by field. Only the final
//! list is sorted.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::warn;

use crate::domain::pipeline::PipelineRunSnapshot;
use crate::domain::update::StatusUpdateEvent;
use crate::timeline::entry::MergedTimelineEntry;
use crate::timeline::payload::RawEvent;

/// Key used for run-level updates when no macro service name is known
pub const RUN_LEVEL_FALLBACK_KEY: &str = "pipeline";

/// Merge key of an update: its service, else its macro service, else the run
pub fn merge_key(event: &StatusUpdateEvent) -> &str {
    event
        .service_id()
        .or(event.macro_service_name.as_deref())
        .unwrap_or(RUN_LEVEL_FALLBACK_KEY)
}

fn seed_key(snapshot: &PipelineRunSnapshot) -> &str {
    snapshot
        .macro_service_name
        .as_deref()
        .unwrap_or(RUN_LEVEL_FALLBACK_KEY)
}

/// Incremental form of [`merge`]
///
/// Keeps entries in insertion order with a key index, so feeding events one
/// at a time yields exactly what a single `merge` call over the same events
/// yields.
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    entries: Vec<MergedTimelineEntry>,
    index: HashMap<String, usize>,
}

impl TimelineBuilder {
    /// Creates a builder, seeded with the run-level entry when a snapshot is known
    pub fn new(snapshot: Option<&PipelineRunSnapshot>) -> Self {
        let mut builder = Self::default();
        if let Some(snapshot) = snapshot {
            let key = seed_key(snapshot).to_string();
            builder.insert(MergedTimelineEntry::from_snapshot(key, snapshot));
        }
        builder
    }

    /// Folds one typed update into the entry for its key
    pub fn fold(&mut self, event: &StatusUpdateEvent) {
        let key = merge_key(event);
        match self.index.get(key).copied() {
            Some(position) => self.entries[position].apply(event),
            None => {
                let entry = MergedTimelineEntry::from_event(key, event);
                self.insert(entry);
            }
        }
    }

    /// Decodes and folds a raw payload
    ///
    /// Returns `false` when the payload was skipped as malformed.
    pub fn fold_raw<E: RawEvent + ?Sized>(&mut self, raw: &E) -> bool {
        match raw.decode() {
            Ok(event) => {
                self.fold(&event);
                true
            }
            Err(e) => {
                warn!("Skipping malformed status update: {}", e);
                false
            }
        }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current entry for a key
    pub fn get(&self, key: &str) -> Option<&MergedTimelineEntry> {
        self.index.get(key).map(|&position| &self.entries[position])
    }

    /// Entries ordered by effective timestamp
    pub fn ordered(&self) -> Vec<MergedTimelineEntry> {
        self.clone().into_ordered()
    }

    /// Consumes the builder, returning entries ordered by effective timestamp
    ///
    /// The sort is stable, so entries with equal timestamps keep their
    /// insertion order. Entries without any timestamp go last.
    pub fn into_ordered(self) -> Vec<MergedTimelineEntry> {
        let mut entries = self.entries;
        entries.sort_by(compare_timestamps);
        entries
    }

    fn insert(&mut self, entry: MergedTimelineEntry) {
        self.index.insert(entry.key.clone(), self.entries.len());
        self.entries.push(entry);
    }
}

fn compare_timestamps(a: &MergedTimelineEntry, b: &MergedTimelineEntry) -> Ordering {
    match (a.effective_timestamp(), b.effective_timestamp()) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Merges a run snapshot with the updates received so far
///
/// Pure: the result depends only on the snapshot and the events in the order
/// given. Malformed payloads are logged and skipped.
pub fn merge<E: RawEvent>(
    snapshot: Option<&PipelineRunSnapshot>,
    events: &[E],
) -> Vec<MergedTimelineEntry> {
    let mut builder = TimelineBuilder::new(snapshot);
    for event in events {
        builder.fold_raw(event);
    }
    builder.into_ordered()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::PipelineStatus;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
    }

    fn billing_snapshot() -> PipelineRunSnapshot {
        let mut snapshot = PipelineRunSnapshot::new("run-1", at(0));
        snapshot.macro_service_name = Some("billing".to_string());
        snapshot
    }

    fn service_event(
        service: &str,
        status: PipelineStatus,
        secs: i64,
    ) -> StatusUpdateEvent {
        StatusUpdateEvent {
            pipeline_run_id: Some("run-1".to_string()),
            current_service_id: Some(service.to_string()),
            status: Some(status),
            timestamp: Some(at(secs)),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_key_precedence() {
        let mut event = StatusUpdateEvent::default();
        assert_eq!(merge_key(&event), "pipeline");

        event.macro_service_name = Some("billing".to_string());
        assert_eq!(merge_key(&event), "billing");

        event.current_service_id = Some("svc-a".to_string());
        assert_eq!(merge_key(&event), "svc-a");
    }

    #[test]
    fn test_payload_with_both_service_names() {
        let entries = merge(
            None,
            &[
                r#"{"sub_service_id":"svc-a","current_service_id":"svc-a","status":"running"}"#,
                r#"{"sub_service_id":"svc-a","status":"success"}"#,
            ],
        );

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "svc-a");
        assert_eq!(entries[0].service_id.as_deref(), Some("svc-a"));
        assert_eq!(entries[0].status, Some(PipelineStatus::Success));
    }

    #[test]
    fn test_current_service_id_wins_over_older_name() {
        let event = StatusUpdateEvent {
            current_service_id: Some("svc-a".to_string()),
            sub_service_id: Some("svc-legacy".to_string()),
            ..Default::default()
        };
        assert_eq!(merge_key(&event), "svc-a");
    }

    #[test]
    fn test_snapshot_only() {
        let snapshot = billing_snapshot();
        let entries = merge::<StatusUpdateEvent>(Some(&snapshot), &[]);

        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_initial);
        assert_eq!(entries[0].key, "billing");
    }

    #[test]
    fn test_no_snapshot_no_events() {
        assert!(merge::<StatusUpdateEvent>(None, &[]).is_empty());
    }

    #[test]
    fn test_billing_scenario() {
        let snapshot = billing_snapshot();
        let events = vec![
            StatusUpdateEvent {
                current_service_id: Some("svc-a".to_string()),
                status: Some(PipelineStatus::Running),
                timestamp: Some(at(1)),
                requester_name: Some("alice".to_string()),
                ..Default::default()
            },
            StatusUpdateEvent {
                current_service_id: Some("svc-a".to_string()),
                status: Some(PipelineStatus::Success),
                timestamp: Some(at(2)),
                message: Some("done".to_string()),
                ..Default::default()
            },
        ];

        let entries = merge(Some(&snapshot), &events);
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].key, "billing");
        assert!(entries[0].is_initial);
        assert_eq!(entries[0].status, None);
        assert_eq!(entries[0].effective_timestamp(), Some(at(0)));

        assert_eq!(entries[1].key, "svc-a");
        assert_eq!(entries[1].status, Some(PipelineStatus::Success));
        assert_eq!(entries[1].message.as_deref(), Some("done"));
        assert_eq!(entries[1].timestamp, Some(at(2)));
        // set by the first event, omitted by the second
        assert_eq!(entries[1].requester_name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_partial_overwrite_law() {
        let a = StatusUpdateEvent {
            current_service_id: Some("svc-a".to_string()),
            status: Some(PipelineStatus::Accepted),
            message: Some("approved".to_string()),
            approver_name: Some("bob".to_string()),
            comment: Some("lgtm".to_string()),
            timestamp: Some(at(5)),
            ..Default::default()
        };
        let b = StatusUpdateEvent {
            current_service_id: Some("svc-a".to_string()),
            status: Some(PipelineStatus::Running),
            ..Default::default()
        };

        let entries = merge(None, &[a, b]);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.status, Some(PipelineStatus::Running));
        assert_eq!(entry.message.as_deref(), Some("approved"));
        assert_eq!(entry.approver_name.as_deref(), Some("bob"));
        assert_eq!(entry.comment.as_deref(), Some("lgtm"));
        assert_eq!(entry.timestamp, Some(at(5)));
    }

    #[test]
    fn test_run_level_updates_fold_into_seed() {
        let snapshot = billing_snapshot();
        let update = StatusUpdateEvent {
            macro_service_name: Some("billing".to_string()),
            status: Some(PipelineStatus::Accepted),
            approver_name: Some("bob".to_string()),
            timestamp: Some(at(30)),
            ..Default::default()
        };

        let entries = merge(Some(&snapshot), &[update]);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_initial);
        assert_eq!(entries[0].status, Some(PipelineStatus::Accepted));
        assert_eq!(entries[0].approver_name.as_deref(), Some("bob"));
    }

    #[test]
    fn test_output_sorted_by_timestamp_not_arrival() {
        let events = vec![
            service_event("svc-c", PipelineStatus::Running, 30),
            service_event("svc-a", PipelineStatus::Running, 10),
            service_event("svc-b", PipelineStatus::Running, 20),
        ];

        let keys: Vec<_> = merge(Some(&billing_snapshot()), &events)
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["billing", "svc-a", "svc-b", "svc-c"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let events = vec![
            service_event("svc-z", PipelineStatus::Running, 10),
            service_event("svc-m", PipelineStatus::Running, 10),
            service_event("svc-a", PipelineStatus::Running, 10),
        ];

        let keys: Vec<_> = merge(None, &events).into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["svc-z", "svc-m", "svc-a"]);
    }

    #[test]
    fn test_entries_without_timestamp_go_last() {
        let mut undated = service_event("svc-x", PipelineStatus::Pending, 0);
        undated.timestamp = None;
        let events = vec![undated, service_event("svc-a", PipelineStatus::Running, 50)];

        let keys: Vec<_> = merge(Some(&billing_snapshot()), &events)
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["billing", "svc-a", "svc-x"]);
    }

    #[test]
    fn test_missing_timestamp_falls_back_to_existing() {
        let first = service_event("svc-a", PipelineStatus::Running, 40);
        let mut second = service_event("svc-a", PipelineStatus::Success, 0);
        second.timestamp = None;

        let entries = merge(None, &[first, second]);
        assert_eq!(entries[0].timestamp, Some(at(40)));
        assert_eq!(entries[0].status, Some(PipelineStatus::Success));
    }

    #[test]
    fn test_out_of_order_timestamp_still_last_applied_wins() {
        let newer = service_event("svc-a", PipelineStatus::Success, 90);
        let older = service_event("svc-a", PipelineStatus::Running, 60);

        let entries = merge(None, &[newer, older]);
        assert_eq!(entries[0].status, Some(PipelineStatus::Running));
        assert_eq!(entries[0].timestamp, Some(at(60)));
    }

    #[test]
    fn test_malformed_payload_in_the_middle() {
        let payloads = vec![
            r#"{"current_service_id":"svc-a","status":"running","timestamp":"2024-05-01T10:00:01Z"}"#
                .to_string(),
            "{ this is not json".to_string(),
            r#"{"current_service_id":"svc-a","status":"bogus"}"#.to_string(),
            r#"{"current_service_id":"svc-b","status":"success","timestamp":"2024-05-01T10:00:02Z"}"#
                .to_string(),
        ];

        let entries = merge(None, &payloads);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "svc-a");
        assert_eq!(entries[0].status, Some(PipelineStatus::Running));
        assert_eq!(entries[1].key, "svc-b");
        assert_eq!(entries[1].status, Some(PipelineStatus::Success));
    }

    #[test]
    fn test_incremental_fold_matches_single_merge() {
        let snapshot = billing_snapshot();
        let payloads = vec![
            serde_json::json!({ "current_service_id": "svc-b", "status": "running", "timestamp": "2024-05-01T10:00:20Z" }),
            serde_json::json!({ "macro_service_name": "billing", "status": "accepted", "approver_name": "bob" }),
            serde_json::json!("{\"current_service_id\":\"svc-a\",\"status\":\"running\",\"timestamp\":\"2024-05-01T10:00:10Z\"}"),
            serde_json::json!(42),
            serde_json::json!({ "current_service_id": "svc-b", "message": "halfway" }),
            serde_json::json!({ "status": "failed", "timestamp": "2024-05-01T10:00:05Z" }),
            serde_json::json!({ "current_service_id": "svc-a", "status": "success", "timestamp": "2024-05-01T10:00:25Z" }),
        ];

        let expected = merge(Some(&snapshot), &payloads);

        let mut builder = TimelineBuilder::new(Some(&snapshot));
        for (i, payload) in payloads.iter().enumerate() {
            builder.fold_raw(payload);
            // every prefix agrees with a one-shot merge of that prefix
            assert_eq!(builder.ordered(), merge(Some(&snapshot), &payloads[..=i]));
        }
        assert_eq!(builder.into_ordered(), expected);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let events = vec![
            service_event("svc-a", PipelineStatus::Running, 10),
            service_event("svc-b", PipelineStatus::Running, 10),
            service_event("svc-a", PipelineStatus::Success, 5),
        ];

        let snapshot = billing_snapshot();
        assert_eq!(
            merge(Some(&snapshot), &events),
            merge(Some(&snapshot), &events)
        );
    }

    #[test]
    fn test_builder_lookup() {
        let mut builder = TimelineBuilder::new(None);
        assert!(builder.is_empty());
        builder.fold(&service_event("svc-a", PipelineStatus::Running, 1));
        builder.fold(&service_event("svc-a", PipelineStatus::Failed, 2));

        assert_eq!(builder.len(), 1);
        assert_eq!(
            builder.get("svc-a").and_then(|e| e.status),
            Some(PipelineStatus::Failed)
        );
        assert!(!builder.fold_raw("null"));
    }
}
