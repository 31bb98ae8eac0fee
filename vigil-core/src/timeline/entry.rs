//! Merged timeline entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::pipeline::PipelineRunSnapshot;
use crate::domain::status::PipelineStatus;
use crate::domain::update::StatusUpdateEvent;

/// Latest known state of one service (or of the run itself) on the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedTimelineEntry {
    /// Merge key this entry is stored under
    pub key: String,
    /// Set on the entry seeded from the run snapshot
    pub is_initial: bool,
    pub pipeline_run_id: Option<String>,
    pub service_id: Option<String>,
    pub status: Option<PipelineStatus>,
    pub message: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Creation time of the run; only known on the seed entry
    pub created_at: Option<DateTime<Utc>>,
    pub macro_service_name: Option<String>,
    pub micro_service_names: Vec<String>,
    pub pipeline_unit_id: Option<String>,
    pub requester_name: Option<String>,
    pub approver_id: Option<String>,
    pub approver_name: Option<String>,
    pub comment: Option<String>,
}

impl MergedTimelineEntry {
    /// Builds the seed entry for a run snapshot
    pub fn from_snapshot(key: impl Into<String>, snapshot: &PipelineRunSnapshot) -> Self {
        let message = match &snapshot.macro_service_name {
            Some(name) => format!("Pipeline created for {}", name),
            None => "Pipeline created".to_string(),
        };

        Self {
            key: key.into(),
            is_initial: true,
            pipeline_run_id: Some(snapshot.id.clone()),
            service_id: None,
            status: snapshot.status,
            message: Some(message),
            timestamp: Some(snapshot.created_at),
            created_at: Some(snapshot.created_at),
            macro_service_name: snapshot.macro_service_name.clone(),
            micro_service_names: snapshot.micro_service_names.clone(),
            pipeline_unit_id: snapshot.pipeline_unit_id.clone(),
            requester_name: snapshot.requester_name.clone(),
            approver_id: None,
            approver_name: snapshot.approver_name.clone(),
            comment: None,
        }
    }

    /// Builds an entry from the first event seen for a key
    pub fn from_event(key: impl Into<String>, event: &StatusUpdateEvent) -> Self {
        Self {
            key: key.into(),
            is_initial: false,
            pipeline_run_id: event.pipeline_run_id.clone(),
            service_id: event.service_id().map(str::to_string),
            status: event.status,
            message: event.message.clone(),
            timestamp: event.timestamp,
            created_at: None,
            macro_service_name: event.macro_service_name.clone(),
            micro_service_names: event.micro_service_names.clone().unwrap_or_default(),
            pipeline_unit_id: event.pipeline_unit_id.clone(),
            requester_name: event.requester_name.clone(),
            approver_id: event.approver_id.clone(),
            approver_name: event.approver_name.clone(),
            comment: event.comment.clone(),
        }
    }

    /// Overwrites every field the event carries; absent fields keep their value
    pub fn apply(&mut self, event: &StatusUpdateEvent) {
        overwrite(&mut self.pipeline_run_id, &event.pipeline_run_id);
        if let Some(service_id) = event.service_id() {
            self.service_id = Some(service_id.to_string());
        }
        if event.status.is_some() {
            self.status = event.status;
        }
        overwrite(&mut self.message, &event.message);
        if event.timestamp.is_some() {
            self.timestamp = event.timestamp;
        }
        overwrite(&mut self.macro_service_name, &event.macro_service_name);
        if let Some(names) = &event.micro_service_names {
            self.micro_service_names = names.clone();
        }
        overwrite(&mut self.pipeline_unit_id, &event.pipeline_unit_id);
        overwrite(&mut self.requester_name, &event.requester_name);
        overwrite(&mut self.approver_id, &event.approver_id);
        overwrite(&mut self.approver_name, &event.approver_name);
        overwrite(&mut self.comment, &event.comment);
    }

    /// Timestamp used to order the timeline
    ///
    /// The seed entry stays anchored at the run's creation time even after
    /// run-level updates fold into it.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        if self.is_initial {
            self.created_at.or(self.timestamp)
        } else {
            self.timestamp
        }
    }

    /// Heading shown for the entry
    pub fn title(&self) -> String {
        if self.is_initial {
            let name = self.macro_service_name.as_deref().unwrap_or("Unknown");
            return format!("{} Pipeline", name);
        }

        self.service_id
            .as_deref()
            .or(self.macro_service_name.as_deref())
            .unwrap_or("Pipeline Service")
            .to_string()
    }

    /// Status label; an entry without a status reads as pending
    pub fn status_label(&self) -> &'static str {
        self.status.unwrap_or(PipelineStatus::Pending).label()
    }

    /// Approver worth showing: set and different from the requester
    pub fn distinct_approver(&self) -> Option<&str> {
        match (&self.approver_name, &self.requester_name) {
            (Some(approver), Some(requester)) if approver == requester => None,
            (Some(approver), _) => Some(approver.as_str()),
            (None, _) => None,
        }
    }

    /// Whether the entry reports a status after which nothing else happens
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|s| s.is_terminal())
    }
}

fn overwrite(slot: &mut Option<String>, incoming: &Option<String>) {
    if let Some(value) = incoming {
        *slot = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
    }

    #[test]
    fn test_seed_entry_from_snapshot() {
        let mut snapshot = PipelineRunSnapshot::new("run-1", at(0));
        snapshot.macro_service_name = Some("billing".to_string());
        snapshot.micro_service_names = vec!["svc-a".to_string()];

        let entry = MergedTimelineEntry::from_snapshot("billing", &snapshot);
        assert!(entry.is_initial);
        assert_eq!(entry.message.as_deref(), Some("Pipeline created for billing"));
        assert_eq!(entry.effective_timestamp(), Some(at(0)));
        assert_eq!(entry.title(), "billing Pipeline");
        assert_eq!(entry.status_label(), "Pending");
    }

    #[test]
    fn test_apply_keeps_omitted_fields() {
        let first = StatusUpdateEvent {
            current_service_id: Some("svc-a".to_string()),
            status: Some(PipelineStatus::Running),
            message: Some("deploying".to_string()),
            comment: Some("go".to_string()),
            timestamp: Some(at(10)),
            ..Default::default()
        };
        let second = StatusUpdateEvent {
            status: Some(PipelineStatus::Success),
            ..Default::default()
        };

        let mut entry = MergedTimelineEntry::from_event("svc-a", &first);
        entry.apply(&second);

        assert_eq!(entry.status, Some(PipelineStatus::Success));
        assert_eq!(entry.message.as_deref(), Some("deploying"));
        assert_eq!(entry.comment.as_deref(), Some("go"));
        assert_eq!(entry.timestamp, Some(at(10)));
    }

    #[test]
    fn test_seed_entry_stays_anchored_at_creation() {
        let snapshot = PipelineRunSnapshot::new("run-1", at(0));
        let mut entry = MergedTimelineEntry::from_snapshot("pipeline", &snapshot);
        entry.apply(&StatusUpdateEvent {
            status: Some(PipelineStatus::Completed),
            timestamp: Some(at(300)),
            ..Default::default()
        });

        assert_eq!(entry.timestamp, Some(at(300)));
        assert_eq!(entry.effective_timestamp(), Some(at(0)));
        assert!(entry.is_terminal());
    }

    #[test]
    fn test_titles_and_approver() {
        let mut entry = MergedTimelineEntry::from_event("x", &StatusUpdateEvent::default());
        assert_eq!(entry.title(), "Pipeline Service");

        entry.macro_service_name = Some("billing".to_string());
        assert_eq!(entry.title(), "billing");

        entry.service_id = Some("svc-a".to_string());
        assert_eq!(entry.title(), "svc-a");

        entry.requester_name = Some("alice".to_string());
        entry.approver_name = Some("alice".to_string());
        assert_eq!(entry.distinct_approver(), None);

        entry.approver_name = Some("bob".to_string());
        assert_eq!(entry.distinct_approver(), Some("bob"));
    }
}
