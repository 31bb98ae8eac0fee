//! Per-view timeline state

use crate::domain::pipeline::PipelineRunSnapshot;
use crate::domain::update::StatusUpdateEvent;
use crate::timeline::entry::MergedTimelineEntry;
use crate::timeline::merge::merge;

/// Load state of the run snapshot backing a view
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotState {
    Loading,
    Ready(PipelineRunSnapshot),
    Failed(String),
}

/// Everything one open view of a pipeline run knows
///
/// Holds the snapshot load state and every update received for the run, in
/// arrival order. Losing and regaining the live channel does not touch the
/// recorded updates; only [`RunTimeline::reset`] (closing the view) does.
#[derive(Debug, Clone)]
pub struct RunTimeline {
    snapshot: SnapshotState,
    events: Vec<StatusUpdateEvent>,
}

impl RunTimeline {
    pub fn new() -> Self {
        Self {
            snapshot: SnapshotState::Loading,
            events: Vec::new(),
        }
    }

    pub fn snapshot_state(&self) -> &SnapshotState {
        &self.snapshot
    }

    /// The snapshot, once loaded
    pub fn snapshot(&self) -> Option<&PipelineRunSnapshot> {
        match &self.snapshot {
            SnapshotState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn set_snapshot(&mut self, snapshot: PipelineRunSnapshot) {
        self.snapshot = SnapshotState::Ready(snapshot);
    }

    pub fn set_snapshot_failed(&mut self, reason: impl Into<String>) {
        self.snapshot = SnapshotState::Failed(reason.into());
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.snapshot, SnapshotState::Loading)
    }

    /// Records an update in arrival order
    pub fn record(&mut self, event: StatusUpdateEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[StatusUpdateEvent] {
        &self.events
    }

    /// Current timeline, refolded from the snapshot and all recorded updates
    pub fn entries(&self) -> Vec<MergedTimelineEntry> {
        merge(self.snapshot(), &self.events)
    }

    /// Whether the view only shows the run itself and is still expecting progress
    pub fn is_awaiting_updates(&self) -> bool {
        if self.snapshot().is_none() {
            return false;
        }

        let entries = self.entries();
        entries.len() == 1 && !entries[0].is_terminal()
    }

    /// Forgets the snapshot and every recorded update
    pub fn reset(&mut self) {
        self.snapshot = SnapshotState::Loading;
        self.events.clear();
    }
}

impl Default for RunTimeline {
    fn default() -> Self {
        Self::new()
    }
}
