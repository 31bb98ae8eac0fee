//! Watch session for one pipeline run
//!
//! Ties a snapshot fetch and a live channel to a [`RunTimeline`], the way an
//! open status view does: one session per run, state discarded on close.

use tracing::{info, warn};
use vigil_core::timeline::{MergedTimelineEntry, RunTimeline};

use crate::live::{LiveUpdates, PipelineRunChannel};
use crate::runs::SnapshotProvider;

/// Open view of a pipeline run's status timeline
pub struct PipelineRunWatch {
    timeline: RunTimeline,
    channel: PipelineRunChannel,
    updates: Option<LiveUpdates>,
}

impl PipelineRunWatch {
    /// Connects the live channel and loads the run snapshot
    ///
    /// A failed snapshot fetch leaves the session open with the failure
    /// recorded in the timeline; live updates are still merged.
    pub async fn open<P>(provider: &P, mut channel: PipelineRunChannel) -> Self
    where
        P: SnapshotProvider + ?Sized,
    {
        let updates = channel.connect();
        let mut timeline = RunTimeline::new();

        match provider.fetch_snapshot(channel.pipeline_run_id()).await {
            Ok(snapshot) => timeline.set_snapshot(snapshot),
            Err(e) => {
                warn!(
                    "Failed to load pipeline run {}: {}",
                    channel.pipeline_run_id(),
                    e
                );
                timeline.set_snapshot_failed(e.to_string());
            }
        }

        Self {
            timeline,
            channel,
            updates: Some(updates),
        }
    }

    pub fn pipeline_run_id(&self) -> &str {
        self.channel.pipeline_run_id()
    }

    pub fn timeline(&self) -> &RunTimeline {
        &self.timeline
    }

    /// Current merged timeline
    pub fn entries(&self) -> Vec<MergedTimelineEntry> {
        self.timeline.entries()
    }

    /// Whether live updates may still arrive
    pub fn is_live(&self) -> bool {
        self.updates.is_some()
    }

    /// Waits for the next live update and returns the refreshed timeline
    ///
    /// Returns `None` once live updates are unavailable; the timeline built so
    /// far stays readable through [`PipelineRunWatch::entries`].
    pub async fn next_update(&mut self) -> Option<Vec<MergedTimelineEntry>> {
        let updates = self.updates.as_mut()?;

        match updates.recv().await {
            Some(event) => {
                self.timeline.record(event);
                Some(self.timeline.entries())
            }
            None => {
                info!(
                    "Live updates unavailable for pipeline run {}",
                    self.channel.pipeline_run_id()
                );
                self.updates = None;
                None
            }
        }
    }

    /// Disconnects and discards the session
    pub fn close(mut self) {
        self.channel.disconnect();
        self.updates = None;
        self.timeline.reset();
    }
}
