//! Live status update domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::status::PipelineStatus;

/// Incremental status change pushed over the live channel
///
/// Every field is optional: an update only carries what changed, and the
/// merge keeps the previous value for anything left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateEvent {
    pub pipeline_run_id: Option<String>,
    /// Service within the run; `None` when the update is about the run itself
    pub current_service_id: Option<String>,
    /// Older name for `current_service_id`, still sent by some producers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_service_id: Option<String>,
    pub status: Option<PipelineStatus>,
    pub message: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub macro_service_name: Option<String>,
    pub micro_service_names: Option<Vec<String>>,
    pub pipeline_unit_id: Option<String>,
    pub requester_name: Option<String>,
    pub approver_id: Option<String>,
    pub approver_name: Option<String>,
    pub comment: Option<String>,
}

impl StatusUpdateEvent {
    /// Service the update is about, whichever of the two names carried it
    pub fn service_id(&self) -> Option<&str> {
        self.current_service_id
            .as_deref()
            .or(self.sub_service_id.as_deref())
    }
}
