//! Live channel frame DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::update::StatusUpdateEvent;
use crate::timeline::{PayloadError, RawEvent};

/// Frame type carrying a pipeline status change
pub const PIPELINE_STATUS_CHANGE: &str = "pipeline_status_change";

/// Envelope of every message received on the live channel
///
/// `payload` is kept raw: the backend sends it as a JSON-encoded string,
/// other producers send the object directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LiveFrame {
    /// Whether this frame is a status change for the given run
    pub fn is_status_change_for(&self, pipeline_run_id: &str) -> bool {
        self.frame_type == PIPELINE_STATUS_CHANGE && self.id == pipeline_run_id
    }

    /// Decodes the payload into a typed status update
    pub fn decode_event(&self) -> Result<StatusUpdateEvent, PayloadError> {
        self.payload.decode()
    }
}
