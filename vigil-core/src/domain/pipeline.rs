//! Pipeline run domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::status::{self, PipelineStatus};

/// Pipeline run as reported by the status endpoint
///
/// Fetched once when a run is opened and never mutated afterwards; a newer
/// view of the run requires a new fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunSnapshot {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub pipeline_unit_id: Option<String>,
    #[serde(default, deserialize_with = "status::deserialize_lenient")]
    pub status: Option<PipelineStatus>,
    #[serde(default)]
    pub macro_service_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub micro_service_names: Vec<String>,
    #[serde(default)]
    pub requester_name: Option<String>,
    #[serde(default)]
    pub approver_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gitlab_pipeline_id: Option<i64>,
}

impl PipelineRunSnapshot {
    /// Creates a snapshot with only the identifier and creation time set
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            pipeline_unit_id: None,
            status: None,
            macro_service_name: None,
            micro_service_names: Vec::new(),
            requester_name: None,
            approver_name: None,
            created_at,
            updated_at: None,
            gitlab_pipeline_id: None,
        }
    }
}

/// The backend serializes empty lists as `null`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
