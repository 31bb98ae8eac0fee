//! Pipeline status domain types

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a pipeline run, or of one service within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Pending,
    Accepted,
    Running,
    Success,
    Completed,
    Failed,
    Rejected,
}

impl PipelineStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Running => "running",
            Self::Success => "success",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }

    /// Human readable label shown on the timeline
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Running => "Running",
            Self::Success => "Success",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Rejected => "Rejected",
        }
    }

    /// Whether no further progress is expected after this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Completed | Self::Failed | Self::Rejected
        )
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status string is not one of the known values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pipeline status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for PipelineStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Deserializes an optional status, mapping empty or unknown values to `None`
///
/// The status endpoint reports whatever is stored for the run, which is not
/// always one of the live-channel values.
pub(crate) fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<PipelineStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let status: PipelineStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(status, PipelineStatus::Running);
        assert_eq!(
            serde_json::to_string(&PipelineStatus::Rejected).unwrap(),
            "\"rejected\""
        );
    }

    #[test]
    fn test_unknown_status_is_rejected_by_strict_parse() {
        assert!(serde_json::from_str::<PipelineStatus>("\"exploded\"").is_err());
        assert_eq!(
            "exploded".parse::<PipelineStatus>(),
            Err(UnknownStatus("exploded".to_string()))
        );
    }

    #[test]
    fn test_from_str_ignores_case() {
        assert_eq!(
            "Completed".parse::<PipelineStatus>(),
            Ok(PipelineStatus::Completed)
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(PipelineStatus::Success.is_terminal());
        assert!(PipelineStatus::Completed.is_terminal());
        assert!(PipelineStatus::Failed.is_terminal());
        assert!(PipelineStatus::Rejected.is_terminal());
        assert!(!PipelineStatus::Pending.is_terminal());
        assert!(!PipelineStatus::Accepted.is_terminal());
        assert!(!PipelineStatus::Running.is_terminal());
    }
}
