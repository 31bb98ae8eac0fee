//! REST response envelope

use serde::{Deserialize, Serialize};

/// Body returned by every successful REST call: `{ "message": ..., "data": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}
