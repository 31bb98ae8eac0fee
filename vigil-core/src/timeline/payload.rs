//! Raw update payload decoding

use serde::Deserialize;
use serde_json::Value;

use crate::domain::update::StatusUpdateEvent;

/// Why a raw payload could not be turned into a status update
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The payload text is not JSON at all
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The payload is JSON but does not describe a status update
    #[error("payload does not match the status update schema: {0}")]
    Schema(#[source] serde_json::Error),

    /// The payload is a JSON value other than an object
    #[error("payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Anything that can be decoded into a [`StatusUpdateEvent`]
///
/// Live payloads arrive either as typed events (already validated by the
/// channel), as JSON text, or as JSON values whose string form wraps the
/// encoded object.
pub trait RawEvent {
    fn decode(&self) -> Result<StatusUpdateEvent, PayloadError>;
}

impl RawEvent for StatusUpdateEvent {
    fn decode(&self) -> Result<StatusUpdateEvent, PayloadError> {
        Ok(self.clone())
    }
}

impl RawEvent for str {
    fn decode(&self) -> Result<StatusUpdateEvent, PayloadError> {
        let value: Value = serde_json::from_str(self).map_err(PayloadError::InvalidJson)?;
        value.decode()
    }
}

impl RawEvent for String {
    fn decode(&self) -> Result<StatusUpdateEvent, PayloadError> {
        self.as_str().decode()
    }
}

impl RawEvent for Value {
    fn decode(&self) -> Result<StatusUpdateEvent, PayloadError> {
        match self {
            Value::Object(_) => StatusUpdateEvent::deserialize(self).map_err(PayloadError::Schema),
            Value::String(encoded) => encoded.as_str().decode(),
            Value::Null => Err(PayloadError::NotAnObject("null")),
            Value::Bool(_) => Err(PayloadError::NotAnObject("a boolean")),
            Value::Number(_) => Err(PayloadError::NotAnObject("a number")),
            Value::Array(_) => Err(PayloadError::NotAnObject("an array")),
        }
    }
}

impl<T: RawEvent + ?Sized> RawEvent for &T {
    fn decode(&self) -> Result<StatusUpdateEvent, PayloadError> {
        (**self).decode()
    }
}
