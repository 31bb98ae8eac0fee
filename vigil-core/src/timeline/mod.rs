//! Status timeline
//!
//! Combines the snapshot of a pipeline run with the live updates received for
//! it into one entry per service, ordered for display.
//!
//! - `merge`: the pure fold (snapshot + ordered events -> ordered entries)
//! - `entry`: the merged entry and its display rules
//! - `payload`: decoding of raw update payloads
//! - `state`: per-view accumulation of the snapshot and events

mod entry;
mod merge;
mod payload;
mod state;

pub use entry::MergedTimelineEntry;
pub use merge::{RUN_LEVEL_FALLBACK_KEY, TimelineBuilder, merge, merge_key};
pub use payload::{PayloadError, RawEvent};
pub use state::{RunTimeline, SnapshotState};
