//! Core domain types
//!
//! This module contains the structures describing a pipeline run as the
//! dashboard backend reports it: the snapshot returned by the status endpoint
//! and the incremental updates pushed over the live channel.

pub mod pipeline;
pub mod status;
pub mod update;
