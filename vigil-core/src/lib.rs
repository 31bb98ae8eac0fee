//! Vigil Core
//!
//! Core types and the status merge engine for the Vigil pipeline dashboard.
//!
//! This crate contains:
//! - Domain types: Pipeline run snapshots and live status updates
//! - DTOs: Wire envelopes exchanged with the dashboard backend
//! - Timeline: The pure merge of a snapshot with live updates, plus the per-view state

pub mod domain;
pub mod dto;
pub mod timeline;
