//! Data Transfer Objects for backend communication
//!
//! This module contains the envelopes the dashboard backend wraps around its
//! REST responses and its live-channel frames.

pub mod envelope;
pub mod frame;
