//! Studio telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside routing or lyrics decisions.
//!
//! # PRIVACY INVARIANT
//! Events carry ids, indices and counts only. Never lyric text or audio.

pub mod event;
pub mod metrics;
pub mod recorder;
