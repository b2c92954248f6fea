//! Synchronized Lyrics Engine: maps the playback clock onto an immutable,
//! time-ordered transcript.

pub mod classify;
pub mod segment;
pub mod tracker;
