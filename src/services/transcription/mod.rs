pub mod client;

pub use client::{load_transcript_file, parse_verbose_json, TranscriptionError, TranscriptionService};
