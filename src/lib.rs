pub mod audio;
pub mod config;
pub mod error;
pub mod kernel;
pub mod lyrics;
pub mod services;

// Re-export specific items for convenient access from the UI shell
pub use audio::router::{AudioRouter, ModeChange, RoutingMode};
pub use kernel::reactor::Reactor;
pub use lyrics::classify::{classify, LyricsPosition, LyricsState};
pub use lyrics::segment::{Transcript, TranscriptSegment};
