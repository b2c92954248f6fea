use std::path::PathBuf;

use super::cancel::UploadId;
use super::event::ProgressEvent;
use super::state::StateDelta;
use crate::lyrics::segment::Transcript;
use crate::lyrics::tracker::LyricsUpdate;

pub struct Scheduler;

/// Work for the driver. The kernel never performs I/O itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Log(String),
    ScrollToSegment { index: usize, text: String },
    RequestTranscription { upload: UploadId, path: PathBuf },
    CancelTranscription(UploadId),
    Notify(ProgressEvent),
    FeatureUnavailable(&'static str),
}

impl Scheduler {
    /// Pure Projection: LyricsUpdate + Transcript -> (StateDelta, SideEffect)
    pub fn lyrics(&self, update: &LyricsUpdate, transcript: &Transcript) -> (Option<StateDelta>, Option<SideEffect>) {
        let delta = Some(StateDelta::Lyrics(update.state));
        let effect = update.scroll.and_then(|scroll| {
            transcript.get(scroll.index).map(|segment| SideEffect::ScrollToSegment {
                index: scroll.index,
                text: segment.text.clone(),
            })
        });
        (delta, effect)
    }
}
