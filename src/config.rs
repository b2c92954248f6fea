use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::audio::router::RoutingMode;
use crate::kernel::reactor::ReactorConfig;

#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "funtime-studio")]
#[command(about = "Karaoke playback with synced lyrics", long_about = None)]
pub struct StudioConfig {
    /// WAV file to play
    #[arg(short, long, value_name = "FILE")]
    pub audio: PathBuf,

    /// Pre-computed transcript JSON; skips the transcription service
    #[arg(short, long, value_name = "FILE")]
    pub transcript: Option<PathBuf>,

    /// OpenAI-compatible API base
    #[arg(long, env = "TRANSCRIPTION_URL", default_value = "https://api.openai.com/v1")]
    pub transcription_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    #[arg(long, default_value = "whisper-1")]
    pub model: String,

    /// Start with the vocals removed
    #[arg(short, long)]
    pub karaoke: bool,

    #[arg(long, default_value_t = 0.8)]
    pub volume: f32,

    /// Record the microphone to this WAV file from startup (`r` stops and restarts)
    #[arg(short, long, value_name = "FILE")]
    pub record: Option<PathBuf>,

    /// Decode rate used when no output device is available
    #[arg(long, default_value_t = 48_000)]
    pub sample_rate: u32,

    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,
}

impl StudioConfig {
    pub fn record_on_start(&self) -> bool {
        self.record.is_some()
    }

    /// Where `r` records to when `--record` was not given.
    pub fn recording_path(&self) -> PathBuf {
        self.record.clone().unwrap_or_else(|| PathBuf::from("recording.wav"))
    }

    pub fn reactor(&self) -> ReactorConfig {
        ReactorConfig {
            start_mode: if self.karaoke {
                RoutingMode::Karaoke
            } else {
                RoutingMode::Normal
            },
            volume: self.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_karaoke_flag() {
        let config = StudioConfig::try_parse_from(["funtime-studio", "--audio", "song.wav", "-k"]).unwrap();
        assert_eq!(config.model, "whisper-1");
        assert_eq!(config.sample_rate, 48_000);
        let reactor = config.reactor();
        assert_eq!(reactor.start_mode, RoutingMode::Karaoke);
        assert!((reactor.volume - 0.8).abs() < f32::EPSILON);
        assert!(!config.record_on_start());
        assert_eq!(config.recording_path(), PathBuf::from("recording.wav"));
    }

    #[test]
    fn record_flag_starts_recording_at_boot() {
        let config =
            StudioConfig::try_parse_from(["funtime-studio", "--audio", "song.wav", "--record", "take.wav"]).unwrap();
        assert!(config.record_on_start());
        assert_eq!(config.recording_path(), PathBuf::from("take.wav"));
    }
}
