use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::lyrics::segment::{TranscriptSegment, TranscriptionResult, WordTimestamp};

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transcription server returned {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed transcription response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cancelled")]
    Cancelled,
}

#[derive(Clone)]
pub struct TranscriptionService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct VerboseResponse {
    #[serde(default)]
    segments: Vec<VerboseSegment>,
    #[serde(default)]
    words: Vec<WordTimestamp>,
}

#[derive(Deserialize)]
struct VerboseSegment {
    #[serde(default)]
    text: String,
    start: f64,
    end: f64,
}

impl TranscriptionService {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout) // Network-level hard timeout
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    /// Upload `path` and wait for timed segments, or until `cancel` fires.
    pub async fn transcribe(&self, path: &Path, cancel: CancellationToken) -> Result<TranscriptionResult, TranscriptionError> {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Transcription of {} cancelled", path.display());
                Err(TranscriptionError::Cancelled)
            }
            result = self.request(path) => result,
        }
    }

    async fn request(&self, path: &Path) -> Result<TranscriptionResult, TranscriptionError> {
        let api_key = self.api_key.as_deref().ok_or(TranscriptionError::MissingApiKey)?;

        let bytes = tokio::fs::read(path).await.map_err(|source| TranscriptionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());
        info!("Uploading {} ({} bytes) for transcription", file_name, bytes.len());

        let form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .text("timestamp_granularities[]", "word")
            .part("file", Part::bytes(bytes).file_name(file_name).mime_str("audio/wav")?);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TranscriptionError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_verbose_json(&body)
    }
}

/// Missing `segments` or `words` read as empty lists.
pub fn parse_verbose_json(body: &str) -> Result<TranscriptionResult, TranscriptionError> {
    let raw: VerboseResponse = serde_json::from_str(body)?;
    Ok(TranscriptionResult {
        segments: raw
            .segments
            .into_iter()
            .map(|s| TranscriptSegment::new(s.text.trim(), s.start, s.end))
            .collect(),
        words: raw.words,
    })
}

pub async fn load_transcript_file(path: &Path) -> Result<TranscriptionResult, TranscriptionError> {
    let body = tokio::fs::read_to_string(path).await.map_err(|source| TranscriptionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_verbose_json(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_segments_and_trims_text() {
        let body = r#"{
            "text": "hello world",
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.5, "text": " hello"},
                {"id": 1, "start": 1.5, "end": 3.0, "text": " world "}
            ],
            "words": [{"word": "hello", "start": 0.0, "end": 0.7}]
        }"#;
        let result = parse_verbose_json(body).unwrap();
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[1].text, "world");
        assert_eq!(result.words.len(), 1);
    }

    #[test]
    fn missing_lists_are_empty() {
        let result = parse_verbose_json(r#"{"text": ""}"#).unwrap();
        assert!(result.segments.is_empty());
        assert!(result.words.is_empty());
    }

    #[test]
    fn garbage_is_decode_error() {
        assert!(matches!(parse_verbose_json("not json"), Err(TranscriptionError::Decode(_))));
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let service = TranscriptionService::new("http://127.0.0.1:9", None, "whisper-1", Duration::from_secs(1));
        let err = service
            .transcribe(Path::new("nowhere.wav"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::MissingApiKey));
    }
}
