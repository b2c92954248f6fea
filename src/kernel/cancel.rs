use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::StudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(pub Uuid);

/// Tracks which upload is current, so late transcription results for a
/// superseded file can be told apart and dropped.
#[derive(Debug, Default)]
pub struct UploadRegistry {
    current: Option<UploadId>,
    superseded: u64,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new upload. Returns the new id and the one it supersedes, if
    /// any, whose in-flight work should be cancelled.
    pub fn begin(&mut self) -> (UploadId, Option<UploadId>) {
        let id = UploadId(Uuid::new_v4());
        let previous = self.current.replace(id);
        if previous.is_some() {
            self.superseded += 1;
        }
        (id, previous)
    }

    pub fn current(&self) -> Option<UploadId> {
        self.current
    }

    pub fn is_current(&self, id: UploadId) -> bool {
        self.current == Some(id)
    }

    /// `Err(StaleUploadResult)` for anything but the current upload.
    pub fn check(&self, id: UploadId) -> Result<(), StudioError> {
        if self.is_current(id) {
            Ok(())
        } else {
            debug!("Upload {:?} is stale (current {:?})", id, self.current);
            Err(StudioError::StaleUploadResult)
        }
    }

    pub fn clear(&mut self) -> Option<UploadId> {
        self.current.take()
    }

    pub fn superseded_count(&self) -> u64 {
        self.superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_upload_makes_older_results_stale() {
        let mut registry = UploadRegistry::new();
        let (first, none) = registry.begin();
        assert!(none.is_none());
        assert!(registry.check(first).is_ok());

        let (second, previous) = registry.begin();
        assert_eq!(previous, Some(first));
        assert_eq!(registry.check(first), Err(StudioError::StaleUploadResult));
        assert!(registry.check(second).is_ok());
        assert_eq!(registry.superseded_count(), 1);
    }
}
