//! Signal feed replaying a fixed list of posts.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::models::{Signal, SignalSource};
use crate::domain::ports::{FeedError, SignalFeed};

/// One record of a scripted feed file.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRecord {
    /// Where the post came from.
    #[serde(default = "default_source")]
    pub source: SignalSource,
    /// Post text.
    pub content: String,
}

const fn default_source() -> SignalSource {
    SignalSource::Twitter
}

/// Yields one queued signal per poll until none are left.
pub struct ScriptedSignalFeed {
    pending: Mutex<VecDeque<Signal>>,
}

impl ScriptedSignalFeed {
    /// Feed over an in-memory list.
    pub fn new(signals: impl IntoIterator<Item = Signal>) -> Self {
        Self {
            pending: Mutex::new(signals.into_iter().collect()),
        }
    }

    /// Read a JSON array of `{"source", "content"}` records.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FeedError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Parse a JSON array of [`FeedRecord`]s.
    pub fn from_json(raw: &str) -> Result<Self, FeedError> {
        let records: Vec<FeedRecord> =
            serde_json::from_str(raw).map_err(|e| FeedError::Malformed(e.to_string()))?;
        Ok(Self::new(
            records
                .into_iter()
                .map(|record| Signal::new(record.source, record.content)),
        ))
    }

    /// Signals not yet handed out.
    pub fn remaining(&self) -> usize {
        self.pending.lock().map_or(0, |pending| pending.len())
    }
}

#[async_trait]
impl SignalFeed for ScriptedSignalFeed {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn poll(&self) -> Result<Vec<Signal>, FeedError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| FeedError::Unavailable("feed state poisoned".to_string()))?;
        Ok(pending.pop_front().into_iter().collect())
    }

    fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_signal_per_poll() {
        let feed = ScriptedSignalFeed::new([Signal::tweet("a"), Signal::tweet("b")]);

        assert_eq!(feed.poll().await.unwrap()[0].content, "a");
        assert!(!feed.is_exhausted());
        assert_eq!(feed.poll().await.unwrap()[0].content, "b");
        assert!(feed.is_exhausted());
        assert!(feed.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(
            &path,
            r#"[{"content": "Aave exploit"}, {"source": "discord", "content": "gm"}]"#,
        )
        .unwrap();

        let feed = ScriptedSignalFeed::from_file(&path).await.unwrap();
        assert_eq!(feed.remaining(), 2);
        let first = feed.poll().await.unwrap().remove(0);
        assert_eq!(first.source, SignalSource::Twitter);
        assert_eq!(feed.poll().await.unwrap()[0].source, SignalSource::Discord);
    }

    #[tokio::test]
    async fn test_bad_input() {
        assert!(matches!(
            ScriptedSignalFeed::from_json("{not json"),
            Err(FeedError::Malformed(_))
        ));
        assert!(matches!(
            ScriptedSignalFeed::from_file("/nonexistent/feed.json").await,
            Err(FeedError::Unavailable(_))
        ));
    }
}
