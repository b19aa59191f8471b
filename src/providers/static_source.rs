/*!
 * In-memory comment source.
 *
 * Serves a fixed comment list, either built directly or loaded from a danmu
 * API response saved to disk. Used for offline conversion and in tests:
 * - `StaticSource::new(comments)` - Always returns the given comments
 * - `StaticSource::failing(message)` - Always fails with a request error
 */

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::danmaku::Comment;
use crate::errors::FetchError;
use crate::providers::CommentSource;
use crate::providers::gamer::parse_response;

#[derive(Debug, Clone)]
enum Behavior {
    Comments(Vec<Comment>),
    Failing(String),
}

/// Comment source backed by a fixed list
#[derive(Debug, Clone)]
pub struct StaticSource {
    behavior: Behavior,
    /// Number of fetches served
    fetch_count: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn new(comments: Vec<Comment>) -> Self {
        Self {
            behavior: Behavior::Comments(comments),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose every fetch fails
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Failing(message.into()),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Parse a saved danmu API response
    pub fn from_json(body: &str) -> Result<Self, FetchError> {
        parse_response(body, "local").map(Self::new)
    }

    /// Load a saved danmu API response from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FetchError> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path)
            .map_err(|e| FetchError::RequestFailed(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(body.trim_start_matches('\u{FEFF}'))
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommentSource for StaticSource {
    async fn fetch(&self, _video_sn: &str) -> Result<Vec<Comment>, FetchError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Comments(comments) => Ok(comments.clone()),
            Behavior::Failing(message) => Err(FetchError::RequestFailed(message.clone())),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}
