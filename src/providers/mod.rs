/*!
 * Comment sources.
 *
 * A comment source supplies the full danmaku list for one video:
 * - Gamer: the Bahamut anime danmu API
 * - Static: comments held in memory or read from a saved API response
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::danmaku::Comment;
use crate::errors::FetchError;

/// Common trait for all comment sources
///
/// The conversion engine never calls a source itself; the controller fetches
/// the complete list first and hands it over.
#[async_trait]
pub trait CommentSource: Send + Sync + Debug {
    /// Fetch every comment of a video
    ///
    /// # Arguments
    /// * `video_sn` - Numeric video serial, already resolved from any URL
    ///
    /// # Returns
    /// * `Result<Vec<Comment>, FetchError>` - Comments in source order, or an error
    async fn fetch(&self, video_sn: &str) -> Result<Vec<Comment>, FetchError>;

    /// Short name used in log messages
    fn name(&self) -> &str;
}

pub mod gamer;
pub mod static_source;

pub use gamer::GamerDanmuSource;
pub use static_source::StaticSource;
