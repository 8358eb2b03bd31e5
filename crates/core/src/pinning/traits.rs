//! Remote pinning endpoint trait.

use async_trait::async_trait;

use super::{PinError, PinUpload, PinnedFile};

/// A remote API that pins a batch of files in one call.
///
/// Implementations return one [`PinnedFile`] per file the remote accepted.
/// Files missing from the result are treated as not pinned yet.
#[async_trait]
pub trait PinEndpoint: Send + Sync {
    /// Endpoint name for logging.
    fn name(&self) -> &str;

    /// Upload and pin a batch of files.
    async fn add_batch(&self, files: &[PinUpload]) -> Result<Vec<PinnedFile>, PinError>;
}
