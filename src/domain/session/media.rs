//! Media bridge port

use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::StreamHandle;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Port to local capture and remote stream playback.
///
/// The session manager holds lifecycle authority over the handles; the
/// bridge only produces and consumes them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaPort: Send + Sync {
    /// Acquire the local audio stream.
    ///
    /// Fails with `MediaAcquisitionFailed` when permission is denied or
    /// no capture device exists.
    async fn acquire_local_stream(&self) -> Result<StreamHandle>;

    /// Route the remote stream to local playback
    async fn attach_remote(&self, stream: &StreamHandle) -> Result<()>;

    /// Release the local capture stream
    async fn release_local(&self);
}
