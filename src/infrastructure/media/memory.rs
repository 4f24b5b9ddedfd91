//! In-process media bridge
//!
//! Mints stream handles without touching any capture device. Used by the
//! demo binary and the integration tests; a real deployment would back
//! this with the platform's audio capture API.

use crate::domain::session::media::MediaPort;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::StreamHandle;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct BridgeState {
    local: Option<StreamHandle>,
    remote: Option<StreamHandle>,
    attach_count: usize,
    /// When set, acquisition fails with this message
    denial: Option<String>,
}

/// In-memory media bridge
#[derive(Default)]
pub struct MemoryMediaBridge {
    state: Mutex<BridgeState>,
}

impl MemoryMediaBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bridge whose acquisition fails, for exercising the
    /// permission-denied / no-device paths
    pub fn denying(message: &str) -> Self {
        let bridge = Self::default();
        bridge.lock().denial = Some(message.to_string());
        bridge
    }

    /// Clear a denial, as when the user grants the permission prompt on
    /// a later attempt
    pub fn grant(&self) {
        self.lock().denial = None;
    }

    pub fn local(&self) -> Option<StreamHandle> {
        self.lock().local
    }

    pub fn remote(&self) -> Option<StreamHandle> {
        self.lock().remote
    }

    /// How many times a remote stream was attached
    pub fn attach_count(&self) -> usize {
        self.lock().attach_count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MediaPort for MemoryMediaBridge {
    async fn acquire_local_stream(&self) -> Result<StreamHandle> {
        let mut state = self.lock();
        if let Some(message) = &state.denial {
            return Err(DomainError::MediaAcquisitionFailed(message.clone()));
        }

        let handle = *state.local.get_or_insert_with(StreamHandle::new);
        debug!(stream = %handle, "local stream acquired");
        Ok(handle)
    }

    async fn attach_remote(&self, stream: &StreamHandle) -> Result<()> {
        let mut state = self.lock();
        state.remote = Some(*stream);
        state.attach_count += 1;
        debug!(stream = %stream, "remote stream attached");
        Ok(())
    }

    async fn release_local(&self) {
        let mut state = self.lock();
        state.local = None;
        state.remote = None;
        debug!("local stream released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_is_idempotent() {
        let bridge = MemoryMediaBridge::new();
        let first = bridge.acquire_local_stream().await.unwrap();
        let second = bridge.acquire_local_stream().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_denying_bridge_fails_acquisition() {
        let bridge = MemoryMediaBridge::denying("permission denied");
        let result = bridge.acquire_local_stream().await;
        assert!(matches!(
            result,
            Err(DomainError::MediaAcquisitionFailed(_))
        ));
        assert!(bridge.local().is_none());
    }

    #[tokio::test]
    async fn test_grant_lifts_denial() {
        let bridge = MemoryMediaBridge::denying("permission denied");
        assert!(bridge.acquire_local_stream().await.is_err());

        bridge.grant();
        let handle = bridge.acquire_local_stream().await.unwrap();
        assert_eq!(bridge.local(), Some(handle));
    }

    #[tokio::test]
    async fn test_attach_and_release() {
        let bridge = MemoryMediaBridge::new();
        bridge.acquire_local_stream().await.unwrap();

        let remote = StreamHandle::new();
        bridge.attach_remote(&remote).await.unwrap();
        assert_eq!(bridge.remote(), Some(remote));
        assert_eq!(bridge.attach_count(), 1);

        bridge.release_local().await;
        assert!(bridge.local().is_none());
        assert!(bridge.remote().is_none());
    }
}
