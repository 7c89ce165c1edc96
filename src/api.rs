//! Daemon API abstraction.
//!
//! Batch commands and the listener only talk to the daemon through
//! [`Aria2Api`], so they can run against the JSON-RPC client or an
//! in-memory daemon in tests.

use async_trait::async_trait;

use crate::download::Download;
use crate::error::Result;
use crate::gid::Gid;

/// A notification as received from the daemon, before mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    /// JSON-RPC method, e.g. `aria2.onDownloadStart`.
    pub method: String,
    /// GID carried in the first parameter.
    pub gid: String,
}

impl RawNotification {
    #[must_use]
    pub fn new(method: impl Into<String>, gid: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            gid: gid.into(),
        }
    }
}

/// A subscription to the daemon's notification stream.
///
/// Only one task reads from a stream at a time.
#[async_trait]
pub trait NotificationStream: Send {
    /// Waits for the next notification.
    ///
    /// Returns `None` once the daemon closes the channel.
    async fn next_notification(&mut self) -> Option<Result<RawNotification>>;

    /// Closes the channel. Calling it more than once is harmless.
    async fn close(&mut self);
}

/// Per-download operations and subscription offered by the daemon.
#[async_trait]
pub trait Aria2Api: Send + Sync {
    /// Fetches one download.
    ///
    /// Fails with [`crate::Error::NotFound`] if the daemon does not know `gid`.
    async fn get_download(&self, gid: &Gid) -> Result<Download>;

    /// Fetches every download: active, then waiting, then stopped.
    async fn get_downloads(&self) -> Result<Vec<Download>>;

    /// Pauses a download.
    async fn pause(&self, download: &Download, force: bool) -> Result<()>;

    /// Resumes a paused download.
    async fn resume(&self, download: &Download) -> Result<()>;

    /// Removes a download, or its result if it already finished.
    ///
    /// A download already in the `removed` state fails with
    /// [`crate::Error::NotFound`].
    async fn remove(&self, download: &Download, force: bool) -> Result<()>;

    /// Opens the notification channel.
    async fn subscribe(&self) -> Result<Box<dyn NotificationStream>>;
}
