//! Typed lifecycle events and the mapping from raw daemon notifications.

use std::fmt;
use std::str::FromStr;

use crate::api::RawNotification;
use crate::error::Error;
use crate::gid::Gid;

/// Kind of lifecycle transition reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Started,
    Paused,
    Stopped,
    Completed,
    BitTorrentComplete,
    Error,
}

impl EventKind {
    /// All kinds, in the daemon's documentation order.
    pub const ALL: [Self; 6] = [
        Self::Started,
        Self::Paused,
        Self::Stopped,
        Self::Completed,
        Self::Error,
        Self::BitTorrentComplete,
    ];

    /// JSON-RPC notification method carrying this event.
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::Started => "aria2.onDownloadStart",
            Self::Paused => "aria2.onDownloadPause",
            Self::Stopped => "aria2.onDownloadStop",
            Self::Completed => "aria2.onDownloadComplete",
            Self::BitTorrentComplete => "aria2.onBtDownloadComplete",
            Self::Error => "aria2.onDownloadError",
        }
    }

    /// Short name used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Started => "start",
            Self::Paused => "pause",
            Self::Stopped => "stop",
            Self::Completed => "complete",
            Self::BitTorrentComplete => "btcomplete",
            Self::Error => "error",
        }
    }

    /// Name of the callback that handles this event.
    #[must_use]
    pub const fn handler_name(self) -> &'static str {
        match self {
            Self::Started => "on_download_start",
            Self::Paused => "on_download_pause",
            Self::Stopped => "on_download_stop",
            Self::Completed => "on_download_complete",
            Self::BitTorrentComplete => "on_bt_download_complete",
            Self::Error => "on_download_error",
        }
    }

    #[must_use]
    pub fn from_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.method() == method)
    }

    #[must_use]
    pub fn from_handler_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.handler_name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                let valid: Vec<_> = Self::ALL.iter().map(|k| k.name()).collect();
                Error::InvalidArgument(format!(
                    "Unknown event type {s} (expected one of: {})",
                    valid.join(", ")
                ))
            })
    }
}

/// A lifecycle event bound to one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    /// Download the notification is about.
    pub gid: Gid,
}

/// Maps a raw notification to a typed event.
///
/// Unknown methods are dropped silently so newer daemons can add event types.
#[must_use]
pub fn map_notification(raw: &RawNotification) -> Option<LifecycleEvent> {
    let kind = EventKind::from_method(&raw.method)?;
    match Gid::parse(&raw.gid) {
        Ok(gid) => Some(LifecycleEvent { kind, gid }),
        Err(_) => {
            log::warn!("Dropping {} notification with malformed GID {:?}", kind, raw.gid);
            None
        }
    }
}
