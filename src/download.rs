//! Download handles and their cached status.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gid::Gid;

/// Status of a download as reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Active,
    Waiting,
    Paused,
    Error,
    Complete,
    Removed,
}

impl DownloadStatus {
    /// Returns true if the download can still be paused.
    #[must_use]
    pub const fn is_pausable(self) -> bool {
        matches!(self, Self::Active | Self::Waiting)
    }

    /// Returns true if the download is paused and can be resumed.
    #[must_use]
    pub const fn is_resumable(self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Returns true if the download has stopped for good and only a result remains.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Error | Self::Complete | Self::Removed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Paused => "paused",
            Self::Error => "error",
            Self::Complete => "complete",
            Self::Removed => "removed",
        }
    }
}

/// A download known to the daemon, with status fields cached at fetch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub gid: Gid,
    pub status: DownloadStatus,
    pub name: String,
    pub total_length: u64,
    pub completed_length: u64,
    pub download_speed: u64,
    pub upload_speed: u64,
    pub error_message: Option<String>,
}

impl Download {
    /// Creates a bare download with only a GID, status, and name.
    #[must_use]
    pub fn new(gid: Gid, status: DownloadStatus, name: impl Into<String>) -> Self {
        Self {
            gid,
            status,
            name: name.into(),
            total_length: 0,
            completed_length: 0,
            download_speed: 0,
            upload_speed: 0,
            error_message: None,
        }
    }

    /// Completion percentage in `0.0..=100.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.total_length == 0 {
            return 0.0;
        }
        self.completed_length as f64 / self.total_length as f64 * 100.0
    }

    /// Estimated time remaining at the current download speed.
    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        if self.download_speed == 0 || self.completed_length >= self.total_length {
            return None;
        }
        let remaining = self.total_length - self.completed_length;
        Some(Duration::from_secs(remaining / self.download_speed))
    }
}

/// Raw `aria2.tellStatus` structure. Numbers arrive as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusRecord {
    gid: Gid,
    status: DownloadStatus,
    #[serde(default)]
    total_length: String,
    #[serde(default)]
    completed_length: String,
    #[serde(default)]
    download_speed: String,
    #[serde(default)]
    upload_speed: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    files: Vec<FileRecord>,
    #[serde(default)]
    bittorrent: Option<BitTorrentRecord>,
}

#[derive(Debug, Deserialize)]
struct FileRecord {
    #[serde(default)]
    path: String,
    #[serde(default)]
    uris: Vec<UriRecord>,
}

#[derive(Debug, Deserialize)]
struct UriRecord {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct BitTorrentRecord {
    #[serde(default)]
    info: Option<BitTorrentInfo>,
}

#[derive(Debug, Deserialize)]
struct BitTorrentInfo {
    name: String,
}

fn parse_number(s: &str) -> u64 {
    s.parse().unwrap_or(0)
}

impl StatusRecord {
    fn name(&self) -> String {
        if let Some(info) = self.bittorrent.as_ref().and_then(|bt| bt.info.as_ref()) {
            return info.name.clone();
        }
        let Some(first) = self.files.first() else {
            return "-".to_string();
        };
        if !first.path.is_empty() {
            return Path::new(&first.path)
                .file_name()
                .map_or_else(|| first.path.clone(), |n| n.to_string_lossy().into_owned());
        }
        first
            .uris
            .first()
            .map_or_else(|| "-".to_string(), |u| u.uri.clone())
    }
}

impl From<StatusRecord> for Download {
    fn from(record: StatusRecord) -> Self {
        let name = record.name();
        Self {
            total_length: parse_number(&record.total_length),
            completed_length: parse_number(&record.completed_length),
            download_speed: parse_number(&record.download_speed),
            upload_speed: parse_number(&record.upload_speed),
            gid: record.gid,
            status: record.status,
            name,
            error_message: record.error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gid(s: &str) -> Gid {
        Gid::parse(s).unwrap()
    }

    #[test]
    fn status_capabilities() {
        assert!(DownloadStatus::Active.is_pausable());
        assert!(DownloadStatus::Waiting.is_pausable());
        assert!(!DownloadStatus::Paused.is_pausable());
        assert!(DownloadStatus::Paused.is_resumable());
        assert!(!DownloadStatus::Active.is_resumable());
        assert!(DownloadStatus::Complete.is_finished());
        assert!(!DownloadStatus::Waiting.is_finished());
    }

    #[test]
    fn record_from_http_download() {
        let json = r#"{
            "gid": "0000000000000001",
            "status": "active",
            "totalLength": "2000",
            "completedLength": "500",
            "downloadSpeed": "100",
            "uploadSpeed": "0",
            "files": [{"index": "1", "path": "/downloads/debian.iso",
                       "uris": [{"uri": "http://example.com/debian.iso", "status": "used"}]}]
        }"#;
        let record: StatusRecord = serde_json::from_str(json).unwrap();
        let dl = Download::from(record);
        assert_eq!(dl.gid, gid("0000000000000001"));
        assert_eq!(dl.status, DownloadStatus::Active);
        assert_eq!(dl.name, "debian.iso");
        assert_eq!(dl.total_length, 2000);
        assert!((dl.progress() - 25.0).abs() < f64::EPSILON);
        assert_eq!(dl.eta(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn record_prefers_torrent_name() {
        let json = r#"{
            "gid": "0000000000000002",
            "status": "paused",
            "files": [{"path": "/downloads/a/b.iso", "uris": []}],
            "bittorrent": {"info": {"name": "bunsenlabs-helium-4.iso"}}
        }"#;
        let record: StatusRecord = serde_json::from_str(json).unwrap();
        assert_eq!(Download::from(record).name, "bunsenlabs-helium-4.iso");
    }

    #[test]
    fn record_falls_back_to_uri_when_path_unknown() {
        let json = r#"{
            "gid": "0000000000000003",
            "status": "waiting",
            "files": [{"path": "", "uris": [{"uri": "http://example.com/x"}]}]
        }"#;
        let record: StatusRecord = serde_json::from_str(json).unwrap();
        let dl = Download::from(record);
        assert_eq!(dl.name, "http://example.com/x");
        assert_eq!(dl.eta(), None);
        assert!(dl.progress().abs() < f64::EPSILON);
    }
}
