//! In-memory daemon used by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::api::{Aria2Api, NotificationStream, RawNotification};
use crate::download::{Download, DownloadStatus};
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::gid::Gid;

type NotificationSender = mpsc::UnboundedSender<Result<RawNotification>>;
type NotificationReceiver = mpsc::UnboundedReceiver<Result<RawNotification>>;

/// A fake daemon holding downloads in memory and emitting notifications
/// the way aria2 does for pause/resume/remove.
pub struct MockDaemon {
    downloads: Mutex<Vec<Download>>,
    calls: Mutex<Vec<String>>,
    unreachable_at: Mutex<Option<Gid>>,
    tx: Mutex<Option<NotificationSender>>,
    rx: Mutex<Option<NotificationReceiver>>,
}

pub fn gid(s: &str) -> Gid {
    Gid::parse(s).unwrap()
}

impl MockDaemon {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            downloads: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            unreachable_at: Mutex::new(None),
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Adds a download with the given status.
    pub fn with(self, id: &str, status: DownloadStatus) -> Self {
        self.downloads
            .lock()
            .unwrap()
            .push(Download::new(gid(id), status, format!("file-{id}")));
        self
    }

    /// Makes every request about `id` fail as if the daemon went away.
    pub fn unreachable_at(&self, id: &str) {
        *self.unreachable_at.lock().unwrap() = Some(gid(id));
    }

    pub fn status(&self, id: &str) -> Option<DownloadStatus> {
        let wanted = gid(id);
        self.downloads
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.gid == wanted)
            .map(|d| d.status)
    }

    /// Mutating calls received so far, as `"<op> <gid>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Pushes a raw notification to subscribers.
    pub fn notify(&self, method: &str, id: &str) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(RawNotification::new(method, id)));
        }
    }

    /// Pushes a transport failure to subscribers.
    pub fn fail_channel(&self, message: &str) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            let _ = tx.send(Err(Error::Transport(message.to_string())));
        }
    }

    /// Closes the notification channel from the daemon side.
    pub fn close_channel(&self) {
        self.tx.lock().unwrap().take();
    }

    fn check_reachable(&self, gid: &Gid) -> Result<()> {
        if self.unreachable_at.lock().unwrap().as_ref() == Some(gid) {
            return Err(Error::Transport("connection refused".into()));
        }
        Ok(())
    }

    fn record(&self, op: &str, gid: &Gid) {
        self.calls.lock().unwrap().push(format!("{op} {gid}"));
    }

    fn transition(
        &self,
        gid: &Gid,
        allowed: fn(DownloadStatus) -> bool,
        message: &str,
        next: DownloadStatus,
    ) -> Result<()> {
        let mut downloads = self.downloads.lock().unwrap();
        let download = downloads
            .iter_mut()
            .find(|d| &d.gid == gid)
            .ok_or_else(|| Error::NotFound {
                gid: gid.to_string(),
            })?;
        if !allowed(download.status) {
            return Err(Error::StateConflict {
                gid: gid.to_string(),
                message: format!("GID#{gid} {message}"),
            });
        }
        download.status = next;
        Ok(())
    }
}

#[async_trait]
impl Aria2Api for MockDaemon {
    async fn get_download(&self, gid: &Gid) -> Result<Download> {
        self.check_reachable(gid)?;
        self.downloads
            .lock()
            .unwrap()
            .iter()
            .find(|d| &d.gid == gid)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                gid: gid.to_string(),
            })
    }

    async fn get_downloads(&self) -> Result<Vec<Download>> {
        Ok(self.downloads.lock().unwrap().clone())
    }

    async fn pause(&self, download: &Download, _force: bool) -> Result<()> {
        self.record("pause", &download.gid);
        self.transition(
            &download.gid,
            DownloadStatus::is_pausable,
            "cannot be paused now",
            DownloadStatus::Paused,
        )?;
        self.notify(EventKind::Paused.method(), download.gid.as_str());
        Ok(())
    }

    async fn resume(&self, download: &Download) -> Result<()> {
        self.record("resume", &download.gid);
        self.transition(
            &download.gid,
            DownloadStatus::is_resumable,
            "cannot be unpaused now",
            DownloadStatus::Active,
        )?;
        self.notify(EventKind::Started.method(), download.gid.as_str());
        Ok(())
    }

    async fn remove(&self, download: &Download, _force: bool) -> Result<()> {
        self.record("remove", &download.gid);
        // Like aria2, a removed download stays listed with status `removed`.
        self.transition(
            &download.gid,
            |status| status != DownloadStatus::Removed,
            "cannot be removed now",
            DownloadStatus::Removed,
        )
        .map_err(|_| Error::NotFound {
            gid: download.gid.to_string(),
        })?;
        self.notify(EventKind::Stopped.method(), download.gid.as_str());
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn NotificationStream>> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::Transport("notification stream already taken".into()))?;
        Ok(Box::new(MockStream { rx }))
    }
}

struct MockStream {
    rx: NotificationReceiver,
}

#[async_trait]
impl NotificationStream for MockStream {
    async fn next_notification(&mut self) -> Option<Result<RawNotification>> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}
