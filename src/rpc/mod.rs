//! JSON-RPC 2.0 client for the aria2 daemon.
//!
//! Requests go over HTTP with `reqwest`; notifications arrive on a separate
//! WebSocket connection (see [`websocket`]).

pub mod websocket;

use std::path::Path;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::{Aria2Api, NotificationStream};
use crate::config::ConnectionConfig;
use crate::download::{Download, DownloadStatus, StatusRecord};
use crate::error::{Error, Result};
use crate::gid::Gid;

pub use websocket::WebSocketNotifications;

/// Maximum number of waiting/stopped downloads fetched in one listing.
const LIST_LIMIT: u64 = 1000;

const RESULT_RETRIES: usize = 1;
const RESULT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Every method the daemon exposes, as sent on the wire.
pub const KNOWN_METHODS: &[&str] = &[
    "aria2.addUri",
    "aria2.addTorrent",
    "aria2.addMetalink",
    "aria2.remove",
    "aria2.pause",
    "aria2.forcePause",
    "aria2.pauseAll",
    "aria2.forcePauseAll",
    "aria2.unpause",
    "aria2.unpauseAll",
    "aria2.forceRemove",
    "aria2.changePosition",
    "aria2.tellStatus",
    "aria2.getUris",
    "aria2.getFiles",
    "aria2.getPeers",
    "aria2.getServers",
    "aria2.tellActive",
    "aria2.tellWaiting",
    "aria2.tellStopped",
    "aria2.getOption",
    "aria2.changeUri",
    "aria2.changeOption",
    "aria2.getGlobalOption",
    "aria2.changeGlobalOption",
    "aria2.purgeDownloadResult",
    "aria2.removeDownloadResult",
    "aria2.getVersion",
    "aria2.getSessionInfo",
    "aria2.shutdown",
    "aria2.forceShutdown",
    "aria2.getGlobalStat",
    "aria2.saveSession",
    "system.multicall",
    "system.listMethods",
    "system.listNotifications",
];

/// Resolves a user-typed method name to its wire name.
///
/// Matching ignores case and accepts names with or without the
/// `aria2.`/`system.` prefix, so `tellstatus` finds `aria2.tellStatus`.
#[must_use]
pub fn resolve_method(name: &str) -> Option<&'static str> {
    let wanted = name.to_ascii_lowercase();
    KNOWN_METHODS.iter().copied().find(|full| {
        let lower = full.to_ascii_lowercase();
        lower == wanted || lower.split_once('.').is_some_and(|(_, short)| short == wanted)
    })
}

static NOT_FOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"is not found|not found for GID|No such download").expect("pattern is valid")
});
static STATE_CONFLICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cannot be (?:un)?paused now|cannot be removed now").expect("pattern is valid")
});
static INVALID_GID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Invalid GID").expect("pattern is valid"));

/// Maps a daemon error about `gid` onto the crate's error taxonomy.
fn classify(gid: &Gid, code: i64, message: String) -> Error {
    if NOT_FOUND.is_match(&message) {
        Error::NotFound {
            gid: gid.to_string(),
        }
    } else if STATE_CONFLICT.is_match(&message) {
        Error::StateConflict {
            gid: gid.to_string(),
            message,
        }
    } else if INVALID_GID.is_match(&message) {
        Error::InvalidArgument(message)
    } else {
        Error::Rpc { code, message }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC client for one daemon.
///
/// Cloning the inner `reqwest::Client` is cheap and it is safe to use from
/// many tasks at once, so request calls never contend with the listener.
#[derive(Debug)]
pub struct Aria2Client {
    http: reqwest::Client,
    endpoint: String,
    ws_endpoint: String,
    secret: Option<String>,
    request_id: AtomicU64,
}

impl Aria2Client {
    /// Creates a client for the daemon described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(60))
            .build()?;
        let endpoint = config.endpoint();
        let ws_endpoint = config.ws_endpoint();
        log::debug!("Using daemon endpoint {endpoint}");
        Ok(Self {
            http,
            endpoint,
            ws_endpoint,
            secret: (!config.secret.is_empty()).then(|| config.secret.clone()),
            request_id: AtomicU64::new(1),
        })
    }

    /// Returns the HTTP endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Calls `method` with `params`, prepending the secret token if configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rpc`] when the daemon answers with an error, or a
    /// transport error when it cannot be reached.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let params = match (&self.secret, method.starts_with("system.")) {
            (Some(secret), false) => std::iter::once(json!(format!("token:{secret}")))
                .chain(params)
                .collect(),
            _ => params,
        };
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        log::debug!("-> {method} (id {})", request.id);

        let response = self.http.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        let parsed: JsonRpcResponse = serde_json::from_slice(&body).map_err(|e| {
            Error::Transport(format!("unexpected response from daemon ({status}): {e}"))
        })?;

        match (parsed.result, parsed.error) {
            (_, Some(error)) => Err(Error::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }

    /// Calls a method whose first argument is `gid`, classifying daemon errors.
    async fn call_for_gid(&self, method: &str, gid: &Gid) -> Result<Value> {
        self.call(method, vec![json!(gid.as_str())])
            .await
            .map_err(|e| match e {
                Error::Rpc { code, message } => classify(gid, code, message),
                other => other,
            })
    }

    async fn tell_list(&self, method: &str, params: Vec<Value>) -> Result<Vec<Download>> {
        let value = self.call(method, params).await?;
        let records: Vec<StatusRecord> = serde_json::from_value(value)?;
        Ok(records.into_iter().map(Download::from).collect())
    }

    /// Drops the result a removal leaves behind.
    ///
    /// An active download takes a moment to reach the stopped list, so one
    /// retry is made. A result that still lingers is left for `purge`.
    async fn clear_result(&self, gid: &Gid) {
        for attempt in 0..=RESULT_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(RESULT_RETRY_DELAY).await;
            }
            match self.call_for_gid("aria2.removeDownloadResult", gid).await {
                Ok(_) => return,
                Err(e) => log::debug!("Cannot clear result of GID {gid} yet: {e}"),
            }
        }
    }

    /// Adds a download from one or more URIs pointing to the same resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon rejects the URIs.
    pub async fn add_uris(&self, uris: &[String]) -> Result<Gid> {
        let value = self.call("aria2.addUri", vec![json!(uris)]).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Adds a download from a `.torrent` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the daemon rejects it.
    pub async fn add_torrent(&self, path: &Path) -> Result<Gid> {
        let content = tokio::fs::read(path).await?;
        let value = self
            .call("aria2.addTorrent", vec![json!(BASE64.encode(content))])
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Adds the downloads described by a metalink file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the daemon rejects it.
    pub async fn add_metalink(&self, path: &Path) -> Result<Vec<Gid>> {
        let content = tokio::fs::read(path).await?;
        let value = self
            .call("aria2.addMetalink", vec![json!(BASE64.encode(content))])
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Removes every completed, failed, or removed download result.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    pub async fn purge(&self) -> Result<()> {
        self.call("aria2.purgeDownloadResult", Vec::new()).await?;
        Ok(())
    }
}

#[async_trait]
impl Aria2Api for Aria2Client {
    async fn get_download(&self, gid: &Gid) -> Result<Download> {
        let value = self.call_for_gid("aria2.tellStatus", gid).await?;
        let record: StatusRecord = serde_json::from_value(value)?;
        Ok(record.into())
    }

    async fn get_downloads(&self) -> Result<Vec<Download>> {
        let mut downloads = self.tell_list("aria2.tellActive", Vec::new()).await?;
        downloads.extend(
            self.tell_list("aria2.tellWaiting", vec![json!(0), json!(LIST_LIMIT)])
                .await?,
        );
        downloads.extend(
            self.tell_list("aria2.tellStopped", vec![json!(0), json!(LIST_LIMIT)])
                .await?,
        );
        Ok(downloads)
    }

    async fn pause(&self, download: &Download, force: bool) -> Result<()> {
        let method = if force { "aria2.forcePause" } else { "aria2.pause" };
        self.call_for_gid(method, &download.gid).await?;
        Ok(())
    }

    async fn resume(&self, download: &Download) -> Result<()> {
        self.call_for_gid("aria2.unpause", &download.gid).await?;
        Ok(())
    }

    async fn remove(&self, download: &Download, force: bool) -> Result<()> {
        let gid = &download.gid;
        match download.status {
            // aria2 keeps the result of a removed download; it is already gone.
            DownloadStatus::Removed => {
                return Err(Error::NotFound {
                    gid: gid.to_string(),
                });
            }
            DownloadStatus::Complete | DownloadStatus::Error => {
                self.call_for_gid("aria2.removeDownloadResult", gid).await?;
                return Ok(());
            }
            DownloadStatus::Active | DownloadStatus::Waiting | DownloadStatus::Paused => {}
        }

        let method = if force { "aria2.forceRemove" } else { "aria2.remove" };
        self.call_for_gid(method, gid).await?;
        self.clear_result(gid).await;
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn NotificationStream>> {
        let stream = WebSocketNotifications::connect(&self.ws_endpoint).await?;
        Ok(Box::new(stream))
    }
}
