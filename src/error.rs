//! Error types for the ariactl library.

use thiserror::Error;

/// Errors that can occur while talking to the aria2 daemon.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or ambiguous input, such as a bad GID or selector.
    #[error("{0}")]
    InvalidArgument(String),

    /// The daemon has no download with this GID.
    #[error("GID {gid} is not found")]
    NotFound {
        /// GID that could not be resolved.
        gid: String,
    },

    /// The operation is not valid for the download's current state.
    #[error("{message}")]
    StateConflict {
        /// GID of the download.
        gid: String,
        /// Message reported by the daemon.
        message: String,
    },

    /// The daemon answered with an error we do not classify further.
    #[error("{message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The daemon is unreachable or the channel closed unexpectedly.
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error on the notification channel.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A user callback failed while handling an event.
    #[error("Callback {handler} failed: {message}")]
    Handler {
        /// Name of the handler, e.g. `on_download_start`.
        handler: String,
        /// Failure description.
        message: String,
    },

    /// Configuration file could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error means the daemon connection itself failed.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http(_) | Self::WebSocket(_))
    }
}

/// A specialized `Result` type for ariactl operations.
pub type Result<T> = std::result::Result<T, Error>;
