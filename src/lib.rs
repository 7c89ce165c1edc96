//! ariactl - A library for driving the aria2 download daemon over JSON-RPC.
//!
//! Batch commands apply one operation to many downloads, isolating each
//! item's failure, and listen mode turns daemon notifications into typed
//! events dispatched to user callbacks.
//!
//! # Example
//!
//! ```no_run
//! use ariactl::batch::{BatchExecutor, Operation, write_report};
//! use ariactl::{Aria2Client, ConnectionConfig, Gid};
//!
//! # async fn example() -> ariactl::Result<()> {
//! let client = Aria2Client::new(&ConnectionConfig::default().with_secret("s3cret"))?;
//!
//! let gids = Gid::parse_all(&["2089b05ecca3d829", "cca3d8292089b05e"])?;
//! let report = BatchExecutor::new(&client)
//!     .execute(&gids, Operation::Pause { force: false })
//!     .await;
//!
//! let code = write_report(&report, &mut std::io::stderr())?;
//! println!("exit code {code}");
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod api;
pub mod batch;
pub mod callbacks;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod format;
pub mod gid;
pub mod listener;
#[cfg(test)]
mod mock;
pub mod rpc;

// Re-export main types for convenience
pub use api::{Aria2Api, NotificationStream, RawNotification};
pub use batch::{BatchExecutor, BatchReport, Operation};
pub use callbacks::{Callback, CallbackLoader, CallbackRegistry, FnCallback, HandlerSet, HookFileLoader};
pub use config::{AppConfig, ConnectionConfig};
pub use download::{Download, DownloadStatus};
pub use error::{Error, Result};
pub use events::{EventKind, LifecycleEvent};
pub use format::{format_bytes, format_duration};
pub use gid::Gid;
pub use listener::{ListenStats, Listener, ListenerHandle, ListenerState};
pub use rpc::Aria2Client;
