//! Bulk operations over sets of downloads.
//!
//! A batch resolves its targets ([`resolve`]), applies one [`Operation`] to
//! each GID in order with [`BatchExecutor`], and hands the resulting
//! [`BatchReport`] to [`report::write_report`], which prints one line per
//! failure and picks the exit code.
//!
//! Per-item failures (unknown GID, wrong state) never stop the batch; only a
//! transport failure does, and the outcomes gathered before it are kept.

pub mod report;
pub mod resolve;

pub use report::{EXIT_FAILURE, EXIT_SUCCESS, EXIT_TRANSPORT, write_report};
pub use resolve::{Selection, resolve};

use crate::api::Aria2Api;
use crate::download::DownloadStatus;
use crate::error::{Error, Result};
use crate::gid::Gid;

/// A single-download operation applied across a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Pause an active or waiting download; `force` skips tracker contact.
    Pause { force: bool },
    /// Resume a paused download.
    Resume,
    /// Remove a download; `force` skips tracker contact.
    Remove { force: bool },
}

impl Operation {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pause { .. } => "pause",
            Self::Resume => "resume",
            Self::Remove { .. } => "remove",
        }
    }

    /// Whether a download in `status` is selected by `--all` for this operation.
    #[must_use]
    pub const fn selects(self, status: DownloadStatus) -> bool {
        match self {
            Self::Pause { .. } => status.is_pausable(),
            Self::Resume => status.is_resumable(),
            Self::Remove { .. } => !matches!(status, DownloadStatus::Removed),
        }
    }

    async fn apply<A: Aria2Api + ?Sized>(self, api: &A, gid: &Gid) -> Result<()> {
        let download = api.get_download(gid).await?;
        match self {
            Self::Pause { force } => api.pause(&download, force).await,
            Self::Resume => api.resume(&download).await,
            Self::Remove { force } => api.remove(&download, force).await,
        }
    }
}

/// Why an operation failed on one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The daemon does not know the GID.
    NotFound,
    /// The download is not in a state the operation accepts.
    StateConflict,
    /// The daemon rejected the GID itself.
    InvalidGid,
    /// Any other daemon error, with its message.
    Daemon(String),
}

impl From<Error> for FailureReason {
    fn from(error: Error) -> Self {
        match error {
            Error::NotFound { .. } => Self::NotFound,
            Error::StateConflict { .. } => Self::StateConflict,
            Error::InvalidArgument(_) => Self::InvalidGid,
            Error::Rpc { message, .. } => Self::Daemon(message),
            other => Self::Daemon(other.to_string()),
        }
    }
}

/// Result of an operation on one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The daemon accepted the operation.
    Success,
    /// The operation failed for this download only.
    Failure(FailureReason),
}

/// Outcome paired with the GID it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Download the operation targeted.
    pub gid: Gid,
    /// What happened to it.
    pub outcome: Outcome,
}

impl ItemOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }

    /// Diagnostic line for a failed item; `None` on success.
    ///
    /// The `GID#` / `GID ` difference is the daemon's own wording and
    /// scripts match on it.
    #[must_use]
    pub fn failure_message(&self, operation: Operation) -> Option<String> {
        let Outcome::Failure(reason) = &self.outcome else {
            return None;
        };
        let gid = &self.gid;
        Some(match (reason, operation) {
            (FailureReason::NotFound, _) => format!("GID {gid} is not found"),
            (FailureReason::StateConflict, Operation::Pause { .. }) => {
                format!("GID#{gid} cannot be paused now")
            }
            (FailureReason::StateConflict, Operation::Resume) => {
                format!("GID#{gid} cannot be unpaused now")
            }
            (FailureReason::StateConflict, Operation::Remove { .. }) => {
                format!("GID#{gid} cannot be removed now")
            }
            (FailureReason::InvalidGid, _) => format!("Invalid GID {gid}"),
            (FailureReason::Daemon(message), _) => message.clone(),
        })
    }
}

/// Everything a batch produced.
#[derive(Debug)]
pub struct BatchReport {
    /// Operation the batch applied.
    pub operation: Operation,
    /// One entry per attempted GID, in processing order.
    pub outcomes: Vec<ItemOutcome>,
    /// Set when a transport failure stopped the batch early.
    pub aborted: Option<Error>,
}

impl BatchReport {
    /// True when no item failed and the batch ran to the end.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.aborted.is_none() && self.outcomes.iter().all(ItemOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Applies one operation to many downloads, one at a time.
pub struct BatchExecutor<'a, A: Aria2Api + ?Sized> {
    api: &'a A,
}

impl<'a, A: Aria2Api + ?Sized> BatchExecutor<'a, A> {
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Applies `operation` to every GID in order, making exactly one attempt each.
    pub async fn execute(&self, gids: &[Gid], operation: Operation) -> BatchReport {
        let mut outcomes = Vec::with_capacity(gids.len());

        for gid in gids {
            let outcome = match operation.apply(self.api, gid).await {
                Ok(()) => Outcome::Success,
                Err(e) if e.is_transport() => {
                    log::error!(
                        "{} aborted at GID {gid} after {} item(s): {e}",
                        operation.name(),
                        outcomes.len()
                    );
                    return BatchReport {
                        operation,
                        outcomes,
                        aborted: Some(e),
                    };
                }
                Err(e) => {
                    log::debug!("{} failed for GID {gid}: {e}", operation.name());
                    Outcome::Failure(e.into())
                }
            };
            outcomes.push(ItemOutcome {
                gid: gid.clone(),
                outcome,
            });
        }

        BatchReport {
            operation,
            outcomes,
            aborted: None,
        }
    }
}
