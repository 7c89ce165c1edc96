//! Turns a command-line target into the GIDs a batch operates on.

use crate::api::Aria2Api;
use crate::batch::Operation;
use crate::error::{Error, Result};
use crate::gid::Gid;

/// Which downloads a batch command targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Explicit GIDs, in the order given.
    Gids(Vec<Gid>),
    /// Every download the daemon knows about.
    All,
}

impl Selection {
    /// Builds a selection from raw arguments.
    ///
    /// Exactly one of `gids` (non-empty) and `all` must be given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when both or neither are set, or
    /// when a GID is malformed.
    pub fn from_args<S: AsRef<str>>(gids: &[S], all: bool) -> Result<Self> {
        match (gids.is_empty(), all) {
            (false, true) => Err(Error::InvalidArgument(
                "-a/--all: not allowed with arguments gids".to_string(),
            )),
            (true, false) => Err(Error::InvalidArgument(
                "the following arguments are required: gids or --all".to_string(),
            )),
            (true, true) => Ok(Self::All),
            (false, false) => Gid::parse_all(gids).map(Self::Gids),
        }
    }
}

/// Resolves `selection` to concrete GIDs for `operation`.
///
/// With [`Selection::All`] the daemon's list is used in its own order,
/// keeping only downloads the operation can act on, so pausing everything
/// does not fail on downloads that are already paused.
///
/// # Errors
///
/// Returns an error if the daemon cannot be queried.
pub async fn resolve<A: Aria2Api + ?Sized>(
    api: &A,
    selection: &Selection,
    operation: Operation,
) -> Result<Vec<Gid>> {
    match selection {
        Selection::Gids(gids) => Ok(gids.clone()),
        Selection::All => {
            let downloads = api.get_downloads().await?;
            let total = downloads.len();
            let gids: Vec<Gid> = downloads
                .into_iter()
                .filter(|d| operation.selects(d.status))
                .map(|d| d.gid)
                .collect();
            log::debug!(
                "{} --all selected {} of {total} download(s)",
                operation.name(),
                gids.len()
            );
            Ok(gids)
        }
    }
}
