//! Download identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of hex characters in a GID.
pub const GID_LEN: usize = 16;

/// Identifier the daemon assigns to a download (16 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gid(String);

impl Gid {
    /// Parses and validates a GID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `s` is not 16 hex characters.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() == GID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(Error::InvalidArgument(format!("Invalid GID {s}")))
        }
    }

    /// Parses a list of GIDs, failing on the first malformed one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for the first malformed entry.
    pub fn parse_all<S: AsRef<str>>(items: &[S]) -> Result<Vec<Self>> {
        items.iter().map(|s| Self::parse(s.as_ref())).collect()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Gid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Gid {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Gid> for String {
    fn from(gid: Gid) -> Self {
        gid.0
    }
}

impl AsRef<str> for Gid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
