// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Point-in-time snapshots of the connection tracking table.

use std::path::{Path, PathBuf};

use procfs::{Current, FromRead, ProcError};
use tracing::{debug, error};

use crate::filter::Flows;

/// Where the kernel exposes the legacy connection tracking table.
pub const LEGACY_TABLE_PATH: &str = "/proc/net/ip_conntrack";

/// Errors which might occur when taking a snapshot of the table
#[derive(Debug, thiserror::Error)]
pub enum ConntrackError {
    /// The table could not be read. No flow is returned in this case.
    #[error("failed to read connection tracking table {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: ProcError,
    },
}

impl Current for Flows {
    const PATH: &'static str = LEGACY_TABLE_PATH;
}

/// A source of connection tracking table snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConntrackTable {
    path: PathBuf,
}

impl Default for ConntrackTable {
    fn default() -> Self {
        Self::new(LEGACY_TABLE_PATH)
    }
}

impl ConntrackTable {
    /// Read snapshots from the table at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole table.
    ///
    /// The table is read once, fully, and every call returns a fresh, independent collection.
    ///
    /// # Errors
    ///
    /// [`ConntrackError::Read`] if the table cannot be read (missing, permission denied, ...).
    pub fn snapshot(&self) -> Result<Flows, ConntrackError> {
        match Flows::from_file(&self.path) {
            Ok(flows) => {
                debug!("read {} flows from {}", flows.len(), self.path.display());
                Ok(flows)
            }
            Err(source) => {
                error!("failed to read {}: {source}", self.path.display());
                Err(ConntrackError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }
}

/// Take a snapshot of the legacy table at [`LEGACY_TABLE_PATH`].
///
/// # Errors
///
/// [`ConntrackError::Read`] if the table cannot be read.
pub fn snapshot() -> Result<Flows, ConntrackError> {
    ConntrackTable::default().snapshot()
}
