// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for the store's in-memory state (grounded on the teacher's
//! WAL/snapshot pattern). Periodic full snapshots to `database.path`, loaded at startup; no
//! WAL replay since the store is an in-memory materialization rebuilt wholesale from the last
//! snapshot (schema evolution/durability internals beyond this contract are out of scope).

use crate::state::MaterializedState;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot version {found} is newer than the supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "v")]
    pub version: u32,
    pub state: MaterializedState,
    pub created_at_ms: u64,
}

impl Snapshot {
    pub fn new(state: MaterializedState, created_at_ms: u64) -> Self {
        Self { version: CURRENT_SNAPSHOT_VERSION, state, created_at_ms }
    }

    /// Write atomically: serialize to a temp file in the same directory,
    /// then rename over the target. Avoids a torn snapshot on crash
    /// mid-write.
    pub async fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec_pretty(self)?;
        let tmp_path = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    pub async fn read_from(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = tokio::fs::read(path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version > CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                supported: CURRENT_SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }

    /// Loads a snapshot if `path` exists; returns fresh state otherwise
    /// (first boot against an empty `database.path`).
    pub async fn load_or_default(path: &Path) -> Result<MaterializedState, SnapshotError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(MaterializedState::default());
        }
        Ok(Self::read_from(path).await?.state)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
