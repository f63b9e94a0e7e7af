// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence of designs.
//!
//! Everything outside the crate talks to storage through [`PersistenceGateway`]. Two gateways ship
//! with the crate: [`DesignFolder`] writes one envelope file per project, [`MemoryGateway`] keeps
//! designs in memory for tests and embedders.

pub mod design_folder;
pub mod memory;
pub mod validate;

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{IdError, ProjectId, Snapshot};

pub use design_folder::{DesignEnvelope, DesignFolder, WriteDurability, ENVELOPE_VERSION};
pub use memory::MemoryGateway;
pub use validate::{repair_snapshot, validate_snapshot, ValidationIssue, ValidationReport};

/// Options passed to every [`PersistenceGateway::save_design`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SaveOptions {
    /// Extra attempts after a failed write.
    pub retries: u32,
    /// Repair and validate before writing; refuse to write when errors remain.
    pub validate_data: bool,
    pub compress: bool,
    /// Keep the previous file as `<name>.bak`.
    pub backup: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            retries: 2,
            validate_data: true,
            compress: false,
            backup: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("json error{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    Json {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
    #[error("compression error at {path}: {source}")]
    Compression {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("design failed validation: {}", issues.join("; "))]
    Invalid { issues: Vec<String> },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("invalid project id {value:?}: {source}")]
    InvalidProjectId {
        value: String,
        #[source]
        source: IdError,
    },
}

/// Contract between the state core and whatever stores designs.
///
/// `load_design` returns `Ok(None)` both when nothing was saved yet and when the stored document
/// is beyond repair; callers fall back to an empty snapshot in either case.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn save_design(
        &self,
        snapshot: &Snapshot,
        options: &SaveOptions,
    ) -> Result<(), PersistenceError>;

    async fn load_design(
        &self,
        project_id: Option<&str>,
    ) -> Result<Option<Snapshot>, PersistenceError>;

    fn validate_data(&self, snapshot: &Snapshot) -> ValidationReport {
        validate_snapshot(snapshot)
    }

    fn repair_data(&self, snapshot: Snapshot) -> Snapshot {
        repair_snapshot(snapshot)
    }
}

/// Applies the `validate_data` option: repairs the snapshot and rejects it when errors remain.
///
/// Returns `None` when no repair was needed or validation is off, so callers can keep borrowing
/// the original.
pub(crate) fn prepare_for_save(
    gateway: &(impl PersistenceGateway + ?Sized),
    snapshot: &Snapshot,
    options: &SaveOptions,
) -> Result<Option<Snapshot>, PersistenceError> {
    if !options.validate_data {
        return Ok(None);
    }
    let report = gateway.validate_data(snapshot);
    if report.is_clean() {
        return Ok(None);
    }
    let repaired = gateway.repair_data(snapshot.clone());
    let after = gateway.validate_data(&repaired);
    if !after.is_valid() {
        return Err(PersistenceError::Invalid {
            issues: after.errors.iter().map(ToString::to_string).collect(),
        });
    }
    if !report.warnings.is_empty() {
        tracing::debug!(
            warnings = report.warnings.len(),
            "repaired design before save"
        );
    }
    Ok(Some(repaired))
}

pub(crate) fn parse_project_id(value: &str) -> Result<ProjectId, PersistenceError> {
    ProjectId::new(value).map_err(|source| PersistenceError::InvalidProjectId {
        value: value.to_owned(),
        source,
    })
}

/// Descriptive metadata kept next to a design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectMeta {
    pub fn new(id: ProjectId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DesignExport<'a> {
    project: &'a ProjectMeta,
    snapshot: &'a Snapshot,
    exported_at: DateTime<Utc>,
}

/// Pretty-printed JSON export of a project and its current design.
pub fn export_design(project: &ProjectMeta, snapshot: &Snapshot) -> Result<String, PersistenceError> {
    let export = DesignExport {
        project,
        snapshot,
        exported_at: Utc::now(),
    };
    serde_json::to_string_pretty(&export)
        .map_err(|source| PersistenceError::Json { path: None, source })
}
