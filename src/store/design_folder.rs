// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{
    parse_project_id, prepare_for_save, PersistenceError, PersistenceGateway, ProjectMeta,
    SaveOptions,
};
use crate::model::{ProjectId, Snapshot};

pub const ENVELOPE_VERSION: u32 = 1;

const DESIGN_SUFFIX: &str = ".design.json";
const COMPRESSED_SUFFIX: &str = ".design.json.zst";
const PROJECT_SUFFIX: &str = ".project.json";
const ZSTD_LEVEL: i32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// On-disk wrapper around a saved snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignEnvelope {
    pub version: u32,
    pub project_id: ProjectId,
    pub saved_at: DateTime<Utc>,
    pub snapshot: Snapshot,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Temp file plus atomic rename, without fsync.
    #[default]
    BestEffort,

    /// Also syncs the file and its directory where the platform allows it.
    Durable,
}

/// File-backed gateway storing one design per project under a root folder.
///
/// ```text
/// <root>/
///   shop.design.json          envelope, plain
///   shop.design.json.bak      previous save
///   shop.project.json         ProjectMeta
///   billing.design.json.zst   envelope, zstd
/// ```
#[derive(Debug, Clone)]
pub struct DesignFolder {
    root: PathBuf,
    project: ProjectId,
    durability: WriteDurability,
}

impl DesignFolder {
    pub fn new(root: impl Into<PathBuf>, project: ProjectId) -> Self {
        Self {
            root: root.into(),
            project,
            durability: WriteDurability::default(),
        }
    }

    pub fn open(root: impl Into<PathBuf>, project: &str) -> Result<Self, PersistenceError> {
        Ok(Self::new(root, parse_project_id(project)?))
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn design_path(&self, project: &ProjectId, compressed: bool) -> PathBuf {
        let suffix = if compressed {
            COMPRESSED_SUFFIX
        } else {
            DESIGN_SUFFIX
        };
        self.root.join(format!("{project}{suffix}"))
    }

    pub fn meta_path(&self, project: &ProjectId) -> PathBuf {
        self.root.join(format!("{project}{PROJECT_SUFFIX}"))
    }

    pub async fn save_meta(&self, meta: &ProjectMeta) -> Result<(), PersistenceError> {
        let path = self.meta_path(&meta.id);
        let bytes = serde_json::to_vec_pretty(meta).map_err(|source| PersistenceError::Json {
            path: Some(path.clone()),
            source,
        })?;
        self.ensure_root().await?;
        write_atomic(&path, &bytes, self.durability).await
    }

    pub async fn load_meta(&self, project: &ProjectId) -> Result<Option<ProjectMeta>, PersistenceError> {
        let path = self.meta_path(project);
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PersistenceError::Json {
                path: Some(path),
                source,
            })
    }

    /// Projects with a saved design, sorted by id.
    pub async fn list_projects(&self) -> Result<Vec<ProjectId>, PersistenceError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error(&self.root, source)),
        };

        let mut projects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| io_error(&self.root, source))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let stem = name
                .strip_suffix(COMPRESSED_SUFFIX)
                .or_else(|| name.strip_suffix(DESIGN_SUFFIX));
            if let Some(id) = stem.and_then(|stem| ProjectId::new(stem).ok()) {
                projects.push(id);
            }
        }
        projects.sort();
        projects.dedup();
        Ok(projects)
    }

    /// Reads the raw envelope for `project`, or `None` when nothing was saved.
    pub async fn read_envelope(
        &self,
        project: &ProjectId,
    ) -> Result<Option<DesignEnvelope>, PersistenceError> {
        let compressed = self.design_path(project, true);
        let (path, bytes) = match read_optional(&compressed).await? {
            Some(bytes) => {
                let bytes = zstd::stream::decode_all(bytes.as_slice()).map_err(|source| {
                    PersistenceError::Compression {
                        path: compressed.clone(),
                        source,
                    }
                })?;
                (compressed, bytes)
            }
            None => {
                let plain = self.design_path(project, false);
                match read_optional(&plain).await? {
                    Some(bytes) => (plain, bytes),
                    None => return Ok(None),
                }
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PersistenceError::Json {
                path: Some(path),
                source,
            })
    }

    async fn ensure_root(&self) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| io_error(&self.root, source))
    }

    async fn write_design(
        &self,
        envelope: &DesignEnvelope,
        options: &SaveOptions,
    ) -> Result<(), PersistenceError> {
        let path = self.design_path(&envelope.project_id, options.compress);
        let json = serde_json::to_vec_pretty(envelope).map_err(|source| PersistenceError::Json {
            path: Some(path.clone()),
            source,
        })?;
        let bytes = if options.compress {
            zstd::stream::encode_all(json.as_slice(), ZSTD_LEVEL).map_err(|source| {
                PersistenceError::Compression {
                    path: path.clone(),
                    source,
                }
            })?
        } else {
            json
        };

        self.ensure_root().await?;
        if options.backup && fs::try_exists(&path).await.unwrap_or(false) {
            let backup = backup_path(&path);
            fs::copy(&path, &backup)
                .await
                .map_err(|source| io_error(&backup, source))?;
        }

        let mut attempt = 0;
        loop {
            match write_atomic(&path, &bytes, self.durability).await {
                Ok(()) => break,
                Err(err) if attempt < options.retries => {
                    attempt += 1;
                    tracing::warn!(path = %path.display(), attempt, error = %err, "design write failed; retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }

        // Only one encoding may exist per project, otherwise a later load could pick a stale file.
        let stale = self.design_path(&envelope.project_id, !options.compress);
        match fs::remove_file(&stale).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(io_error(&stale, source)),
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for DesignFolder {
    async fn save_design(
        &self,
        snapshot: &Snapshot,
        options: &SaveOptions,
    ) -> Result<(), PersistenceError> {
        let repaired = prepare_for_save(self, snapshot, options)?;
        let envelope = DesignEnvelope {
            version: ENVELOPE_VERSION,
            project_id: self.project.clone(),
            saved_at: Utc::now(),
            snapshot: repaired.unwrap_or_else(|| snapshot.clone()),
        };
        self.write_design(&envelope, options).await?;
        tracing::info!(
            project = %self.project,
            compressed = options.compress,
            components = envelope.snapshot.components.len(),
            "design saved"
        );
        Ok(())
    }

    async fn load_design(
        &self,
        project_id: Option<&str>,
    ) -> Result<Option<Snapshot>, PersistenceError> {
        let project = match project_id {
            Some(value) => parse_project_id(value)?,
            None => self.project.clone(),
        };

        let envelope = match self.read_envelope(&project).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => return Ok(None),
            Err(err @ PersistenceError::Io { .. }) => return Err(err),
            Err(err) => {
                tracing::warn!(project = %project, error = %err, "design is unreadable; ignoring it");
                return Ok(None);
            }
        };

        if envelope.version != ENVELOPE_VERSION {
            tracing::warn!(project = %project, version = envelope.version, "unsupported design version");
            return Ok(None);
        }

        let snapshot = self.repair_data(envelope.snapshot);
        let report = self.validate_data(&snapshot);
        if !report.is_valid() {
            tracing::warn!(project = %project, errors = report.errors.len(), "design is corrupt beyond repair");
            return Ok(None);
        }
        Ok(Some(snapshot))
    }
}

fn io_error(path: &Path, source: io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PersistenceError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(io_error(path, source)),
    }
}

async fn write_atomic(
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), PersistenceError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(".archicomm.tmp.{file_name}.{nanos}"));

    let written = match write_tmp(&tmp_path, contents, durability).await {
        Ok(()) => fs::rename(&tmp_path, path)
            .await
            .map_err(|source| io_error(path, source)),
        Err(err) => Err(err),
    };
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(err);
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent)
                .await
                .map_err(|source| io_error(parent, source))?;
            dir.sync_all()
                .await
                .map_err(|source| io_error(parent, source))?;
        }
    }

    Ok(())
}

async fn write_tmp(
    tmp_path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), PersistenceError> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp_path)
        .await
        .map_err(|source| io_error(tmp_path, source))?;
    file.write_all(contents)
        .await
        .map_err(|source| io_error(tmp_path, source))?;
    file.flush()
        .await
        .map_err(|source| io_error(tmp_path, source))?;
    if durability == WriteDurability::Durable {
        file.sync_all()
            .await
            .map_err(|source| io_error(tmp_path, source))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
