// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! TOML configuration.
//!
//! ```toml
//! [history]
//! max_depth = 50
//!
//! [autosave]
//! debounce_ms = 2000
//! enabled = true
//!
//! [autosave.save]
//! retries = 2
//! compress = false
//!
//! [frames]
//! padding = 32.0
//!
//! [storage]
//! root = ".archicomm"
//! default_project = "default"
//! ```
//!
//! Every key is optional.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::autosave::AutoSaveConfig;
use crate::frames::FrameConfig;
use crate::history::HistoryConfig;
use crate::state::StoreConfig;

pub const DEFAULT_STORAGE_ROOT: &str = ".archicomm";
pub const DEFAULT_PROJECT: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StorageConfig {
    pub root: PathBuf,
    pub default_project: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            default_project: DEFAULT_PROJECT.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ArchiConfig {
    pub history: HistoryConfig,
    pub autosave: AutoSaveConfig,
    pub frames: FrameConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: frames.padding must be a finite, non-negative number")]
    Padding,
}

impl ArchiConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        if !config.frames.padding.is_finite() || config.frames.padding < 0.0 {
            return Err(ConfigError::Padding);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            history: self.history,
            frames: self.frames,
        }
    }
}
