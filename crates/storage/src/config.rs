// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator configuration file (`config.json`).
//!
//! Holds the owner id and the project table. Written with the same
//! temp-file-and-rename discipline as the snapshot so a crash mid-write
//! never leaves a torn file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tether_core::ProjectConfig;
use thiserror::Error;

/// Current config schema version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Errors from config file operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config version {0}")]
    UnsupportedVersion(u32),
}

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    /// Chat user id allowed to drive the orchestrator.
    pub owner_id: String,
    #[serde(default)]
    pub projects: HashMap<String, ProjectConfig>,
}

impl ConfigFile {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self { version: CURRENT_CONFIG_VERSION, owner_id: owner_id.into(), projects: HashMap::new() }
    }
}

/// Config file handle: in-memory copy plus its on-disk location.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    data: ConfigFile,
}

impl ConfigStore {
    /// Load `config.json`, or start fresh with the given owner.
    pub fn load_or_create(path: impl Into<PathBuf>, owner_id: &str) -> Result<Self, ConfigError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) => {
                let data: ConfigFile = serde_json::from_slice(&bytes)?;
                if data.version != CURRENT_CONFIG_VERSION {
                    return Err(ConfigError::UnsupportedVersion(data.version));
                }
                data
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ConfigFile::new(owner_id),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, data })
    }

    pub fn owner_id(&self) -> &str {
        &self.data.owner_id
    }

    pub fn project(&self, name: &str) -> Option<&ProjectConfig> {
        self.data.projects.get(name)
    }

    pub fn projects(&self) -> &HashMap<String, ProjectConfig> {
        &self.data.projects
    }

    /// Insert a project and persist immediately.
    pub fn insert_project(&mut self, project: ProjectConfig) -> Result<(), ConfigError> {
        self.data.projects.insert(project.name.clone(), project);
        self.save()
    }

    /// Write atomically: temp file, fsync, rename.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&serde_json::to_vec_pretty(&self.data)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
