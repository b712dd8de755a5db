//! Resolution of model files.
//!
//! A file is taken from a configured local path when one is given, and
//! otherwise fetched through the Hugging Face Hub cache, which only downloads
//! on the first use.

use anyhow::{Context, Result};
use hf_hub::api::sync::{Api, ApiBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::HubConfig;

/// Builds a hub client honoring the configured cache directory.
pub fn hub_api(config: &HubConfig) -> Result<Api> {
    let mut builder = ApiBuilder::new().with_progress(config.progress);
    if let Some(cache_dir) = &config.cache_dir {
        builder = builder.with_cache_dir(cache_dir.clone());
    }
    builder.build().context("Failed to create Hugging Face Hub client")
}

/// A file that lives in a hub repository unless overridden locally.
#[derive(Debug, Clone)]
pub struct ModelFile {
    repo_id: String,
    file_name: String,
    local_path: Option<PathBuf>,
}

impl ModelFile {
    pub fn new(repo_id: &str, file_name: &str) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            file_name: file_name.to_string(),
            local_path: None,
        }
    }

    /// Uses `path` instead of the hub when it is `Some`.
    pub fn with_local_path(mut self, path: Option<&Path>) -> Self {
        self.local_path = path.map(Path::to_path_buf);
        self
    }

    /// Returns the local path of the file, downloading it if necessary.
    pub fn get(&self, api: &Api) -> Result<PathBuf> {
        if let Some(path) = &self.local_path {
            anyhow::ensure!(path.is_file(), "Local file {:?} does not exist", path);
            debug!("Using local file {:?}", path);
            return Ok(path.clone());
        }

        info!("Locating {}/{} (downloading if necessary)", self.repo_id, self.file_name);
        api.model(self.repo_id.clone())
            .get(&self.file_name)
            .with_context(|| format!("Failed to fetch {} from {}", self.file_name, self.repo_id))
    }
}
