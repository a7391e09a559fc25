/// Filesystem store for workflow definition files
///
/// Layout: `<root>/<Subdirectory>/<name>.json`, one level deep. Every path handed
/// out by this module has been checked to resolve inside the root.

use crate::catalog::filename::{resolves_within, sanitize_filename, validate_filename, workflow_path};
use crate::workflow::{analysis::storage_directory, types::WorkflowDefinition};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// A workflow file found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub subdirectory: String,
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WorkflowFiles {
    root: PathBuf,
}

impl WorkflowFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create workflows directory '{}'", self.root.display()))
    }

    /// Find the file for a validated `filename`
    ///
    /// Tries the recorded subdirectory first, then every subdirectory of the root.
    /// Candidates that resolve outside the root are skipped.
    pub async fn locate(&self, filename: &str, hint: Option<&str>) -> Result<Option<StoredFile>> {
        if let Some(subdirectory) = hint.filter(|s| !s.is_empty()) {
            let candidate = workflow_path(&self.root, subdirectory, filename);
            if self.is_safe_file(&candidate).await {
                return Ok(Some(StoredFile {
                    subdirectory: subdirectory.to_string(),
                    filename: filename.to_string(),
                    path: candidate,
                }));
            }
        }

        for subdirectory in self.subdirectories().await? {
            let candidate = workflow_path(&self.root, &subdirectory, filename);
            if self.is_safe_file(&candidate).await {
                return Ok(Some(StoredFile {
                    subdirectory,
                    filename: filename.to_string(),
                    path: candidate,
                }));
            }
        }

        Ok(None)
    }

    /// Every `*.json` file with a valid name, one level below the root
    pub async fn scan(&self) -> Result<Vec<StoredFile>> {
        let mut found = Vec::new();
        for subdirectory in self.subdirectories().await? {
            let dir = self.root.join(&subdirectory);
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("Failed to list '{}'", dir.display()))?;

            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if !name.ends_with(".json") {
                    continue;
                }
                if validate_filename(&name).as_deref() != Some(name.as_str()) {
                    tracing::warn!("⚠️ Skipping workflow with unsafe filename: {}/{}", subdirectory, name);
                    continue;
                }
                let path = entry.path();
                if !self.is_safe_file(&path).await {
                    continue;
                }
                found.push(StoredFile {
                    subdirectory: subdirectory.clone(),
                    filename: name,
                    path,
                });
            }
        }

        found.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(found)
    }

    pub async fn read_json(&self, file: &StoredFile) -> Result<Value> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .with_context(|| format!("Failed to read '{}'", file.path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("Invalid JSON in '{}'", file.filename))
    }

    pub async fn read_bytes(&self, file: &StoredFile) -> Result<Vec<u8>> {
        tokio::fs::read(&file.path)
            .await
            .with_context(|| format!("Failed to read '{}'", file.path.display()))
    }

    pub async fn remove(&self, file: &StoredFile) -> Result<()> {
        tokio::fs::remove_file(&file.path)
            .await
            .with_context(|| format!("Failed to delete '{}'", file.path.display()))
    }

    /// Size and modification time; changes whenever the file is rewritten
    pub async fn fingerprint(&self, file: &StoredFile) -> Result<String> {
        let meta = tokio::fs::metadata(&file.path).await?;
        let modified = meta
            .modified()
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_nanos_opt().unwrap_or_default())
            .unwrap_or_default();
        Ok(format!("{}:{}", meta.len(), modified))
    }

    /// Write an uploaded workflow under its detected service subdirectory
    ///
    /// Without a provided name one is generated from the workflow id (or a timestamp)
    /// and its cleaned display name. Invalid names are sanitized rather than rejected.
    pub async fn save(&self, data: &Value, provided: Option<&str>) -> Result<StoredFile> {
        let definition = WorkflowDefinition::from_value(data)
            .ok_or_else(|| anyhow!("Workflow data is not a workflow object"))?;
        let subdirectory = storage_directory(&definition);

        let mut filename = match provided {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => generated_filename(&definition),
        };
        if !filename.ends_with(".json") {
            filename.push_str(".json");
        }
        if validate_filename(&filename).as_deref() != Some(filename.as_str()) {
            filename = sanitize_filename(&filename);
        }

        let dir = self.root.join(&subdirectory);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create '{}'", dir.display()))?;

        let path = dir.join(&filename);
        tokio::fs::write(&path, serde_json::to_vec_pretty(data)?)
            .await
            .with_context(|| format!("Failed to write '{}'", path.display()))?;

        tracing::info!("💾 Saved workflow file: {}/{}", subdirectory, filename);

        Ok(StoredFile { subdirectory, filename, path })
    }

    async fn subdirectories(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to list '{}'", self.root.display())),
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    dirs.push(name.to_string());
                }
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    async fn is_safe_file(&self, candidate: &Path) -> bool {
        match tokio::fs::metadata(candidate).await {
            Ok(meta) if meta.is_file() => {}
            _ => return false,
        }
        if resolves_within(&self.root, candidate) {
            true
        } else {
            tracing::warn!("🚫 Blocked access to file outside workflows root: {}", candidate.display());
            false
        }
    }
}

/// `{id}_{clean_name}.json`, or `{timestamp}_{clean_name}.json` when there is no id
fn generated_filename(definition: &WorkflowDefinition) -> String {
    let display = definition.name.clone().unwrap_or_else(|| "workflow".to_string());
    let cleaned: String = display
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();
    let cleaned = cleaned
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let cleaned = if cleaned.is_empty() { "workflow".to_string() } else { cleaned };

    let prefix = definition
        .id_text()
        .unwrap_or_else(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());
    format!("{}_{}.json", prefix, cleaned)
}
