/// Filename -> category assignments backed by `search_categories.json`
///
/// The sidecar is an array of `{ "filename": ..., "category": ... }` objects. Entries
/// may carry extra fields written by other tooling; those are kept verbatim.

use crate::catalog::{
    categories::UNCATEGORIZED,
    sidecar::{read_json, write_json_atomic},
};
use anyhow::Result;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingEntry {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MappingEntry {
    /// Assigned category, treating missing or blank values as `Uncategorized`
    pub fn effective_category(&self) -> &str {
        match self.category.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => UNCATEGORIZED,
        }
    }
}

#[derive(Debug)]
pub struct CategoryMappings {
    entries: ArcSwap<Vec<MappingEntry>>,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CategoryMappings {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = read_json::<Vec<MappingEntry>>(&path).await?.unwrap_or_default();
        tracing::info!("🗂️ Loaded {} category assignments", entries.len());

        Ok(Self {
            entries: ArcSwap::new(Arc::new(entries)),
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Category assigned to `filename`, if it has an entry
    pub fn get(&self, filename: &str) -> Option<String> {
        self.entries
            .load()
            .iter()
            .find(|e| e.filename == filename)
            .map(|e| e.effective_category().to_string())
    }

    /// Flattened filename -> category view
    pub fn all(&self) -> BTreeMap<String, String> {
        self.entries
            .load()
            .iter()
            .filter(|e| !e.filename.is_empty())
            .map(|e| (e.filename.clone(), e.effective_category().to_string()))
            .collect()
    }

    /// Distinct categories referenced by any assignment
    pub fn categories(&self) -> BTreeSet<String> {
        self.entries
            .load()
            .iter()
            .map(|e| e.effective_category().to_string())
            .collect()
    }

    /// Assign `filename` to `category`, inserting a new entry when needed
    pub async fn set(&self, filename: &str, category: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut next = (*self.entries.load_full()).clone();
        match next.iter_mut().find(|e| e.filename == filename) {
            Some(entry) => entry.category = Some(category.to_string()),
            None => next.push(MappingEntry {
                filename: filename.to_string(),
                category: Some(category.to_string()),
                extra: Map::new(),
            }),
        }

        write_json_atomic(&self.path, &next).await?;
        self.entries.store(Arc::new(next));
        Ok(())
    }

    /// Drop every entry for `filename`, returning whether anything was removed
    ///
    /// A missing entry is not an error and does not touch the file.
    pub async fn remove(&self, filename: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let current = self.entries.load_full();
        let next: Vec<MappingEntry> = current
            .iter()
            .filter(|e| e.filename != filename)
            .cloned()
            .collect();
        if next.len() == current.len() {
            return Ok(false);
        }

        write_json_atomic(&self.path, &next).await?;
        self.entries.store(Arc::new(next));
        Ok(true)
    }
}
