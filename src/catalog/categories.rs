/// Category name store backed by `unique_categories.json`
///
/// Readers take a lock-free snapshot through ArcSwap. Writers serialize on a mutex,
/// persist the full set first and only then swap the new snapshot in, so a failed
/// write leaves both the file and the in-memory view unchanged.

use crate::catalog::sidecar::{read_json, write_json_atomic};
use anyhow::Result;
use arc_swap::ArcSwap;
use std::{
    collections::BTreeSet,
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::Mutex;

/// Reserved category every workflow falls back to; never removed
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug)]
pub struct CategoryStore {
    /// Ordered set of names; BTreeSet order is the case-sensitive lexicographic order
    names: ArcSwap<BTreeSet<String>>,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CategoryStore {
    /// Load the store from `path`
    ///
    /// When the file does not exist yet, the set is seeded from `fallback`
    /// (categories already present in the assignment sidecar).
    pub async fn load(path: impl Into<PathBuf>, fallback: impl IntoIterator<Item = String>) -> Result<Self> {
        let path = path.into();
        let mut names: BTreeSet<String> = match read_json::<Vec<String>>(&path).await? {
            Some(stored) => stored.into_iter().collect(),
            None => {
                tracing::info!("📂 No category file at {}, seeding from assignments", path.display());
                fallback.into_iter().collect()
            }
        };
        names.retain(|n| !n.trim().is_empty());
        names.insert(UNCATEGORIZED.to_string());

        tracing::info!("🏷️ Loaded {} categories", names.len());

        Ok(Self {
            names: ArcSwap::new(Arc::new(names)),
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// All category names, sorted ascending
    pub fn list(&self) -> Vec<String> {
        self.names.load().iter().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.load().contains(name)
    }

    /// Insert `name` if absent, returning whether it was created
    ///
    /// Re-adding an existing name is a successful no-op.
    pub async fn ensure(&self, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let current = self.names.load_full();
        if current.contains(name) {
            return Ok(false);
        }

        let mut next = (*current).clone();
        next.insert(name.to_string());
        self.persist(&next).await?;
        self.names.store(Arc::new(next));

        tracing::info!("🏷️ Created category: {}", name);
        Ok(true)
    }

    async fn persist(&self, names: &BTreeSet<String>) -> Result<()> {
        let sorted: Vec<&String> = names.iter().collect();
        write_json_atomic(&self.path, &sorted).await
    }
}
