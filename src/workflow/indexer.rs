/// Filesystem -> SQLite indexer
///
/// Walks the workflow tree, analyzes each definition and upserts its row. Files whose
/// fingerprint is unchanged are skipped unless a forced pass is requested; rows whose
/// file disappeared are dropped.

use crate::catalog::{
    categories::{CategoryStore, UNCATEGORIZED},
    mappings::CategoryMappings,
};
use crate::workflow::{
    analysis::analyze,
    files::{StoredFile, WorkflowFiles},
    storage::WorkflowStorage,
    types::{WorkflowDefinition, WorkflowRecord},
};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::Mutex;

/// Outcome counters of one indexing pass
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct IndexStats {
    pub processed: usize,
    pub skipped: usize,
    pub removed: usize,
    pub errors: usize,
}

#[derive(Debug)]
pub struct WorkflowIndexer {
    storage: WorkflowStorage,
    files: WorkflowFiles,
    categories: Arc<CategoryStore>,
    mappings: Arc<CategoryMappings>,
    /// One pass at a time; startup, uploads and the reindex endpoint may overlap
    pass_lock: Mutex<()>,
}

impl WorkflowIndexer {
    pub fn new(
        storage: WorkflowStorage,
        files: WorkflowFiles,
        categories: Arc<CategoryStore>,
        mappings: Arc<CategoryMappings>,
    ) -> Self {
        Self {
            storage,
            files,
            categories,
            mappings,
            pass_lock: Mutex::new(()),
        }
    }

    /// Index every workflow file under the root
    pub async fn index_all(&self, force: bool) -> Result<IndexStats> {
        let _guard = self.pass_lock.lock().await;
        let started = std::time::Instant::now();

        let on_disk = self.files.scan().await?;
        let known = self.storage.fingerprints().await?;
        let mut stats = IndexStats::default();
        let mut seen = HashSet::new();

        for file in &on_disk {
            seen.insert(file.filename.clone());

            let fingerprint = match self.files.fingerprint(file).await {
                Ok(fp) => fp,
                Err(e) => {
                    tracing::warn!("⚠️ Cannot stat {}: {}", file.path.display(), e);
                    stats.errors += 1;
                    continue;
                }
            };

            if !force && known.get(&file.filename) == Some(&fingerprint) {
                stats.skipped += 1;
                continue;
            }

            match self.index_with_fingerprint(file, fingerprint).await {
                Ok(_) => stats.processed += 1,
                Err(e) => {
                    tracing::warn!("⚠️ Failed to index {}: {:#}", file.filename, e);
                    stats.errors += 1;
                }
            }
        }

        for filename in known.keys().filter(|f| !seen.contains(*f)) {
            match self.storage.delete(filename).await {
                Ok(true) => {
                    tracing::info!("🧹 Dropped index row for vanished file: {}", filename);
                    stats.removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("⚠️ Failed to drop stale row {}: {:#}", filename, e);
                    stats.errors += 1;
                }
            }
        }

        tracing::info!(
            "📚 Indexing finished in {:?}: {} processed, {} skipped, {} removed, {} errors",
            started.elapsed(),
            stats.processed,
            stats.skipped,
            stats.removed,
            stats.errors
        );

        Ok(stats)
    }

    /// Index a single file right away, e.g. after an upload
    pub async fn index_file(&self, file: &StoredFile) -> Result<WorkflowRecord> {
        let _guard = self.pass_lock.lock().await;
        let fingerprint = self.files.fingerprint(file).await?;
        self.index_with_fingerprint(file, fingerprint).await
    }

    async fn index_with_fingerprint(&self, file: &StoredFile, fingerprint: String) -> Result<WorkflowRecord> {
        let value = self.files.read_json(file).await?;
        let definition = WorkflowDefinition::from_value(&value)
            .ok_or_else(|| anyhow!("'{}' is not a workflow object", file.filename))?;

        let stem = file.filename.trim_end_matches(".json");
        let analysis = analyze(&definition, stem);

        let category = self
            .mappings
            .get(&file.filename)
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        if category != UNCATEGORIZED {
            self.categories.ensure(&category).await?;
        }

        let record = WorkflowRecord {
            id: None,
            filename: file.filename.clone(),
            name: analysis.name,
            subdirectory: file.subdirectory.clone(),
            active: analysis.active,
            description: analysis.description,
            trigger_type: analysis.trigger_type,
            complexity: analysis.complexity,
            node_count: analysis.node_count,
            integrations: analysis.integrations,
            tags: analysis.tags,
            category,
            file_hash: fingerprint,
            created_at: definition.created_at.clone(),
            updated_at: definition.updated_at.clone(),
        };

        self.storage.upsert(&record).await?;
        tracing::debug!("📄 Indexed {}/{}", file.subdirectory, file.filename);
        Ok(record)
    }
}
