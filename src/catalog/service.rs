/// Workflow catalog service
///
/// Coordinates the three stores behind every catalog operation: the SQLite index
/// (with its FTS shadow), the workflow file tree, and the two JSON sidecars. Input is
/// validated before any store is touched. After that, each store write stands on
/// its own and there is no rollback.

use crate::catalog::{
    categories::CategoryStore,
    filename::validate_filename,
    mappings::CategoryMappings,
    types::{
        AssignmentOutcome, CategoryAddOutcome, DeletionOutcome, SearchPage, UploadOutcome,
        WorkflowDetail,
    },
};
use crate::error::{CatalogError, CatalogResult};
use crate::workflow::{
    diagram::mermaid,
    files::{StoredFile, WorkflowFiles},
    indexer::{IndexStats, WorkflowIndexer},
    storage::{CatalogStats, SearchQuery, WorkflowStorage},
    types::{WorkflowDefinition, WorkflowRecord},
};
use serde_json::{json, Value};
use std::{collections::BTreeMap, sync::Arc};

/// Largest page size accepted by search
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone)]
pub struct WorkflowCatalog {
    storage: WorkflowStorage,
    files: WorkflowFiles,
    categories: Arc<CategoryStore>,
    mappings: Arc<CategoryMappings>,
    indexer: Arc<WorkflowIndexer>,
}

fn checked_filename(filename: &str) -> CatalogResult<String> {
    validate_filename(filename).ok_or_else(|| {
        tracing::warn!("🚫 Blocked unsafe workflow filename: {:?}", filename);
        CatalogError::InvalidFilename(filename.to_string())
    })
}

fn checked_category(category: &str) -> CatalogResult<String> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidCategory(category.to_string()));
    }
    Ok(trimmed.to_string())
}

impl WorkflowCatalog {
    pub fn new(
        storage: WorkflowStorage,
        files: WorkflowFiles,
        categories: Arc<CategoryStore>,
        mappings: Arc<CategoryMappings>,
        indexer: Arc<WorkflowIndexer>,
    ) -> Self {
        Self {
            storage,
            files,
            categories,
            mappings,
            indexer,
        }
    }

    /// All category names, sorted, always including `Uncategorized`
    pub fn list_categories(&self) -> Vec<String> {
        self.categories.list()
    }

    /// Add a category name; re-adding an existing one reports `added: false`
    pub async fn add_category(&self, name: &str) -> CatalogResult<CategoryAddOutcome> {
        let category = checked_category(name)?;
        let added = self.categories.ensure(&category).await?;
        if !added {
            tracing::debug!("🏷️ Category already exists: {}", category);
        }
        Ok(CategoryAddOutcome { category, added })
    }

    /// Assign an indexed workflow to a category, creating the category if needed
    pub async fn assign(&self, filename: &str, category: &str) -> CatalogResult<AssignmentOutcome> {
        let filename = checked_filename(filename)?;
        let category = checked_category(category)?;

        if self.storage.get(&filename).await?.is_none() {
            return Err(CatalogError::NotFound(format!("Workflow '{}' not found", filename)));
        }

        let category_created = self.categories.ensure(&category).await?;

        if !self.storage.set_category(&filename, &category).await? {
            return Err(CatalogError::NotFound(format!("Workflow '{}' not found", filename)));
        }
        self.mappings.set(&filename, &category).await?;

        tracing::info!("🏷️ Assigned {} to category '{}'", filename, category);

        Ok(AssignmentOutcome {
            filename,
            category,
            category_created,
        })
    }

    /// Best-effort cascade delete across index, filesystem and assignment sidecar
    ///
    /// Validation and lookup failures abort before anything is touched. After that,
    /// every step runs regardless of the others and reports its own result. The
    /// category name set is never modified.
    pub async fn delete(&self, filename: &str) -> CatalogResult<DeletionOutcome> {
        let filename = checked_filename(filename)?;

        let record = self
            .storage
            .get(&filename)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Workflow '{}' not found in database", filename)))?;

        // Locate before the row goes away; the row carries the subdirectory hint.
        let located = match self.files.locate(&filename, Some(&record.subdirectory)).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("⚠️ Could not search for file {}: {:#}", filename, e);
                None
            }
        };

        let deleted_from_db = match self.storage.delete(&filename).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!("⚠️ Could not delete {} from index: {:#}", filename, e);
                false
            }
        };

        let deleted_from_filesystem = match &located {
            Some(file) => match self.files.remove(file).await {
                Ok(()) => {
                    tracing::info!("🗑️ Deleted workflow file: {}", file.path.display());
                    true
                }
                Err(e) => {
                    tracing::warn!("⚠️ Could not delete file {}: {:#}", file.path.display(), e);
                    false
                }
            },
            None => {
                tracing::warn!("⚠️ No file on disk for {}", filename);
                false
            }
        };

        let removed_from_mappings = match self.mappings.remove(&filename).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("⚠️ Could not update category mappings for {}: {:#}", filename, e);
                false
            }
        };

        let outcome = DeletionOutcome {
            filename,
            deleted_from_db,
            deleted_from_filesystem,
            removed_from_mappings,
        };

        if outcome.is_complete() {
            tracing::info!("🗑️ Deleted workflow {}", outcome.filename);
        } else {
            tracing::warn!(
                "⚠️ Partial delete of {}: db={} fs={} mappings={}",
                outcome.filename,
                outcome.deleted_from_db,
                outcome.deleted_from_filesystem,
                outcome.removed_from_mappings
            );
        }

        Ok(outcome)
    }

    async fn record_and_file(&self, filename: &str) -> CatalogResult<(WorkflowRecord, StoredFile)> {
        let filename = checked_filename(filename)?;
        let record = self
            .storage
            .get(&filename)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Workflow '{}' not found in database", filename)))?;
        let file = self
            .files
            .locate(&filename, Some(&record.subdirectory))
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Workflow file '{}' not found on filesystem", filename)))?;
        Ok((record, file))
    }

    /// Index metadata plus the raw definition
    pub async fn get_workflow(&self, filename: &str) -> CatalogResult<WorkflowDetail> {
        let (metadata, file) = self.record_and_file(filename).await?;
        let raw_json = self.files.read_json(&file).await?;
        Ok(WorkflowDetail { metadata, raw_json })
    }

    /// Validated filename and file bytes for a download
    pub async fn download(&self, filename: &str) -> CatalogResult<(String, Vec<u8>)> {
        let filename = checked_filename(filename)?;
        let file = self
            .files
            .locate(&filename, None)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Workflow file '{}' not found", filename)))?;
        let bytes = self.files.read_bytes(&file).await?;
        Ok((file.filename, bytes))
    }

    /// Mermaid flowchart for a workflow file
    pub async fn diagram(&self, filename: &str) -> CatalogResult<String> {
        let filename = checked_filename(filename)?;
        let file = self
            .files
            .locate(&filename, None)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Workflow file '{}' not found on filesystem", filename)))?;

        let bytes = self.files.read_bytes(&file).await?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| CatalogError::BadRequest(format!("Invalid JSON in workflow file: {}", e)))?;
        let definition = WorkflowDefinition::from_value(&value)
            .ok_or_else(|| CatalogError::BadRequest("Workflow file is not a workflow object".to_string()))?;

        Ok(mermaid(&definition.nodes, &definition.connections))
    }

    pub async fn search(&self, query: SearchQuery) -> CatalogResult<SearchPage> {
        if query.page < 1 {
            return Err(CatalogError::BadRequest("page must be >= 1".to_string()));
        }
        if !(1..=MAX_PER_PAGE).contains(&query.per_page) {
            return Err(CatalogError::BadRequest(format!("per_page must be between 1 and {}", MAX_PER_PAGE)));
        }

        if (query.page - 1).checked_mul(query.per_page).is_none() {
            return Err(CatalogError::BadRequest(format!("page {} is out of range", query.page)));
        }

        let (workflows, total) = self.storage.search(&query).await?;
        let pages = (total + query.per_page - 1) / query.per_page;

        Ok(SearchPage {
            workflows,
            total,
            page: query.page,
            per_page: query.per_page,
            pages,
            filters: json!({
                "trigger": query.trigger,
                "complexity": query.complexity,
                "category": query.category,
                "active_only": query.active_only,
            }),
            query: query.q,
        })
    }

    /// One page of the workflows assigned to `category`
    pub async fn search_by_category(&self, category: &str, page: i64, per_page: i64) -> CatalogResult<SearchPage> {
        let category = checked_category(category)?;
        let query = SearchQuery {
            category: category.clone(),
            page,
            per_page,
            ..Default::default()
        };

        let mut result = self.search(query).await?;
        result.query = format!("category:{}", category);
        result.filters = json!({ "category": category });
        Ok(result)
    }

    pub async fn stats(&self) -> CatalogResult<CatalogStats> {
        Ok(self.storage.stats().await?)
    }

    pub async fn integrations(&self) -> CatalogResult<Vec<String>> {
        Ok(self.storage.integrations().await?)
    }

    /// filename -> category for client-side filtering
    pub fn category_mappings(&self) -> BTreeMap<String, String> {
        self.mappings.all()
    }

    /// Store an uploaded workflow, index it, then apply overrides
    ///
    /// `active` rewrites the definition's flag before saving. `category` goes through
    /// the regular assignment path so the category store stays in sync.
    pub async fn upload(
        &self,
        mut data: Value,
        provided_filename: Option<&str>,
        active: Option<bool>,
        category: Option<&str>,
    ) -> CatalogResult<UploadOutcome> {
        let Some(object) = data.as_object_mut() else {
            return Err(CatalogError::BadRequest("Workflow data must be a JSON object".to_string()));
        };
        if let Some(active) = active {
            object.insert("active".to_string(), Value::Bool(active));
        }
        let category = category.map(checked_category).transpose()?;
        if WorkflowDefinition::from_value(&data).is_none() {
            return Err(CatalogError::BadRequest("Workflow data is not a valid workflow definition".to_string()));
        }

        self.files.ensure_root().await?;
        let stored = self.files.save(&data, provided_filename).await?;

        let record = match self.indexer.index_file(&stored).await {
            Ok(record) => record,
            Err(e) => {
                // Nothing unindexed stays behind on disk.
                if let Err(remove_err) = self.files.remove(&stored).await {
                    tracing::warn!("⚠️ Could not remove unindexed upload {}: {:#}", stored.filename, remove_err);
                }
                return Err(e.into());
            }
        };
        let category = match category {
            Some(category) => self.assign(&stored.filename, &category).await?.category,
            None => record.category,
        };

        Ok(UploadOutcome {
            filename: stored.filename,
            filepath: stored.path.display().to_string(),
            indexed: true,
            category,
        })
    }

    /// Run a full indexing pass
    pub async fn reindex(&self, force: bool) -> CatalogResult<IndexStats> {
        Ok(self.indexer.index_all(force).await?)
    }
}
