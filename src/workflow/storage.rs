/// SQLite persistence layer for the workflow index
///
/// One row per workflow file in `workflows`, mirrored into the external-content FTS5
/// table `workflows_fts` by insert/update/delete triggers. Callers never write the
/// FTS table directly.

use crate::workflow::types::WorkflowRecord;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteRow},
    QueryBuilder, Row, Sqlite,
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::Path,
    time::Duration,
};

const RECORD_COLUMNS: &str = "id, filename, name, subdirectory, active, description, trigger_type, \
     complexity, node_count, integrations, tags, category, file_hash, created_at, updated_at";

/// Schema statements, executed in order; each is a single SQL statement
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS workflows (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        subdirectory TEXT NOT NULL DEFAULT '',
        active INTEGER NOT NULL DEFAULT 0,
        description TEXT NOT NULL DEFAULT '',
        trigger_type TEXT NOT NULL DEFAULT 'Manual',
        complexity TEXT NOT NULL DEFAULT 'low',
        node_count INTEGER NOT NULL DEFAULT 0,
        integrations TEXT NOT NULL DEFAULT '[]',
        tags TEXT NOT NULL DEFAULT '[]',
        category TEXT NOT NULL DEFAULT 'Uncategorized',
        file_hash TEXT NOT NULL DEFAULT '',
        created_at TEXT,
        updated_at TEXT,
        indexed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_workflows_category ON workflows(category)",
    "CREATE INDEX IF NOT EXISTS idx_workflows_trigger ON workflows(trigger_type)",
    "CREATE INDEX IF NOT EXISTS idx_workflows_complexity ON workflows(complexity)",
    r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS workflows_fts USING fts5(
        filename,
        name,
        description,
        integrations,
        tags,
        category,
        content='workflows',
        content_rowid='id'
    )
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS workflows_ai AFTER INSERT ON workflows BEGIN
        INSERT INTO workflows_fts(rowid, filename, name, description, integrations, tags, category)
        VALUES (new.id, new.filename, new.name, new.description, new.integrations, new.tags, new.category);
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS workflows_ad AFTER DELETE ON workflows BEGIN
        INSERT INTO workflows_fts(workflows_fts, rowid, filename, name, description, integrations, tags, category)
        VALUES ('delete', old.id, old.filename, old.name, old.description, old.integrations, old.tags, old.category);
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS workflows_au AFTER UPDATE ON workflows BEGIN
        INSERT INTO workflows_fts(workflows_fts, rowid, filename, name, description, integrations, tags, category)
        VALUES ('delete', old.id, old.filename, old.name, old.description, old.integrations, old.tags, old.category);
        INSERT INTO workflows_fts(rowid, filename, name, description, integrations, tags, category)
        VALUES (new.id, new.filename, new.name, new.description, new.integrations, new.tags, new.category);
    END
    "#,
];

/// Filters and pagination for a search
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "all")]
    pub trigger: String,
    #[serde(default = "all")]
    pub complexity: String,
    #[serde(default = "all")]
    pub category: String,
    #[serde(default)]
    pub active_only: bool,
    #[serde(default = "first_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn all() -> String {
    "all".to_string()
}

fn first_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            q: String::new(),
            trigger: all(),
            complexity: all(),
            category: all(),
            active_only: false,
            page: first_page(),
            per_page: default_per_page(),
        }
    }
}

/// Aggregate numbers for the dashboard header
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub triggers: BTreeMap<String, i64>,
    pub complexity: BTreeMap<String, i64>,
    pub total_nodes: i64,
    pub unique_integrations: i64,
    pub last_indexed: String,
}

/// Turn free text into an FTS5 MATCH expression
///
/// Each whitespace-separated token becomes a quoted prefix query so user input can
/// never inject FTS operators. Returns `None` when nothing searchable remains.
pub fn match_expression(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split_whitespace()
        .map(|t| t.replace('"', ""))
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"*", t))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// SQLite-backed workflow index
#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    /// SQLite connection pool for the index database
    pool: SqlitePool,
}

impl WorkflowStorage {
    /// Create new storage instance with an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `path` and ensure the schema exists
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory '{}'", parent.display()))?;
        }

        tracing::info!("🗄️ Opening workflow index: {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("Failed to open database '{}'", path.display()))?;

        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create the workflows table, FTS shadow table and sync triggers
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        for &statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to initialize workflow index schema")?;
        }
        Ok(())
    }

    /// Insert or replace the row for `record.filename`
    ///
    /// The row id is kept on update, so the FTS update trigger fires instead of a
    /// delete/insert pair.
    pub async fn upsert(&self, record: &WorkflowRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO workflows (
                filename, name, subdirectory, active, description, trigger_type, complexity,
                node_count, integrations, tags, category, file_hash, created_at, updated_at,
                indexed_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(filename) DO UPDATE SET
                name = excluded.name,
                subdirectory = excluded.subdirectory,
                active = excluded.active,
                description = excluded.description,
                trigger_type = excluded.trigger_type,
                complexity = excluded.complexity,
                node_count = excluded.node_count,
                integrations = excluded.integrations,
                tags = excluded.tags,
                category = excluded.category,
                file_hash = excluded.file_hash,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                indexed_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&record.filename)
        .bind(&record.name)
        .bind(&record.subdirectory)
        .bind(record.active)
        .bind(&record.description)
        .bind(&record.trigger_type)
        .bind(&record.complexity)
        .bind(record.node_count)
        .bind(serde_json::to_string(&record.integrations)?)
        .bind(serde_json::to_string(&record.tags)?)
        .bind(&record.category)
        .bind(&record.file_hash)
        .bind(&record.created_at)
        .bind(&record.updated_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to index workflow '{}'", record.filename))?;

        Ok(())
    }

    /// Retrieve a workflow by filename
    pub async fn get(&self, filename: &str) -> Result<Option<WorkflowRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM workflows WHERE filename = ?", RECORD_COLUMNS))
            .bind(filename)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Delete a workflow row; the FTS entry goes with it via trigger
    pub async fn delete(&self, filename: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workflows WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete workflow '{}' from index", filename))?;

        Ok(result.rows_affected() > 0)
    }

    /// Update only the category column, returning whether a row matched
    pub async fn set_category(&self, filename: &str, category: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE workflows SET category = ? WHERE filename = ?")
            .bind(category)
            .bind(filename)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update category of '{}'", filename))?;

        Ok(result.rows_affected() > 0)
    }

    /// filename -> file fingerprint, used by the indexer to skip unchanged files
    pub async fn fingerprints(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT filename, file_hash FROM workflows")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("filename"), row.get("file_hash")))
            .collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM workflows")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }

    /// Filtered, paginated search; returns the page and the total match count
    pub async fn search(&self, query: &SearchQuery) -> Result<(Vec<WorkflowRecord>, i64)> {
        let fts = match_expression(&query.q);

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM workflows WHERE 1 = 1");
        push_filters(&mut count_qb, query, fts.as_deref());
        let total: i64 = count_qb.build().fetch_one(&self.pool).await?.get(0);

        let offset = (query.page - 1)
            .max(0)
            .checked_mul(query.per_page)
            .ok_or_else(|| anyhow!("Page {} is out of range", query.page))?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM workflows WHERE 1 = 1", RECORD_COLUMNS));
        push_filters(&mut qb, query, fts.as_deref());
        qb.push(" ORDER BY name COLLATE NOCASE, filename LIMIT ");
        qb.push_bind(query.per_page);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let records = rows.iter().map(record_from_row).collect::<Result<Vec<_>>>()?;

        Ok((records, total))
    }

    /// Sorted distinct integration names across all workflows
    pub async fn integrations(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT integrations FROM workflows")
            .fetch_all(&self.pool)
            .await?;

        let mut names = BTreeSet::new();
        for row in rows {
            let raw: String = row.get("integrations");
            let parsed: Vec<String> = serde_json::from_str(&raw).unwrap_or_default();
            names.extend(parsed);
        }
        Ok(names.into_iter().collect())
    }

    pub async fn stats(&self) -> Result<CatalogStats> {
        let totals = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(active), 0) AS active,
                   COALESCE(SUM(node_count), 0) AS total_nodes,
                   MAX(indexed_at) AS last_indexed
            FROM workflows
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = totals.get("total");
        let active: i64 = totals.get("active");

        Ok(CatalogStats {
            total,
            active,
            inactive: total - active,
            triggers: self.group_counts("trigger_type").await?,
            complexity: self.group_counts("complexity").await?,
            total_nodes: totals.get("total_nodes"),
            unique_integrations: self.integrations().await?.len() as i64,
            last_indexed: totals
                .get::<Option<String>, _>("last_indexed")
                .unwrap_or_default(),
        })
    }

    async fn group_counts(&self, column: &'static str) -> Result<BTreeMap<String, i64>> {
        let rows = sqlx::query(&format!(
            "SELECT {column} AS bucket, COUNT(*) AS n FROM workflows GROUP BY {column}"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("bucket"), row.get("n")))
            .collect())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &SearchQuery, fts: Option<&str>) {
    if let Some(expr) = fts {
        qb.push(" AND id IN (SELECT rowid FROM workflows_fts WHERE workflows_fts MATCH ");
        qb.push_bind(expr.to_string());
        qb.push(")");
    }
    if query.trigger != "all" {
        qb.push(" AND trigger_type = ");
        qb.push_bind(query.trigger.clone());
    }
    if query.complexity != "all" {
        qb.push(" AND complexity = ");
        qb.push_bind(query.complexity.clone());
    }
    if query.category != "all" {
        qb.push(" AND category = ");
        qb.push_bind(query.category.clone());
    }
    if query.active_only {
        qb.push(" AND active = 1");
    }
}

fn record_from_row(row: &SqliteRow) -> Result<WorkflowRecord> {
    let integrations: String = row.get("integrations");
    let tags: String = row.get("tags");

    Ok(WorkflowRecord {
        id: row.get("id"),
        filename: row.get("filename"),
        name: row.get("name"),
        subdirectory: row.get("subdirectory"),
        active: row.get("active"),
        description: row.get("description"),
        trigger_type: row.get("trigger_type"),
        complexity: row.get("complexity"),
        node_count: row.get("node_count"),
        integrations: serde_json::from_str(&integrations).context("Corrupt integrations column")?,
        tags: serde_json::from_str(&tags).context("Corrupt tags column")?,
        category: row.get("category"),
        file_hash: row.get("file_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
