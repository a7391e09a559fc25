/// Core workflow type definitions
///
/// `WorkflowDefinition` is the n8n export format as stored on disk. Parsing is lenient:
/// every field has a default, `null` reads as that default, `active` may be a bool or
/// an integer, and malformed nodes are dropped so partially formed exports still index.
/// `WorkflowRecord` is one row of the `workflows` table.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// An n8n workflow export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// n8n exports use either numeric or string ids
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub active: bool,
    #[serde(default, deserialize_with = "well_formed_nodes")]
    pub nodes: Vec<WorkflowNode>,
    /// Keyed by source node name: `{ "main": [[{ "node": "Target", ... }], ...] }`
    #[serde(default, deserialize_with = "null_as_default")]
    pub connections: Map<String, Value>,
    /// Either plain strings or `{ "name": ... }` objects depending on n8n version
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<Value>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub meta: Option<Value>,
    #[serde(default, rename = "createdAt", deserialize_with = "text_or_none")]
    pub created_at: Option<String>,
    #[serde(default, rename = "updatedAt", deserialize_with = "text_or_none")]
    pub updated_at: Option<String>,
}

/// A single node inside a workflow export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowNode {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// e.g. "n8n-nodes-base.slack"
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub node_type: String,
    #[serde(default)]
    pub parameters: Value,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Strings pass through; anything else (numbers, objects, null) reads as absent
fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// `true`/`false`, any integer (non-zero is active), or "true"/"1" strings
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        _ => false,
    })
}

/// Keeps every node that parses; non-object entries are skipped
fn well_formed_nodes<'de, D>(deserializer: D) -> Result<Vec<WorkflowNode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|node| serde_json::from_value(node).ok())
        .collect())
}

impl WorkflowDefinition {
    /// Parse from an arbitrary JSON value, requiring an object at the top level
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// The id rendered as text, if the export carries one
    pub fn id_text(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Tag names regardless of how the export encodes them
    pub fn tag_names(&self) -> Vec<String> {
        self.tags
            .iter()
            .filter_map(|t| match t {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("name").and_then(|n| n.as_str()).map(str::to_string),
                _ => None,
            })
            .filter(|t| !t.trim().is_empty())
            .collect()
    }

    /// Description from the top level or `meta.description`
    pub fn declared_description(&self) -> Option<String> {
        self.description
            .clone()
            .or_else(|| {
                self.meta
                    .as_ref()
                    .and_then(|m| m.get("description"))
                    .and_then(|d| d.as_str())
                    .map(str::to_string)
            })
            .filter(|d| !d.trim().is_empty())
    }
}

/// One indexed workflow: the row in the `workflows` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowRecord {
    pub id: Option<i64>,
    /// Unique key, always a validated `name.json`
    pub filename: String,
    pub name: String,
    /// Subdirectory of the workflows root that holds the file
    pub subdirectory: String,
    pub active: bool,
    pub description: String,
    pub trigger_type: String,
    pub complexity: String,
    pub node_count: i64,
    pub integrations: Vec<String>,
    pub tags: Vec<String>,
    pub category: String,
    #[serde(skip)]
    pub file_hash: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_partial_exports() {
        let def = WorkflowDefinition::from_value(&json!({
            "id": 42,
            "nodes": [{ "type": "n8n-nodes-base.slack" }],
            "tags": ["ops", { "name": "alerts" }, { "id": 3 }]
        }))
        .unwrap();

        assert_eq!(def.id_text().as_deref(), Some("42"));
        assert!(def.name.is_none());
        assert_eq!(def.nodes[0].node_type, "n8n-nodes-base.slack");
        assert_eq!(def.tag_names(), vec!["ops", "alerts"]);
    }

    #[test]
    fn tolerates_integer_flags_and_nulls() {
        let def = WorkflowDefinition::from_value(&json!({
            "name": null,
            "active": 1,
            "nodes": [
                { "name": null, "type": "n8n-nodes-base.slack", "parameters": {} },
                "not a node"
            ],
            "connections": null,
            "tags": null,
            "createdAt": 1700000000
        }))
        .unwrap();

        assert!(def.active);
        assert!(def.name.is_none());
        assert_eq!(def.nodes.len(), 1);
        assert_eq!(def.nodes[0].name, "");
        assert_eq!(def.nodes[0].node_type, "n8n-nodes-base.slack");
        assert!(def.connections.is_empty());
        assert!(def.tags.is_empty());
        assert!(def.created_at.is_none());

        let inactive = WorkflowDefinition::from_value(&json!({ "active": 0 })).unwrap();
        assert!(!inactive.active);
    }

    #[test]
    fn rejects_non_objects() {
        assert!(WorkflowDefinition::from_value(&json!([1, 2])).is_none());
        assert!(WorkflowDefinition::from_value(&json!("text")).is_none());
    }

    #[test]
    fn description_falls_back_to_meta() {
        let def = WorkflowDefinition::from_value(&json!({
            "meta": { "description": "Posts invoices" }
        }))
        .unwrap();
        assert_eq!(def.declared_description().as_deref(), Some("Posts invoices"));
    }
}
