/// Metadata extraction from workflow exports
///
/// Derives everything the search index stores about a workflow: trigger type,
/// complexity bucket, integrations, and the storage subdirectory for uploads.

use crate::workflow::types::{WorkflowDefinition, WorkflowNode};
use std::collections::BTreeSet;

/// n8n node type prefixes stripped before naming a service
const NODE_TYPE_PREFIXES: &[&str] = &["n8n-nodes-base.", "@n8n/n8n-nodes-langchain."];

/// Control-flow and helper nodes that are not integrations
const UTILITY_NODES: &[&str] = &[
    "set", "if", "switch", "merge", "function", "functionitem", "code", "noop", "stickynote",
    "start", "manualtrigger", "wait", "splitinbatches", "itemlists", "datetime", "filter",
    "aggregate", "splitout", "sort", "limit", "removeduplicates", "executeworkflow",
    "executeworkflowtrigger", "respondtowebhook", "errortrigger", "movebinarydata",
    "converttofile", "extractfromfile", "html", "markdown", "xml", "crypto", "compression",
    "webhook", "cron", "schedule", "scheduletrigger", "interval", "httprequest",
];

/// Keyword -> subdirectory table used to file uploads by primary service
const SERVICE_DIRECTORIES: &[(&str, &str)] = &[
    ("telegram", "Telegram"),
    ("discord", "Discord"),
    ("slack", "Slack"),
    ("gmail", "Gmail"),
    ("googlesheets", "Googlesheets"),
    ("googledrive", "Googledrive"),
    ("webhook", "Webhook"),
    ("http", "Http"),
    ("schedule", "Schedule"),
    ("cron", "Cron"),
    ("postgres", "Postgres"),
    ("mysql", "Mysqltool"),
    ("mongodb", "Mongodbtool"),
    ("airtable", "Airtable"),
    ("github", "Github"),
    ("gitlab", "Gitlab"),
    ("jira", "Jira"),
    ("openai", "Openai"),
    ("notion", "Notion"),
    ("shopify", "Shopify"),
    ("stripe", "Stripe"),
    ("twitter", "Twitter"),
    ("linkedin", "Linkedin"),
    ("facebook", "Facebook"),
    ("instagram", "Instagram"),
    ("whatsapp", "Whatsapp"),
    ("trello", "Trello"),
    ("asana", "Asana"),
    ("mondaycom", "Mondaycom"),
    ("dropbox", "Dropbox"),
    ("onedrive", "Microsoftonedrive"),
    ("outlook", "Microsoftoutlook"),
    ("calendly", "Calendly"),
    ("typeform", "Typeform"),
    ("youtube", "Youtube"),
    ("wordpress", "Wordpress"),
    ("woocommerce", "Woocommerce"),
];

/// Directories that a more specific service match may override
const GENERIC_DIRECTORIES: &[&str] = &["Manual", "Webhook", "Schedule"];

/// Everything the indexer derives from a definition
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowAnalysis {
    pub name: String,
    pub active: bool,
    pub node_count: i64,
    pub trigger_type: String,
    pub complexity: String,
    pub integrations: Vec<String>,
    pub tags: Vec<String>,
    pub description: String,
}

/// Node type without its package prefix, e.g. "slack" for "n8n-nodes-base.slack"
fn short_type(node: &WorkflowNode) -> &str {
    NODE_TYPE_PREFIXES
        .iter()
        .find_map(|p| node.node_type.strip_prefix(p))
        .unwrap_or(&node.node_type)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn trigger_type(def: &WorkflowDefinition) -> &'static str {
    let types: Vec<String> = def.nodes.iter().map(|n| n.node_type.to_lowercase()).collect();

    if types.iter().any(|t| t.contains("webhook")) {
        "Webhook"
    } else if types.iter().any(|t| t.contains("cron") || t.contains("schedule") || t.contains("interval")) {
        "Scheduled"
    } else if types.iter().any(|t| t.contains("trigger") && !t.contains("manualtrigger")) {
        "Triggered"
    } else {
        "Manual"
    }
}

pub fn complexity(node_count: usize) -> &'static str {
    match node_count {
        0..=5 => "low",
        6..=15 => "medium",
        _ => "high",
    }
}

/// Distinct service names used by the workflow, sorted
pub fn integrations(def: &WorkflowDefinition) -> Vec<String> {
    let mut services = BTreeSet::new();
    for node in &def.nodes {
        let short = short_type(node);
        if short.is_empty() {
            continue;
        }
        let base = short.trim_end_matches("Trigger").trim_end_matches("Tool");
        let base = if base.is_empty() { short } else { base };
        if UTILITY_NODES.contains(&short.to_lowercase().as_str())
            || UTILITY_NODES.contains(&base.to_lowercase().as_str())
        {
            continue;
        }
        services.insert(capitalize(base));
    }
    services.into_iter().collect()
}

pub fn analyze(def: &WorkflowDefinition, fallback_name: &str) -> WorkflowAnalysis {
    let name = def
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| fallback_name.to_string());
    let trigger = trigger_type(def);
    let integrations = integrations(def);

    let description = def.declared_description().unwrap_or_else(|| {
        let mut generated = format!("{} workflow", trigger);
        if !integrations.is_empty() {
            generated.push_str(&format!(" integrating {}", integrations.join(", ")));
        }
        generated.push_str(&format!(" with {} nodes", def.nodes.len()));
        generated
    });

    WorkflowAnalysis {
        name,
        active: def.active,
        node_count: def.nodes.len() as i64,
        trigger_type: trigger.to_string(),
        complexity: complexity(def.nodes.len()).to_string(),
        integrations,
        tags: def.tag_names(),
        description,
    }
}

/// Subdirectory an uploaded workflow is filed under
///
/// Picks the first specific service found in node types or names; webhook and
/// schedule triggers only win when nothing more specific appears.
pub fn storage_directory(def: &WorkflowDefinition) -> String {
    if def.nodes.is_empty() {
        return "Manual".to_string();
    }

    let mut primary: Option<&str> = None;
    for node in &def.nodes {
        let node_type = node.node_type.to_lowercase();
        let node_name = node.name.to_lowercase();
        let generic = |p: Option<&str>| p.map_or(true, |d| GENERIC_DIRECTORIES.contains(&d));

        if (node_type.contains("webhook") || node_name.contains("webhook")) && generic(primary) {
            primary = Some("Webhook");
        }
        if (node_type.contains("cron") || node_type.contains("schedule")) && generic(primary) {
            primary = Some("Schedule");
        }

        if generic(primary) {
            if let Some((_, dir)) = SERVICE_DIRECTORIES
                .iter()
                .find(|(key, _)| node_type.contains(key) || node_name.contains(key))
            {
                primary = Some(*dir);
            }
        }

        if !generic(primary) {
            break;
        }
    }

    match primary {
        Some(dir) if dir != "Manual" => dir.to_string(),
        _ => def
            .nodes
            .first()
            .and_then(|n| n.node_type.strip_prefix("n8n-nodes-base."))
            .and_then(|t| t.split('.').next())
            .filter(|t| !t.is_empty())
            .map(capitalize)
            .unwrap_or_else(|| "Manual".to_string()),
    }
}
