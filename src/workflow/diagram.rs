/// Mermaid flowchart rendering for workflow definitions

use crate::workflow::types::WorkflowNode;
use serde_json::{Map, Value};
use std::collections::HashMap;

fn node_style(short_type: &str) -> &'static str {
    let t = short_type.to_lowercase();
    if ["trigger", "webhook", "cron"].iter().any(|k| t.contains(k)) {
        "fill:#b3e0ff,stroke:#0066cc"
    } else if ["if", "switch"].iter().any(|k| t.contains(k)) {
        "fill:#ffffb3,stroke:#e6e600"
    } else if ["function", "code"].iter().any(|k| t.contains(k)) {
        "fill:#d9b3ff,stroke:#6600cc"
    } else if t.contains("error") {
        "fill:#ffb3b3,stroke:#cc0000"
    } else {
        "fill:#d9d9d9,stroke:#666666"
    }
}

/// Render `graph TD` source for the nodes and their `main` connections
///
/// Connections to or from unknown node names are dropped. Edges carry their output
/// index as a label when the source node has more than one output.
pub fn mermaid(nodes: &[WorkflowNode], connections: &Map<String, Value>) -> String {
    if nodes.is_empty() {
        return "graph TD\n  EmptyWorkflow[No nodes found in workflow]".to_string();
    }

    let mut ids: HashMap<&str, String> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        ids.insert(node.name.as_str(), format!("node{}", i));
    }

    let mut lines = vec!["graph TD".to_string()];

    for node in nodes {
        let id = &ids[node.name.as_str()];
        let short = node.node_type.replace("n8n-nodes-base.", "");
        let display = if node.name.is_empty() { "Unnamed" } else { node.name.as_str() };
        let label = format!("{}<br>({})", display.replace('"', "'"), short.replace('"', "'"));
        lines.push(format!("  {}[\"{}\"]", id, label));
        lines.push(format!("  style {} {}", id, node_style(&short)));
    }

    for (source, outputs) in connections {
        let Some(source_id) = ids.get(source.as_str()) else {
            continue;
        };
        let Some(main) = outputs.get("main").and_then(|m| m.as_array()) else {
            continue;
        };

        for (index, output) in main.iter().enumerate() {
            let Some(targets) = output.as_array() else {
                continue;
            };
            for target in targets {
                let Some(target_id) = target
                    .get("node")
                    .and_then(|n| n.as_str())
                    .and_then(|n| ids.get(n))
                else {
                    continue;
                };
                let arrow = if main.len() > 1 {
                    format!(" -->|{}| ", index)
                } else {
                    " --> ".to_string()
                };
                lines.push(format!("  {}{}{}", source_id, arrow, target_id));
            }
        }
    }

    lines.join("\n")
}
