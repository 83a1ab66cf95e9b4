use crate::constants::limits::{GENERIC_TABLE_COLUMNS, TABLE_CELL_CHARS};
use crate::utils::text::truncate_chars;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

const DASH: &str = "-";

pub enum Column {
    Field(&'static str, &'static [&'static str]),
    Count(&'static str, &'static str),
    Computed(&'static str, fn(&Value) -> String),
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Field(header, _) | Column::Count(header, _) | Column::Computed(header, _) => {
                *header
            }
        }
    }

    pub fn cell(&self, item: &Value) -> String {
        match self {
            Column::Field(_, path) => text_at(item, path),
            Column::Count(_, key) => len_at(item, key),
            Column::Computed(_, render) => render(item),
        }
    }
}

pub type TableLayout = &'static [Column];

fn text_at(item: &Value, path: &[&str]) -> String {
    let mut current = item;
    for key in path {
        match current.get(*key) {
            Some(next) => current = next,
            None => return DASH.to_string(),
        }
    }
    scalar_cell(current)
}

fn len_at(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.len())
        .unwrap_or(0)
        .to_string()
}

fn scalar_cell(value: &Value) -> String {
    match value {
        Value::Null => DASH.to_string(),
        Value::String(text) if text.is_empty() => DASH.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => "[object]".to_string(),
        other => other.to_string(),
    }
}

fn droplet_public_ipv4(item: &Value) -> String {
    item.get("networks")
        .and_then(|n| n.get("v4"))
        .and_then(|v| v.as_array())
        .and_then(|nets| {
            nets.iter()
                .find(|net| net.get("type").and_then(|t| t.as_str()) == Some("public"))
        })
        .and_then(|net| net.get("ip_address"))
        .and_then(|ip| ip.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| DASH.to_string())
}

fn volume_attachments(item: &Value) -> String {
    let ids: Vec<String> = item
        .get("droplet_ids")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().map(scalar_cell).collect())
        .unwrap_or_default();
    if ids.is_empty() {
        DASH.to_string()
    } else {
        ids.join(", ")
    }
}

fn database_engine(item: &Value) -> String {
    let engine = text_at(item, &["engine"]);
    match item.get("version").and_then(|v| v.as_str()) {
        Some(version) if engine != DASH => format!("{} {}", engine, version),
        _ => engine,
    }
}

fn kubernetes_version(item: &Value) -> String {
    let slug = text_at(item, &["version_slug"]);
    if slug != DASH {
        return slug;
    }
    text_at(item, &["version"])
}

fn app_name(item: &Value) -> String {
    let name = text_at(item, &["spec", "name"]);
    if name != DASH {
        return name;
    }
    text_at(item, &["name"])
}

const DROPLET_COLUMNS: &[Column] = &[
    Column::Field("ID", &["id"]),
    Column::Field("Name", &["name"]),
    Column::Field("Status", &["status"]),
    Column::Computed("Public IPv4", droplet_public_ipv4),
    Column::Field("Region", &["region", "slug"]),
    Column::Field("Size", &["size_slug"]),
];

const VOLUME_COLUMNS: &[Column] = &[
    Column::Field("ID", &["id"]),
    Column::Field("Name", &["name"]),
    Column::Field("Size (GiB)", &["size_gigabytes"]),
    Column::Field("Region", &["region", "slug"]),
    Column::Computed("Attached To", volume_attachments),
    Column::Field("Filesystem", &["filesystem_type"]),
];

const FIREWALL_COLUMNS: &[Column] = &[
    Column::Field("ID", &["id"]),
    Column::Field("Name", &["name"]),
    Column::Field("Status", &["status"]),
    Column::Count("Inbound Rules", "inbound_rules"),
    Column::Count("Outbound Rules", "outbound_rules"),
    Column::Count("Droplets", "droplet_ids"),
];

const LOAD_BALANCER_COLUMNS: &[Column] = &[
    Column::Field("ID", &["id"]),
    Column::Field("Name", &["name"]),
    Column::Field("Status", &["status"]),
    Column::Field("IP", &["ip"]),
    Column::Field("Region", &["region", "slug"]),
    Column::Count("Droplets", "droplet_ids"),
];

const VPC_COLUMNS: &[Column] = &[
    Column::Field("ID", &["id"]),
    Column::Field("Name", &["name"]),
    Column::Field("Region", &["region"]),
    Column::Field("IP Range", &["ip_range"]),
    Column::Field("Default", &["default"]),
];

const KUBERNETES_COLUMNS: &[Column] = &[
    Column::Field("ID", &["id"]),
    Column::Field("Name", &["name"]),
    Column::Field("Status", &["status", "state"]),
    Column::Computed("Version", kubernetes_version),
    Column::Field("Region", &["region"]),
    Column::Count("Node Pools", "node_pools"),
];

const DATABASE_COLUMNS: &[Column] = &[
    Column::Field("ID", &["id"]),
    Column::Field("Name", &["name"]),
    Column::Computed("Engine", database_engine),
    Column::Field("Status", &["status"]),
    Column::Field("Region", &["region"]),
    Column::Field("Nodes", &["num_nodes"]),
    Column::Field("Size", &["size"]),
];

const APP_COLUMNS: &[Column] = &[
    Column::Field("ID", &["id"]),
    Column::Computed("Name", app_name),
    Column::Field("Region", &["region", "slug"]),
    Column::Field("Live URL", &["live_url"]),
    Column::Field("Deployment", &["active_deployment", "phase"]),
    Column::Field("Updated", &["updated_at"]),
];

pub static TABLE_LAYOUTS: Lazy<HashMap<&'static str, TableLayout>> = Lazy::new(|| {
    let entries: &[(&'static str, TableLayout)] = &[
        ("droplets", DROPLET_COLUMNS),
        ("instances", DROPLET_COLUMNS),
        ("volumes", VOLUME_COLUMNS),
        ("firewalls", FIREWALL_COLUMNS),
        ("load_balancers", LOAD_BALANCER_COLUMNS),
        ("vpcs", VPC_COLUMNS),
        ("kubernetes_clusters", KUBERNETES_COLUMNS),
        ("databases", DATABASE_COLUMNS),
        ("apps", APP_COLUMNS),
    ];
    entries.iter().copied().collect()
});

pub fn layout_for(resource: &str) -> Option<TableLayout> {
    TABLE_LAYOUTS.get(resource.trim().to_lowercase().as_str()).copied()
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn render_rows(headers: &[String], rows: Vec<Vec<String>>) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!("| {} |", headers.join(" | ")));
    lines.push(format!(
        "|{}|",
        headers.iter().map(|_| "---").collect::<Vec<_>>().join("|")
    ));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines.join("\n")
}

pub fn render_layout(layout: TableLayout, items: &[Value]) -> String {
    let headers: Vec<String> = layout.iter().map(|c| c.header().to_string()).collect();
    let rows = items
        .iter()
        .map(|item| layout.iter().map(|column| column.cell(item)).collect())
        .collect();
    render_rows(&headers, rows)
}

pub fn render_generic_table(items: &[Value]) -> String {
    let Some(first) = items.first() else {
        return String::new();
    };
    let Some(first_obj) = first.as_object() else {
        let rows = items
            .iter()
            .map(|item| vec![truncate_chars(&scalar_cell(item), TABLE_CELL_CHARS)])
            .collect();
        return render_rows(&["Value".to_string()], rows);
    };
    let keys: Vec<String> = first_obj.keys().take(GENERIC_TABLE_COLUMNS).cloned().collect();
    let rows = items
        .iter()
        .map(|item| {
            keys.iter()
                .map(|key| {
                    let cell = item
                        .get(key)
                        .map(scalar_cell)
                        .unwrap_or_else(|| DASH.to_string());
                    truncate_chars(&cell, TABLE_CELL_CHARS)
                })
                .collect()
        })
        .collect();
    render_rows(&keys, rows)
}

pub fn render_table(resource: &str, items: &[Value]) -> String {
    match layout_for(resource) {
        Some(layout) => render_layout(layout, items),
        None => render_generic_table(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn droplet_layout_extracts_public_ip_and_region() {
        let table = render_table(
            "droplets",
            &[json!({
                "id": 42,
                "name": "web-01",
                "status": "active",
                "size_slug": "s-1vcpu-1gb",
                "region": {"slug": "nyc3"},
                "networks": {"v4": [
                    {"type": "private", "ip_address": "10.0.0.2"},
                    {"type": "public", "ip_address": "203.0.113.7"}
                ]}
            })],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "| ID | Name | Status | Public IPv4 | Region | Size |");
        assert_eq!(lines[2], "| 42 | web-01 | active | 203.0.113.7 | nyc3 | s-1vcpu-1gb |");
    }

    #[test]
    fn instances_alias_uses_droplet_layout() {
        assert!(layout_for("instances").is_some());
        assert!(layout_for("Droplets").is_some());
    }

    #[test]
    fn missing_fields_render_placeholders() {
        let table = render_table("firewalls", &[json!({"id": "fw-1"})]);
        assert!(table.contains("| fw-1 | - | - | 0 | 0 | 0 |"));
    }

    #[test]
    fn generic_table_limits_columns_and_truncates() {
        let long = "y".repeat(80);
        let table = render_table(
            "snapshots",
            &[json!({
                "a": 1, "b": long, "c": {"nested": true}, "d": [1, 2],
                "e": null, "f": true, "g": "dropped"
            })],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "| a | b | c | d | e | f |");
        assert!(!lines[0].contains('g'));
        let expected = format!("| 1 | {} | [object] | [object] | - | true |", "y".repeat(50));
        assert_eq!(lines[2], expected);
    }

    #[test]
    fn generic_table_handles_scalar_items() {
        let table = render_generic_table(&[json!("nyc1"), json!("sfo3")]);
        assert!(table.starts_with("| Value |"));
        assert!(table.contains("| sfo3 |"));
    }

    #[test]
    fn pipes_are_escaped() {
        let table = render_generic_table(&[json!({"name": "a|b"})]);
        assert!(table.contains("a\\|b"));
    }
}
