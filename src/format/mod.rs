pub mod tables;

use crate::errors::ToolError;
use crate::utils::pagination::PageDescriptor;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Markdown,
}

impl ResponseFormat {
    pub fn from_arg(value: Option<&Value>) -> Result<Self, ToolError> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(ResponseFormat::Json);
        };
        match value.as_str().map(|s| s.trim().to_lowercase()).as_deref() {
            Some("") | Some("json") => Ok(ResponseFormat::Json),
            Some("markdown") | Some("md") => Ok(ResponseFormat::Markdown),
            _ => Err(ToolError::invalid_params("format: expected one of json, markdown")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Page(PageDescriptor<Value>),
    Value(Value),
}

pub fn render(output: &ToolOutput, format: ResponseFormat, resource: &str) -> String {
    match format {
        ResponseFormat::Json => render_json(output),
        ResponseFormat::Markdown => render_markdown(output, resource),
    }
}

pub fn render_json(output: &ToolOutput) -> String {
    serde_json::to_string_pretty(output).unwrap_or_else(|_| "null".to_string())
}

pub fn render_markdown(output: &ToolOutput, resource: &str) -> String {
    match output {
        ToolOutput::Page(page) => render_page(page, resource),
        ToolOutput::Value(Value::Array(items)) => {
            if items.is_empty() {
                "_No items found._".to_string()
            } else {
                tables::render_generic_table(items)
            }
        }
        ToolOutput::Value(Value::Object(map)) => render_entity(map, resource),
        ToolOutput::Value(Value::String(text)) => text.clone(),
        ToolOutput::Value(other) => other.to_string(),
    }
}

fn render_page(page: &PageDescriptor<Value>, resource: &str) -> String {
    let mut lines = vec![format!("## {}", title_case(resource)), String::new()];
    let summary = match page.total() {
        Some(total) => format!("**Total:** {} | **Showing:** {}", total, page.count()),
        None => format!("**Showing:** {}", page.count()),
    };
    lines.push(summary);
    if page.has_more() {
        match page.next_page() {
            Some(next) => lines.push(format!("**More results available.** Next page: {}", next)),
            None => lines.push("**More results available.**".to_string()),
        }
    }
    lines.push(String::new());
    if page.is_empty() {
        lines.push(format!("_No {} found._", humanize(resource)));
    } else {
        lines.push(tables::render_table(resource, page.items()));
    }
    lines.join("\n")
}

fn render_entity(map: &serde_json::Map<String, Value>, resource: &str) -> String {
    let mut lines = vec![format!("## {}", title_case(&singularize(resource))), String::new()];
    for (key, value) in map {
        match value {
            Value::Null => continue,
            Value::Object(_) | Value::Array(_) => {
                let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
                lines.push(format!("**{}:**", key));
                lines.push("```json".to_string());
                lines.push(pretty);
                lines.push("```".to_string());
            }
            Value::String(text) => lines.push(format!("**{}:** {}", key, text)),
            other => lines.push(format!("**{}:** {}", key, other)),
        }
    }
    lines.join("\n")
}

fn humanize(tag: &str) -> String {
    tag.trim().replace(['_', '-'], " ").to_lowercase()
}

const ACRONYMS: &[&str] = &["vpc", "vpcs", "ssh", "cdn", "cdns", "ip", "ips", "dns", "id"];

fn title_case(tag: &str) -> String {
    let words: Vec<String> = humanize(tag)
        .split_whitespace()
        .map(|word| {
            if ACRONYMS.contains(&word) {
                match word.strip_suffix('s') {
                    Some(stem) if ACRONYMS.contains(&stem) => format!("{}s", stem.to_uppercase()),
                    _ => word.to_uppercase(),
                }
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect();
    if words.is_empty() {
        "Result".to_string()
    } else {
        words.join(" ")
    }
}

fn singularize(tag: &str) -> String {
    let trimmed = tag.trim();
    if let Some(stem) = trimmed.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    if trimmed.ends_with("sses") || trimmed.ends_with("xes") {
        return trimmed[..trimmed.len() - 2].to_string();
    }
    if trimmed.ends_with('s') && !trimmed.ends_with("ss") {
        return trimmed[..trimmed.len() - 1].to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_arg_parsing() {
        assert_eq!(ResponseFormat::from_arg(None).unwrap(), ResponseFormat::Json);
        assert_eq!(
            ResponseFormat::from_arg(Some(&json!("Markdown"))).unwrap(),
            ResponseFormat::Markdown
        );
        assert!(ResponseFormat::from_arg(Some(&json!("yaml"))).is_err());
    }

    #[test]
    fn json_mode_pretty_prints_pages_and_values() {
        let page = PageDescriptor::new(vec![json!({"id": 1})], Some(5), None);
        let text = render(&ToolOutput::Page(page), ResponseFormat::Json, "droplets");
        let parsed: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(parsed["count"], 1);
        assert_eq!(parsed["total"], 5);
        assert!(text.contains("\n  "));

        let text = render(&ToolOutput::Value(Value::Null), ResponseFormat::Json, "x");
        assert_eq!(text, "null");
    }

    #[test]
    fn empty_page_emits_no_items_notice_without_table() {
        let page = PageDescriptor::new(Vec::new(), Some(0), None);
        let text = render(&ToolOutput::Page(page), ResponseFormat::Markdown, "load_balancers");
        assert!(text.starts_with("## Load Balancers"));
        assert!(text.contains("_No load balancers found._"));
        assert!(!text.contains("| ID |"));
    }

    #[test]
    fn page_summary_reports_next_page() {
        let page = PageDescriptor::new(
            vec![json!({"id": "v1", "name": "data"})],
            Some(50),
            Some("https://api.digitalocean.com/v2/vpcs?page=3"),
        );
        let text = render(&ToolOutput::Page(page), ResponseFormat::Markdown, "vpcs");
        assert!(text.starts_with("## VPCs"));
        assert!(text.contains("**Total:** 50 | **Showing:** 1"));
        assert!(text.contains("Next page: 3"));
        assert!(text.contains("| ID | Name | Region | IP Range | Default |"));
    }

    #[test]
    fn page_with_unknown_next_page_still_signals_more() {
        let page = PageDescriptor::new(vec![json!({"id": 1})], None, Some("::bad::"));
        let text = render(&ToolOutput::Page(page), ResponseFormat::Markdown, "tags");
        assert!(text.contains("**Showing:** 1"));
        assert!(text.contains("**More results available.**"));
        assert!(!text.contains("Next page"));
    }

    #[test]
    fn entity_omits_nulls_and_fences_nested_values() {
        let entity = json!({
            "id": 7,
            "name": "db-main",
            "connection": {"host": "db.internal", "port": 25060},
            "maintenance_window": null
        });
        let text = render(&ToolOutput::Value(entity), ResponseFormat::Markdown, "databases");
        assert!(text.starts_with("## Database"));
        assert!(text.contains("**id:** 7"));
        assert!(text.contains("**name:** db-main"));
        assert!(!text.contains("maintenance_window"));
        assert!(text.contains("**connection:**\n```json\n{"));
        assert!(text.contains("\"host\": \"db.internal\""));
        assert!(text.trim_end().ends_with("```"));
    }

    #[test]
    fn bare_arrays_ignore_the_resource_tag() {
        let text = render(
            &ToolOutput::Value(json!([{"slug": "nyc1", "available": true}])),
            ResponseFormat::Markdown,
            "droplets",
        );
        assert!(text.starts_with("| slug | available |"));
    }

    #[test]
    fn scalars_are_stringified() {
        let text = render(
            &ToolOutput::Value(json!("-----BEGIN CERTIFICATE-----")),
            ResponseFormat::Markdown,
            "databases",
        );
        assert_eq!(text, "-----BEGIN CERTIFICATE-----");
        let text = render(&ToolOutput::Value(json!(42)), ResponseFormat::Markdown, "x");
        assert_eq!(text, "42");
    }

    #[test]
    fn markdown_does_not_mutate_input() {
        let output = ToolOutput::Value(json!({"a": null, "b": [1]}));
        let before = output.clone();
        let _ = render(&output, ResponseFormat::Markdown, "things");
        assert_eq!(output, before);
    }

    #[test]
    fn heading_helpers() {
        assert_eq!(title_case("kubernetes_clusters"), "Kubernetes Clusters");
        assert_eq!(title_case("ssh_keys"), "SSH Keys");
        assert_eq!(singularize("policies"), "policy");
        assert_eq!(singularize("droplets"), "droplet");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(title_case(&singularize("reserved_ips")), "Reserved IP");
    }
}
