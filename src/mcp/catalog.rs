use crate::config::ServerConfig;
use crate::errors::{ErrorCode, McpError, ToolError};
use crate::utils::suggest::suggest;
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyMode {
    #[default]
    None,
    Args,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    #[default]
    Json,
    Binary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteDef {
    pub method: String,
    pub path: String,
    pub resource: String,
    #[serde(default)]
    pub list_key: Option<String>,
    #[serde(default)]
    pub entity_key: Option<String>,
    #[serde(default)]
    pub query: Vec<String>,
    #[serde(default)]
    pub body: BodyMode,
    #[serde(default)]
    pub fixed_body: Option<Value>,
    #[serde(default)]
    pub response: ResponseKind,
    #[serde(default)]
    pub accept: Option<String>,
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([a-z0-9_]+)\}").expect("placeholder pattern compiles")
});

impl RouteDef {
    pub fn http_method(&self) -> Result<Method, ToolError> {
        Method::from_bytes(self.method.trim().to_uppercase().as_bytes())
            .map_err(|_| ToolError::internal(format!("unsupported HTTP method {}", self.method)))
    }

    pub fn placeholders(&self) -> Vec<&str> {
        PLACEHOLDER
            .captures_iter(&self.path)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    pub fn is_list(&self) -> bool {
        self.list_key.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(skip_serializing)]
    pub route: RouteDef,
}

pub struct Catalog {
    tools: Vec<ToolDef>,
    index: HashMap<String, usize>,
    validators: HashMap<String, JSONSchema>,
}

const BUILTIN_CATALOG: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tool_catalog.json"));

impl Catalog {
    pub fn builtin(config: &ServerConfig) -> Result<Self, ToolError> {
        Self::from_json(BUILTIN_CATALOG, config)
    }

    pub fn from_json(raw: &str, config: &ServerConfig) -> Result<Self, ToolError> {
        let mut tools: Vec<ToolDef> = serde_json::from_str(raw).map_err(|err| {
            ToolError::internal(format!("tool catalog is not valid JSON: {}", err))
        })?;
        let mut index = HashMap::new();
        let mut validators = HashMap::new();
        for (position, tool) in tools.iter_mut().enumerate() {
            tool.input_schema = with_common_properties(&tool.input_schema, &tool.route, config);
            let compiled = JSONSchema::compile(&tool.input_schema).map_err(|err| {
                ToolError::internal(format!("schema for {} does not compile: {}", tool.name, err))
            })?;
            validators.insert(tool.name.clone(), compiled);
            if index.insert(tool.name.clone(), position).is_some() {
                return Err(ToolError::internal(format!("duplicate tool name {}", tool.name)));
            }
        }
        Ok(Self {
            tools,
            index,
            validators,
        })
    }

    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.index.get(name).and_then(|idx| self.tools.get(*idx))
    }

    pub fn require(&self, name: &str) -> Result<&ToolDef, McpError> {
        self.get(name).ok_or_else(|| {
            let suggestions = suggest(name, self.tools.iter().map(|t| t.name.as_str()), 3);
            let mut message = format!("Unknown tool: {}", name);
            if !suggestions.is_empty() {
                message.push_str(&format!(". Did you mean: {}", suggestions.join(", ")));
            }
            McpError::new(ErrorCode::InvalidParams, message)
        })
    }

    pub fn validate_args(&self, tool_name: &str, args: &Value) -> Result<(), McpError> {
        let (Some(tool), Some(schema)) = (self.get(tool_name), self.validators.get(tool_name))
        else {
            return Ok(());
        };
        if let Err(errors) = schema.validate(args) {
            let message = format_schema_errors(tool_name, args, errors, &tool.input_schema);
            return Err(McpError::new(ErrorCode::InvalidParams, message));
        }
        Ok(())
    }

    pub fn list_tools(&self) -> Value {
        json!({ "tools": self.tools })
    }

    pub fn validate_wiring(&self) -> Result<(), ToolError> {
        let mut problems = Vec::new();
        for tool in &self.tools {
            let route = &tool.route;
            let method = match route.http_method() {
                Ok(method) => method,
                Err(err) => {
                    problems.push(format!("{}: {}", tool.name, err.message));
                    continue;
                }
            };
            if !route.path.starts_with('/') {
                problems.push(format!("{}: path must start with '/'", tool.name));
            }
            let properties = schema_properties(&tool.input_schema);
            let required = schema_required(&tool.input_schema);
            for placeholder in route.placeholders() {
                if !required.contains(placeholder) {
                    problems.push(format!(
                        "{}: path placeholder {{{}}} is not a required property",
                        tool.name, placeholder
                    ));
                }
            }
            for key in &route.query {
                if !properties.contains(key.as_str()) {
                    problems.push(format!(
                        "{}: query field '{}' is not declared",
                        tool.name, key
                    ));
                }
            }
            if route.is_list() && method != Method::GET {
                problems.push(format!("{}: list routes must use GET", tool.name));
            }
            if route.response == ResponseKind::Binary && route.is_list() {
                problems.push(format!("{}: binary routes cannot be paginated", tool.name));
            }
            if let Some(fixed) = &route.fixed_body {
                if !fixed.is_object() {
                    problems.push(format!("{}: fixed_body must be an object", tool.name));
                }
            }
        }
        if problems.is_empty() {
            return Ok(());
        }
        Err(ToolError::internal("tool catalog wiring is inconsistent")
            .with_details(Value::from(problems)))
    }
}

fn schema_properties(schema: &Value) -> HashSet<&str> {
    schema
        .get("properties")
        .and_then(|v| v.as_object())
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn schema_required(schema: &Value) -> HashSet<&str> {
    schema
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default()
}

fn with_common_properties(schema: &Value, route: &RouteDef, config: &ServerConfig) -> Value {
    let mut schema = schema.clone();
    let Some(root) = schema.as_object_mut() else {
        return schema;
    };
    let properties = root
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(props) = properties.as_object_mut() {
        props.entry("format").or_insert_with(|| {
            json!({
                "type": "string",
                "enum": ["json", "markdown"],
                "default": "json",
                "description": "Response rendering: pretty JSON or a markdown summary"
            })
        });
        if route.is_list() {
            props.entry("page").or_insert_with(|| {
                json!({
                    "type": "integer",
                    "minimum": 1,
                    "default": 1,
                    "description": "1-based page number"
                })
            });
            props.entry("per_page").or_insert_with(|| {
                json!({
                    "type": "integer",
                    "minimum": 1,
                    "maximum": config.max_page_size.max(1),
                    "default": config.page_size(None),
                    "description": "Items per page"
                })
            });
        }
    }
    schema
}

fn format_schema_errors(
    tool_name: &str,
    args: &Value,
    errors: jsonschema::ErrorIterator,
    schema: &Value,
) -> String {
    let mut rendered = Vec::new();
    let mut did_you_means = Vec::new();

    for err in errors.take(10) {
        let pointer = err.instance_path.to_string();
        let location = if pointer.is_empty() {
            "(root)".to_string()
        } else {
            pointer.clone()
        };
        match &err.kind {
            jsonschema::error::ValidationErrorKind::AdditionalProperties { unexpected } => {
                let known = schema_properties(schema);
                for unknown in unexpected {
                    rendered.push(format!("{}: unknown field '{}'", location, unknown));
                    let suggestions = suggest(unknown, known.iter().copied(), 3);
                    if !suggestions.is_empty() {
                        did_you_means.push(format!(
                            "'{}' -> {}",
                            unknown,
                            suggestions.join(", ")
                        ));
                    }
                }
            }
            jsonschema::error::ValidationErrorKind::Enum { options } => {
                let allowed: Vec<String> = options
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .map(|v| {
                                v.as_str()
                                    .map(str::to_string)
                                    .unwrap_or_else(|| v.to_string())
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                rendered.push(format!("{}: expected one of {}", location, allowed.join(", ")));
                let received = value_at(args, &pointer);
                if let Some(received) = received.and_then(|v| v.as_str()) {
                    let suggestions = suggest(received, allowed.iter().map(String::as_str), 1);
                    if let Some(best) = suggestions.first() {
                        did_you_means.push(format!("{} -> {}", location, best));
                    }
                }
            }
            jsonschema::error::ValidationErrorKind::Required { property } => {
                let prop = property
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| property.to_string());
                rendered.push(format!("{}: missing required field '{}'", location, prop));
            }
            jsonschema::error::ValidationErrorKind::Type { kind } => {
                rendered.push(format!("{}: expected {}", location, format_type_kind(kind)));
            }
            _ => rendered.push(format!("{}: {}", location, err)),
        }
    }

    let mut lines = vec![format!("Invalid arguments for {}", tool_name)];
    lines.extend(rendered.iter().map(|line| format!("- {}", line)));
    if !did_you_means.is_empty() {
        lines.push(format!("Did you mean: {}", did_you_means.join(" | ")));
    }
    lines.join("\n")
}

fn format_type_kind(kind: &jsonschema::error::TypeKind) -> String {
    match kind {
        jsonschema::error::TypeKind::Single(primitive) => primitive.to_string(),
        jsonschema::error::TypeKind::Multiple(types) => {
            let list: Vec<String> = (*types).into_iter().map(|t| t.to_string()).collect();
            list.join(" | ")
        }
    }
}

fn value_at<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    if pointer.is_empty() {
        Some(root)
    } else {
        root.pointer(pointer)
    }
}
