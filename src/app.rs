use crate::config::ServerConfig;
use crate::errors::ToolError;
use crate::mcp::catalog::Catalog;
use crate::services::api_client::build_http_client;
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolExecutor;
use serde_json::json;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub config: Arc<ServerConfig>,
    pub catalog: Arc<Catalog>,
    pub executor: ToolExecutor,
}

impl App {
    fn validate_config(config: &ServerConfig) -> Result<(), ToolError> {
        let mut problems = Vec::new();
        if config.max_page_size == 0 {
            problems.push("max_page_size must be at least 1");
        }
        if config.default_page_size == 0 {
            problems.push("default_page_size must be at least 1");
        }
        if config.request_timeout_ms == 0 {
            problems.push("request_timeout_ms must be positive");
        }
        if url::Url::parse(&config.default_base_url).is_err() {
            problems.push("default_base_url is not a valid URL");
        }
        if problems.is_empty() {
            return Ok(());
        }
        Err(ToolError::invalid_params("Invalid server configuration")
            .with_details(json!({ "problems": problems })))
    }

    pub fn initialize(config: ServerConfig) -> Result<Self, ToolError> {
        let logger = Logger::new("digitalocean-mcp");
        Self::validate_config(&config)?;

        let catalog = Arc::new(Catalog::builtin(&config)?);
        catalog.validate_wiring().map_err(|err| {
            err.with_hint("every {param} in a route path must be a required schema property")
        })?;

        let config = Arc::new(config);
        let executor = ToolExecutor::from_catalog(
            logger.clone(),
            config.clone(),
            build_http_client()?,
            &catalog,
        );

        logger.info(
            "initialized",
            Some(&json!({
                "tools": catalog.len(),
                "transport": format!("{:?}", config.transport).to_lowercase(),
                "default_base_url": config.default_base_url,
            })),
        );

        Ok(Self {
            logger,
            config,
            catalog,
            executor,
        })
    }
}
