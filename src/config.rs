use crate::constants::{limits, network, pagination, provider, retry};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "digitalocean-mcp", version, about = "DigitalOcean API tools over MCP")]
pub struct ServerConfig {
    #[arg(long, env = "DO_MCP_TRANSPORT", value_enum, default_value_t = Transport::Stdio)]
    pub transport: Transport,

    #[arg(long, env = "DO_MCP_BIND", default_value = network::DEFAULT_BIND)]
    pub bind: String,

    /// API root used when a tenant does not override it.
    #[arg(long, env = "DO_MCP_DEFAULT_BASE_URL", default_value = provider::DEFAULT_BASE_URL)]
    pub default_base_url: String,

    #[arg(long, env = "DO_MCP_DEFAULT_PAGE_SIZE", default_value_t = pagination::DEFAULT_PAGE_SIZE)]
    pub default_page_size: u32,

    #[arg(long, env = "DO_MCP_MAX_PAGE_SIZE", default_value_t = pagination::MAX_PAGE_SIZE)]
    pub max_page_size: u32,

    #[arg(
        long,
        env = "DO_MCP_RESPONSE_CHAR_LIMIT",
        default_value_t = limits::RESPONSE_CHAR_LIMIT
    )]
    pub response_char_limit: usize,

    #[arg(
        long,
        env = "DO_MCP_REQUEST_TIMEOUT_MS",
        default_value_t = network::TIMEOUT_API_REQUEST_MS
    )]
    pub request_timeout_ms: u64,

    /// Wait hint reported for a 429 without a usable Retry-After header.
    #[arg(
        long,
        env = "DO_MCP_RETRY_AFTER_DEFAULT_SECS",
        default_value_t = retry::RETRY_AFTER_DEFAULT_SECS
    )]
    pub retry_after_default_secs: u64,

    /// Mark 5xx API errors as retryable.
    #[arg(long, env = "DO_MCP_RETRY_5XX", default_value_t = false)]
    pub retry_5xx: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            bind: network::DEFAULT_BIND.to_string(),
            default_base_url: provider::DEFAULT_BASE_URL.to_string(),
            default_page_size: pagination::DEFAULT_PAGE_SIZE,
            max_page_size: pagination::MAX_PAGE_SIZE,
            response_char_limit: limits::RESPONSE_CHAR_LIMIT,
            request_timeout_ms: network::TIMEOUT_API_REQUEST_MS,
            retry_after_default_secs: retry::RETRY_AFTER_DEFAULT_SECS,
            retry_5xx: false,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            default_base_url: self.default_base_url.trim_end_matches('/').to_string(),
            request_timeout_ms: self.request_timeout_ms,
            retry_after_default_secs: self.retry_after_default_secs,
            retry_5xx: self.retry_5xx,
        }
    }

    pub fn page_size(&self, requested: Option<u64>) -> u32 {
        let max = self.max_page_size.max(1);
        match requested {
            Some(value) => value.clamp(1, max as u64) as u32,
            None => self.default_page_size.clamp(1, max),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_base_url: String,
    pub request_timeout_ms: u64,
    pub retry_after_default_secs: u64,
    pub retry_5xx: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        ServerConfig::default().engine()
    }
}
