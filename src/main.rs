use clap::Parser;
use digitalocean_mcp::app::App;
use digitalocean_mcp::config::{ServerConfig, Transport};
use digitalocean_mcp::errors::ToolError;
use digitalocean_mcp::mcp::{http, server};
use digitalocean_mcp::services::logger::{init_tracing, LogLevel};

async fn run(config: ServerConfig) -> Result<(), ToolError> {
    let transport = config.transport;
    let app = App::initialize(config)?;
    match transport {
        Transport::Stdio => server::run_stdio(&app).await,
        Transport::Http => http::serve(&app).await,
    }
}

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();
    init_tracing(LogLevel::parse(&config.log_level));
    if let Err(err) = run(config).await {
        eprintln!("digitalocean-mcp: {}", err);
        if let Some(details) = &err.details {
            eprintln!("{}", details);
        }
        std::process::exit(1);
    }
}
