pub mod provider {
    pub const DEFAULT_BASE_URL: &str = "https://api.digitalocean.com/v2";
    pub const TOKEN_HEADER: &str = "x-digitalocean-token";
    pub const BASE_URL_HEADER: &str = "x-digitalocean-base-url";
    pub const TOKEN_ENV_KEYS: &[&str] = &["DIGITALOCEAN_TOKEN", "DIGITALOCEAN_API_TOKEN"];
    pub const BASE_URL_ENV_KEY: &str = "DIGITALOCEAN_BASE_URL";
    pub const USER_AGENT: &str = concat!("digitalocean-mcp/", env!("CARGO_PKG_VERSION"));
}

pub mod network {
    pub const TIMEOUT_API_REQUEST_MS: u64 = 30_000;
    pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
}

pub mod retry {
    pub const RETRY_AFTER_DEFAULT_SECS: u64 = 60;
}

pub mod pagination {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 200;
}

pub mod limits {
    pub const RESPONSE_CHAR_LIMIT: usize = 25_000;
    pub const TABLE_CELL_CHARS: usize = 50;
    pub const GENERIC_TABLE_COLUMNS: usize = 6;
    pub const ERROR_BODY_PREVIEW_BYTES: usize = 512;
}
