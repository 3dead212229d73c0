use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Directory served for every path that is not an API or WebSocket route
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Heartbeat interval in seconds (server sends heartbeat frame)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,
    /// Connection timeout in seconds (disconnect if no activity)
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// Cleanup task interval in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    /// Frames buffered per connection before new ones are dropped
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Sender name on welcome, joined, and left notices
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
    /// Location links are `{maps_base_url}?q={lat},{lon}`
    #[serde(default = "default_maps_base_url")]
    pub maps_base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Words added to the built-in dictionary
    #[serde(default)]
    pub extra_words: Vec<String>,
    /// Built-in words to accept anyway
    #[serde(default)]
    pub allowed_words: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_heartbeat_interval() -> u64 {
    30 // 30 seconds
}

fn default_connection_timeout() -> u64 {
    120 // 2 minutes
}

fn default_cleanup_interval() -> u64 {
    60 // 1 minute
}

fn default_outbound_buffer() -> usize {
    64
}

fn default_max_connections() -> usize {
    10_000
}

fn default_admin_name() -> String {
    "Admin".to_string()
}

fn default_maps_base_url() -> String {
    "https://google.com/maps".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        Self::builder()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // CHAT__SERVER__PORT, CHAT__CHAT__ADMIN_NAME, CHAT__FILTER__EXTRA_WORDS=a,b ...
            .add_source(
                Environment::with_prefix("CHAT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .with_list_parse_key("filter.extra_words")
                    .with_list_parse_key("filter.allowed_words"),
            )
            // Plain PORT wins, as hosting platforms set it
            .set_override_option("server.port", env::var("PORT").ok())?
            .build()?
            .try_deserialize()
    }

    /// Builder seeded with defaults, before any file or environment source
    pub fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("server.public_dir", default_public_dir())?
            .set_default("websocket.heartbeat_interval", default_heartbeat_interval() as i64)?
            .set_default("websocket.connection_timeout", default_connection_timeout() as i64)?
            .set_default("websocket.cleanup_interval", default_cleanup_interval() as i64)?
            .set_default("websocket.outbound_buffer", default_outbound_buffer() as i64)?
            .set_default("websocket.max_connections", default_max_connections() as i64)?
            .set_default("chat.admin_name", default_admin_name())?
            .set_default("chat.maps_base_url", default_maps_base_url())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            public_dir: default_public_dir(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: default_heartbeat_interval(),
            connection_timeout: default_connection_timeout(),
            cleanup_interval: default_cleanup_interval(),
            outbound_buffer: default_outbound_buffer(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            admin_name: default_admin_name(),
            maps_base_url: default_maps_base_url(),
        }
    }
}
