mod settings;

pub use settings::{
    ChatConfig, FilterConfig, LogConfig, LogFormat, ServerConfig, Settings, WebSocketConfig,
};
