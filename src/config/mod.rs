// src/config/mod.rs
pub mod watch;

pub use watch::{
    load_config_default, load_config_from, AppConfig, ChannelKind, ConfigError,
    NotificationConfig, PathsConfig, RedditConfig, SlackConfig, SourceConfig, SupervisorConfig,
    TelegramConfig,
};
