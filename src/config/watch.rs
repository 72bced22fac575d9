// src/config/watch.rs
//! Watcher configuration: sources with their filters, the notification
//! channel(s) and credentials, supervisor timings and output paths.
//!
//! Loaded once at startup from TOML or JSON; any failure here is fatal.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::analyze::Filter;

pub const ENV_CONFIG_PATH: &str = "POSTWATCH_CONFIG";

#[cfg(not(feature = "dry-run"))]
const DEFAULT_STEM: &str = "config/postwatch";
#[cfg(feature = "dry-run")]
const DEFAULT_STEM: &str = "config/postwatch.test";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0} (create it from config/postwatch.example.toml)")]
    Missing(PathBuf),

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not formatted correctly: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("environment variable '{0}' referenced by config is not set")]
    Env(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Print result lines only; no transports, history or log files.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(alias = "notifications")]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_addr: Option<SocketAddr>,
    /// Ordered: sources are polled in file order.
    #[serde(alias = "search")]
    pub sources: IndexMap<String, SourceConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default, alias = "clientId")]
    pub client_id: Option<String>,
    #[serde(default, alias = "clientSecret")]
    pub client_secret: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Prefixed to relative permalinks.
    #[serde(default = "default_domain")]
    pub domain: String,
}

fn default_user_agent() -> String {
    format!("postwatch/{}", env!("CARGO_PKG_VERSION"))
}
fn default_page_size() -> usize {
    5
}
fn default_domain() -> String {
    "https://reddit.com".to_string()
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            user_agent: default_user_agent(),
            page_size: default_page_size(),
            domain: default_domain(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Slack,
    Telegram,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(ChannelKind),
    Many(Vec<ChannelKind>),
}

fn de_channels<'de, D>(d: D) -> Result<Vec<ChannelKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(d)? {
        OneOrMany::One(c) => vec![c],
        OneOrMany::Many(v) => v.into_iter().fold(Vec::new(), |mut acc, c| {
            if !acc.contains(&c) {
                acc.push(c);
            }
            acc
        }),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(alias = "app", deserialize_with = "de_channels")]
    pub channel: Vec<ChannelKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(alias = "webhook-url")]
    pub webhook_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub token: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Pause after each source, in milliseconds.
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
    /// Unset = restart forever.
    #[serde(default)]
    pub max_restarts: Option<u32>,
    /// 0 disables the deadline.
    #[serde(default = "default_eval_timeout_ms")]
    pub evaluation_timeout_ms: u64,
    /// Keep watermarks across supervised restarts instead of resetting to now.
    #[serde(default)]
    pub preserve_watermarks_on_restart: bool,
}

fn default_poll_delay_ms() -> u64 {
    1_100
}
fn default_restart_delay_secs() -> u64 {
    5
}
fn default_eval_timeout_ms() -> u64 {
    5_000
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_delay_ms: default_poll_delay_ms(),
            restart_delay_secs: default_restart_delay_secs(),
            max_restarts: None,
            evaluation_timeout_ms: default_eval_timeout_ms(),
            preserve_watermarks_on_restart: false,
        }
    }
}

impl SupervisorConfig {
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    pub fn evaluation_timeout(&self) -> Option<Duration> {
        (self.evaluation_timeout_ms > 0).then(|| Duration::from_millis(self.evaluation_timeout_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_results_log")]
    pub results_log: PathBuf,
    #[serde(default = "default_errors_log")]
    pub errors_log: PathBuf,
    #[serde(default = "default_history_db")]
    pub history_db: PathBuf,
}

fn default_results_log() -> PathBuf {
    PathBuf::from("results.log")
}
fn default_errors_log() -> PathBuf {
    PathBuf::from("errors.log")
}
fn default_history_db() -> PathBuf {
    PathBuf::from("results.db")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_log: default_results_log(),
            errors_log: default_errors_log(),
            history_db: default_history_db(),
        }
    }
}

impl AppConfig {
    /// Dry-run is on when the file says so or the crate was built with `dry-run`.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run || cfg!(feature = "dry-run")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("no sources configured".into()));
        }
        if let Some(id) = self.sources.keys().find(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("empty source id {id:?}")));
        }
        if !(1..=100).contains(&self.reddit.page_size) {
            return Err(ConfigError::Invalid(format!(
                "reddit.page_size must be within 1..=100, got {}",
                self.reddit.page_size
            )));
        }
        if self.notification.channel.is_empty() {
            return Err(ConfigError::Invalid("notification.channel is empty".into()));
        }
        for ch in &self.notification.channel {
            match ch {
                ChannelKind::Slack => match &self.notification.slack {
                    Some(s) if !s.webhook_url.trim().is_empty() => {}
                    _ => {
                        return Err(ConfigError::Invalid(
                            "channel slack selected but notification.slack.webhook_url is missing"
                                .into(),
                        ))
                    }
                },
                ChannelKind::Telegram => match &self.notification.telegram {
                    Some(t) if !t.token.trim().is_empty() => {}
                    _ => {
                        return Err(ConfigError::Invalid(
                            "channel telegram selected but notification.telegram.token is missing"
                                .into(),
                        ))
                    }
                },
            }
        }
        Ok(())
    }

    fn resolve_secrets(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = self.reddit.client_id.as_mut() {
            *v = resolve_env(v)?;
        }
        if let Some(v) = self.reddit.client_secret.as_mut() {
            *v = resolve_env(v)?;
        }
        // Only the selected channels need their credentials.
        let channels = &self.notification.channel;
        if channels.contains(&ChannelKind::Slack) {
            if let Some(s) = self.notification.slack.as_mut() {
                s.webhook_url = resolve_env(&s.webhook_url)?;
            }
        }
        if channels.contains(&ChannelKind::Telegram) {
            if let Some(t) = self.notification.telegram.as_mut() {
                t.token = resolve_env(&t.token)?;
            }
        }
        Ok(())
    }
}

/// `${NAME}` is replaced by the value of env var `NAME`; anything else is literal.
pub fn resolve_env(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    match trimmed
        .strip_prefix("${")
        .and_then(|s| s.strip_suffix('}'))
    {
        Some(name) => env::var(name).map_err(|_| ConfigError::Env(name.to_string())),
        None => Ok(value.to_string()),
    }
}

/// Load, resolve and validate a config file. TOML or JSON by extension.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut cfg = parse_config(&content, &ext).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    cfg.resolve_secrets()?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the config path and load it:
/// 1) $POSTWATCH_CONFIG
/// 2) config/postwatch.toml
/// 3) config/postwatch.json
///
/// With feature `dry-run` the fallbacks are `config/postwatch.test.{toml,json}`.
pub fn load_config_default() -> Result<(PathBuf, AppConfig), ConfigError> {
    if let Ok(p) = env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        let cfg = load_config_from(&pb)?;
        return Ok((pb, cfg));
    }
    let toml_p = PathBuf::from(format!("{DEFAULT_STEM}.toml"));
    if toml_p.exists() {
        let cfg = load_config_from(&toml_p)?;
        return Ok((toml_p, cfg));
    }
    let json_p = PathBuf::from(format!("{DEFAULT_STEM}.json"));
    let cfg = load_config_from(&json_p)?;
    Ok((json_p, cfg))
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig, String> {
    match hint_ext {
        "toml" => toml::from_str(s).map_err(|e| e.to_string()),
        "json" => serde_json::from_str(s).map_err(|e| e.to_string()),
        _ => serde_json::from_str(s)
            .or_else(|json_err| {
                toml::from_str(s).map_err(|toml_err| format!("json: {json_err}; toml: {toml_err}"))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[notification]
channel = "slack"

[notification.slack]
webhook_url = "https://hooks.slack.test/x"

[sources.rust]
filters = [
  { includes = ["release"], except = ["beta"], notify = ["U1"] },
]

[sources.golang]
filters = []
"#;

    #[test]
    fn toml_defaults_and_order() {
        let cfg = parse_config(MINIMAL, "toml").unwrap();
        assert_eq!(cfg.reddit.page_size, 5);
        assert_eq!(cfg.reddit.domain, "https://reddit.com");
        assert_eq!(cfg.supervisor.poll_delay(), Duration::from_millis(1_100));
        assert_eq!(
            cfg.supervisor.evaluation_timeout(),
            Some(Duration::from_millis(5_000))
        );
        assert_eq!(cfg.notification.channel, vec![ChannelKind::Slack]);
        let ids: Vec<_> = cfg.sources.keys().cloned().collect();
        assert_eq!(ids, vec!["rust", "golang"]);
        assert_eq!(cfg.sources["rust"].filters[0].except, vec!["beta"]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn repeated_channels_collapse_in_order() {
        let toml = MINIMAL.replace(
            r#"channel = "slack""#,
            r#"channel = ["telegram", "slack", "telegram", "slack"]"#,
        );
        let cfg = parse_config(&toml, "toml").unwrap();
        assert_eq!(
            cfg.notification.channel,
            vec![ChannelKind::Telegram, ChannelKind::Slack]
        );
    }

    #[test]
    fn legacy_json_keys_are_accepted() {
        let json = r#"{
            "reddit": { "clientId": "id", "clientSecret": "secret" },
            "notifications": {
                "app": "telegram",
                "telegram": { "token": "123:abc" }
            },
            "search": {
                "buildapcsales": { "filters": [ { "includes": ["gpu"], "except": ["prebuilt"], "notify": ["42"] } ] }
            }
        }"#;
        let cfg = parse_config(json, "json").unwrap();
        assert_eq!(cfg.reddit.client_id.as_deref(), Some("id"));
        assert_eq!(cfg.notification.channel, vec![ChannelKind::Telegram]);
        assert_eq!(
            cfg.notification.telegram.as_ref().unwrap().api_base,
            "https://api.telegram.org"
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn selected_channel_needs_credentials() {
        let mut cfg = parse_config(MINIMAL, "toml").unwrap();
        cfg.notification.channel = vec![ChannelKind::Slack, ChannelKind::Telegram];
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("telegram"));
    }

    #[test]
    fn page_size_bounds() {
        let mut cfg = parse_config(MINIMAL, "toml").unwrap();
        cfg.reddit.page_size = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let s = SupervisorConfig {
            evaluation_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(s.evaluation_timeout(), None);
    }

    #[test]
    fn literal_values_pass_through() {
        assert_eq!(resolve_env("plain").unwrap(), "plain");
        assert!(matches!(
            resolve_env("${POSTWATCH_SURELY_UNSET_VAR}"),
            Err(ConfigError::Env(_))
        ));
    }
}
