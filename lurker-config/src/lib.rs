//! Loader for Lurker configuration with YAML + environment overlays.
//!
//! Sources are merged in order: YAML files and inline snippets as they were
//! added to the loader, then `LURKER__SECTION__KEY` environment variables, so
//! the environment always wins. String values may reference `${VAR}`
//! placeholders which are expanded recursively, up to a fixed depth, after
//! merging.
//!
//! ```yaml
//! server:
//!   port: 3000
//! logging:
//!   format: text
//! twitter:
//!   auth_token: "${TWITTER_BEARER_TOKEN}"
//!   target_url: "https://twitter.com/"
//!   subject_id: "44196397"
//!   count: 5
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const MAX_ITEM_COUNT: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LurkerConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub twitter: TwitterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default = "default_true")]
    pub stderr: bool,
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            dir: None,
            stderr: true,
            filter: default_log_filter(),
        }
    }
}

/// Upstream platform settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    /// Application bearer. When absent, the one scraped from the web bundle is used.
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub auth_token: Option<String>,
    /// Public page the guest session is scoped to.
    #[serde(default = "default_target_url")]
    pub target_url: String,
    #[serde(default = "default_subject_id", deserialize_with = "de_stringish")]
    pub subject_id: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeline_path")]
    pub timeline_path: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            target_url: default_target_url(),
            subject_id: default_subject_id(),
            count: default_count(),
            api_base: default_api_base(),
            timeline_path: default_timeline_path(),
        }
    }
}

impl TwitterConfig {
    /// Configured bearer, ignoring blanks and placeholders whose variable was unset.
    pub fn bearer_token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !t.contains("${"))
    }
}

impl LurkerConfig {
    /// Reject values the rest of the system cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tw = &self.twitter;
        if tw.count == 0 || tw.count > MAX_ITEM_COUNT {
            return Err(ConfigError::Message(format!(
                "twitter.count must be within 1..={MAX_ITEM_COUNT}, got {}",
                tw.count
            )));
        }
        if tw.subject_id.trim().is_empty() {
            return Err(ConfigError::Message("twitter.subject_id is empty".into()));
        }
        for (key, url) in [
            ("twitter.target_url", &tw.target_url),
            ("twitter.api_base", &tw.api_base),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Message(format!(
                    "{key} must be an http(s) URL, got {url:?}"
                )));
            }
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    3000
}
fn default_true() -> bool {
    true
}
fn default_log_format() -> String {
    "text".into()
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_target_url() -> String {
    "https://twitter.com/".into()
}
fn default_subject_id() -> String {
    "44196397".into()
}
fn default_count() -> u32 {
    5
}
fn default_api_base() -> String {
    "https://api.twitter.com".into()
}
fn default_timeline_path() -> String {
    "graphql/UserTweets".into()
}

// Env overrides are parsed, so numeric-looking ids and tokens arrive as numbers.
fn stringish(v: Value) -> Result<String, String> {
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("expected string, got {other}")),
    }
}

fn de_stringish<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    stringish(Value::deserialize(d)?).map_err(serde::de::Error::custom)
}

fn de_opt_stringish<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(None),
        v => stringish(v).map(Some).map_err(serde::de::Error::custom),
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct LurkerConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for LurkerConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LurkerConfigLoader {
    /// Start empty; `LURKER__` env overrides are layered on top in [`load`](Self::load).
    ///
    /// ```
    /// use lurker_config::LurkerConfigLoader;
    ///
    /// let config = LurkerConfigLoader::new()
    ///     .with_yaml_str("server:\n  port: 8080")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.server.port, 8080);
    /// assert_eq!(config.twitter.count, 5);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`with_file`](Self::with_file) but a missing file is skipped, so
    /// headless deployments can rely purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use lurker_config::LurkerConfigLoader;
    ///
    /// let cfg = LurkerConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// twitter:
    ///   subject_id: "783214"
    ///   count: 10
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.twitter.subject_id, "783214");
    /// assert_eq!(cfg.twitter.count, 10);
    /// assert!(cfg.twitter.bearer_token().is_none());
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use lurker_config::LurkerConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_BEARER", "injected-from-env"); }
    ///
    /// let config = LurkerConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// twitter:
    ///   auth_token: "${DOC_BEARER}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.twitter.bearer_token(), Some("injected-from-env"));
    /// assert_eq!(config.twitter.target_url, "https://twitter.com/");
    ///
    /// unsafe { std::env::remove_var("DOC_BEARER"); }
    /// ```
    pub fn load(self) -> Result<LurkerConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("LURKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: LurkerConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}
