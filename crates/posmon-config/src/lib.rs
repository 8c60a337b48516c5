//! Configuration for the posmon CLI.
//!
//! TOML file plus `POSMON_` environment overrides, API key resolution
//! (env var, keyring, plaintext), and translation to
//! `posmon_core::MonitorConfig`. Core never reads files; it receives a
//! pre-built `MonitorConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{ProjectDirs, UserDirs};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use posmon_core::MonitorConfig;
use posmon_core::config::DEFAULT_URL;
use posmon_core::dispatcher::DEFAULT_EXPORT_MASK;

/// Keyring service name holding the API key.
pub const KEYRING_SERVICE: &str = "posmon";
/// Keyring entry name holding the API key.
pub const KEYRING_ENTRY: &str = "api-key";
/// Environment variable the agent's own tooling reads the key from.
pub const DEFAULT_API_KEY_ENV: &str = "SMARTPOS_USB_APIKEY";
/// File name used when no export path is configured.
pub const DEFAULT_EXPORT_FILE: &str = "smartpos_usb_export.zip";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Presentation defaults, overridable by CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// How to reach the agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Agent base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// API key (plaintext -- prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key. Empty disables the lookup.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Export download timeout in seconds.
    #[serde(default = "default_export_timeout")]
    pub export_timeout: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout: default_timeout(),
            export_timeout: default_export_timeout(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.into()
}
fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.into()
}
fn default_timeout() -> u64 {
    3
}
fn default_export_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollConfig {
    /// Seconds between status polls.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    4
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Comma-separated categories: `db`, `logs`, `traces`.
    #[serde(default = "default_mask")]
    pub mask: String,

    /// Where `export` writes the archive when `--out` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mask: default_mask(),
            path: None,
        }
    }
}

fn default_mask() -> String {
    DEFAULT_EXPORT_MASK.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "smartpos-tools", "posmon").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("posmon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("POSMON_").split("__"))
}

/// Load the full Config from file + environment.
///
/// Environment overrides use a double underscore between section and key,
/// e.g. `POSMON_SERVICE__URL` or `POSMON_POLL__INTERVAL_SECS`.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path (missing files are fine).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|e| {
        debug!(error = %e, "falling back to default config");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── API key resolution ──────────────────────────────────────────────

/// Where the effective API key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Flag,
    Env(String),
    Keyring,
    ConfigFile,
    None,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flag => f.write_str("command-line flag"),
            Self::Env(name) => write!(f, "environment variable {name}"),
            Self::Keyring => f.write_str("system keyring"),
            Self::ConfigFile => f.write_str("config file (plaintext)"),
            Self::None => f.write_str("not set (requests are unauthenticated)"),
        }
    }
}

/// Pick the first non-blank candidate, in chain order.
fn first_key(
    candidates: impl IntoIterator<Item = (Option<String>, KeySource)>,
) -> (Option<SecretString>, KeySource) {
    candidates
        .into_iter()
        .find_map(|(value, source)| {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| (Some(SecretString::from(v)), source))
        })
        .unwrap_or((None, KeySource::None))
}

fn keyring_entry() -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, KEYRING_ENTRY)?)
}

fn keyring_key() -> Option<String> {
    keyring_entry().ok()?.get_password().ok()
}

/// Resolve the API key: explicit flag, env var named by `api_key_env`,
/// system keyring, plaintext config. No key at all is allowed; the agent
/// then sees unauthenticated requests.
pub fn resolve_api_key(
    flag: Option<&str>,
    service: &ServiceConfig,
) -> (Option<SecretString>, KeySource) {
    let env_name = service.api_key_env.trim();
    let env_value = if env_name.is_empty() {
        None
    } else {
        std::env::var(env_name).ok()
    };

    let explicit = first_key([
        (flag.map(str::to_owned), KeySource::Flag),
        (env_value, KeySource::Env(env_name.to_owned())),
    ]);
    if explicit.0.is_some() {
        return explicit;
    }
    // Only touch the keyring when nothing explicit was given.
    first_key([
        (keyring_key(), KeySource::Keyring),
        (service.api_key.clone(), KeySource::ConfigFile),
    ])
}

/// Store the API key in the system keyring.
pub fn store_api_key(secret: &str) -> Result<(), ConfigError> {
    if secret.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }
    keyring_entry()?.set_password(secret.trim())?;
    Ok(())
}

// ── Translation to core config ──────────────────────────────────────

/// Build a `MonitorConfig` from file config and an already-resolved key.
pub fn to_monitor_config(
    cfg: &Config,
    api_key: Option<SecretString>,
) -> Result<MonitorConfig, ConfigError> {
    let url = parse_service_url(&cfg.service.url)?;

    let positive = |field: &str, secs: u64| {
        if secs == 0 {
            Err(ConfigError::Validation {
                field: field.into(),
                reason: "must be at least 1 second".into(),
            })
        } else {
            Ok(Duration::from_secs(secs))
        }
    };

    Ok(MonitorConfig {
        url,
        api_key,
        timeout: positive("service.timeout", cfg.service.timeout)?,
        export_timeout: positive("service.export_timeout", cfg.service.export_timeout)?,
        poll_interval: positive("poll.interval_secs", cfg.poll.interval_secs)?,
    })
}

/// Parse an agent URL, accepting only `http` and `https`.
pub fn parse_service_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.trim().parse().map_err(|_| ConfigError::Validation {
        field: "service.url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "service.url".into(),
            reason: format!("unsupported scheme '{}', expected http or https", url.scheme()),
        });
    }
    Ok(url)
}

/// Default archive destination: configured path, else the user's
/// Downloads folder, else the current directory.
pub fn default_export_path(cfg: &Config) -> PathBuf {
    if let Some(ref path) = cfg.export.path {
        return path.clone();
    }
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_EXPORT_FILE)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_match_agent_deployment() {
        let cfg = Config::default();
        assert_eq!(cfg.service.url, "http://127.0.0.1:8765");
        assert_eq!(cfg.service.api_key_env, "SMARTPOS_USB_APIKEY");
        assert_eq!(cfg.poll.interval_secs, 4);
        assert_eq!(cfg.export.mask, "db,logs");
    }

    #[test]
    fn file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [service]
                url = "http://10.0.0.5:8765"
                timeout = 5

                [poll]
                interval_secs = 10
                "#,
            )?;
            jail.set_env("POSMON_POLL__INTERVAL_SECS", "2");

            let cfg = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(cfg.service.url, "http://10.0.0.5:8765");
            assert_eq!(cfg.service.timeout, 5);
            assert_eq!(cfg.service.export_timeout, 30);
            assert_eq!(cfg.poll.interval_secs, 2);
            assert_eq!(cfg.defaults.output, "table");
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_| {
            let cfg = load_config_from(Path::new("nope.toml")).unwrap();
            assert_eq!(cfg, Config::default());
            Ok(())
        });
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.service.url = "http://pos-7:8765".into();
        cfg.export.path = Some(PathBuf::from("/tmp/out.zip"));
        save_config_to(&cfg, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[service]"));
        assert!(!written.contains("api_key ="));

        let loaded: Config = toml::from_str(&written).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn key_chain_order() {
        let pick = |flag: Option<&str>, env: Option<&str>, file: Option<&str>| {
            let (key, source) = first_key([
                (flag.map(str::to_owned), KeySource::Flag),
                (env.map(str::to_owned), KeySource::Env("K".into())),
                (None, KeySource::Keyring),
                (file.map(str::to_owned), KeySource::ConfigFile),
            ]);
            (key.map(|k| k.expose_secret().to_owned()), source)
        };

        assert_eq!(pick(Some("f"), Some("e"), Some("c")), (Some("f".into()), KeySource::Flag));
        assert_eq!(pick(None, Some("e"), Some("c")), (Some("e".into()), KeySource::Env("K".into())));
        assert_eq!(pick(Some("  "), None, Some("c")), (Some("c".into()), KeySource::ConfigFile));
        assert_eq!(pick(None, None, None), (None, KeySource::None));
    }

    #[test]
    fn monitor_config_translation() {
        let mut cfg = Config::default();
        cfg.poll.interval_secs = 7;
        let mc = to_monitor_config(&cfg, None).unwrap();
        assert_eq!(mc.url.as_str(), "http://127.0.0.1:8765/");
        assert_eq!(mc.timeout, Duration::from_secs(3));
        assert_eq!(mc.poll_interval, Duration::from_secs(7));
        assert!(mc.api_key.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.service.url = "ftp://host".into();
        assert!(matches!(
            to_monitor_config(&cfg, None),
            Err(ConfigError::Validation { .. })
        ));

        let mut cfg = Config::default();
        cfg.poll.interval_secs = 0;
        match to_monitor_config(&cfg, None) {
            Err(ConfigError::Validation { field, .. }) => assert_eq!(field, "poll.interval_secs"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn export_path_prefers_config() {
        let mut cfg = Config::default();
        cfg.export.path = Some(PathBuf::from("/srv/exports/pos.zip"));
        assert_eq!(default_export_path(&cfg), PathBuf::from("/srv/exports/pos.zip"));

        let fallback = default_export_path(&Config::default());
        assert!(fallback.ends_with(DEFAULT_EXPORT_FILE));
    }
}
