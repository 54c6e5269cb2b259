//! Configuration loading and resolution.
//!
//! The global config is a TOML file located by a fixed search order at
//! startup and held read-only for the process lifetime. Per-profile configs
//! live in a `sms2mail.d` directory next to the loaded global config and are
//! re-read on every request, so edits take effect without a restart.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// msmtp account used when a profile does not name one.
pub const DEFAULT_ACCOUNT: &str = "default";

/// Directory next to the global config holding per-profile files.
pub const PROFILE_DIR: &str = "sms2mail.d";

/// System-wide config location, checked when no explicit path is given.
const SYSTEM_CONFIG_PATH: &str = "/etc/sms2mail.toml";

/// File name looked up in the OS user config directory.
const USER_CONFIG_NAME: &str = "sms2mail.toml";

/// Current-directory fallback.
const LOCAL_CONFIG_PATH: &str = "config.toml";

/// Configuration failure.
///
/// At startup any variant is fatal; during request handling a profile-load
/// failure maps to a 404 and the process keeps running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no configuration file found in {SYSTEM_CONFIG_PATH}, the user config directory, or ./{LOCAL_CONFIG_PATH}"
    )]
    NotFound,

    #[error("failed to read config '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Global configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    /// Listen address. Accepts the bare-port `":8080"` form as well as a
    /// full `host:port` pair.
    pub server_port: String,

    /// Single-tenant routing for `POST /sms`. When absent that route
    /// answers 404 and only the per-profile routes are live.
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

impl GlobalConfig {
    /// Normalize `server_port` to a bindable address. A leading colon means
    /// "all interfaces".
    pub fn bind_addr(&self) -> String {
        if self.server_port.starts_with(':') {
            format!("0.0.0.0{}", self.server_port)
        } else {
            self.server_port.clone()
        }
    }
}

/// Email routing settings for one delivery target.
///
/// This is both the shape of a per-profile file and of the optional
/// `[email]` table in the global config.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Envelope/header From address. Must be one your msmtp provider
    /// accepts.
    pub email_from: String,
    /// Recipient address.
    pub email_to: String,
    /// msmtp account to submit through; defaults to [`DEFAULT_ACCOUNT`].
    #[serde(default)]
    pub msmtp_profile: Option<String>,
}

impl EmailConfig {
    /// The msmtp account for this target, falling back to
    /// [`DEFAULT_ACCOUNT`] when unset or blank.
    pub fn account(&self) -> &str {
        self.msmtp_profile
            .as_deref()
            .filter(|account| !account.trim().is_empty())
            .unwrap_or(DEFAULT_ACCOUNT)
    }
}

/// A loaded global config plus the directory profile files are resolved
/// against.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub global: GlobalConfig,
    pub config_dir: PathBuf,
}

/// Locate and load the global config.
///
/// Search order: explicit path, then [`SYSTEM_CONFIG_PATH`], then the OS
/// user config directory, then `./config.toml`. The first existing file
/// wins; an explicit path is loaded unconditionally so a typo fails loudly
/// instead of silently falling through to another candidate.
pub fn resolve_global(explicit: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => first_existing(&candidate_paths()).ok_or(ConfigError::NotFound)?,
    };

    let global = load_global(&path)?;
    let config_dir = parent_dir(&path);

    debug!(path = %path.display(), "global_config_loaded");

    Ok(ResolvedConfig { global, config_dir })
}

/// Candidate locations for an implicit global config, in priority order.
fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(USER_CONFIG_NAME));
    }
    candidates.push(PathBuf::from(LOCAL_CONFIG_PATH));
    candidates
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

fn load_global(path: &Path) -> Result<GlobalConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Directory containing `path`, with a bare file name mapping to `.` so
/// `./config.toml` resolves profiles from `./sms2mail.d`.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Path of the per-profile file for `name` under `config_dir`.
pub fn profile_path(config_dir: &Path, name: &str) -> PathBuf {
    config_dir.join(PROFILE_DIR).join(format!("{name}.toml"))
}

/// Whether `name` is usable as a profile file stem.
///
/// axum percent-decodes path segments, so a crafted URL can smuggle `/` or
/// `..` into the captured segment; anything that could traverse outside
/// [`PROFILE_DIR`] is treated as an unknown profile.
pub fn valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Read and parse one profile config.
///
/// Called on every matching request; there is deliberately no cache.
pub async fn load_profile(config_dir: &Path, name: &str) -> Result<EmailConfig, ConfigError> {
    let path = profile_path(config_dir, name);
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
}

/// Global config template written by `sms2mail config`.
pub const CONFIG_TEMPLATE: &str = r#"# Server settings
server_port = ":8080"

# Optional single-tenant routing for POST /sms.
# Leave the [email] table out when only per-profile routes are used.
# [email]
# email_from = "sms-notifier@yourserver.com"
# email_to = "youremail@example.com"
# msmtp_profile = "default"
"#;

/// Per-profile template written by `sms2mail profile-config`.
pub const PROFILE_TEMPLATE: &str = r#"# Email configuration for one profile
# Ensure this 'From' address is allowed by your msmtp configuration (provider)
email_from = "sms-notifier@yourserver.com"
email_to = "youremail@example.com"

# Optional: which msmtp account to submit through.
# If not specified, defaults to "default"
# msmtp_profile = "default"
"#;
