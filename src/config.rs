//! Server configuration.
//!
//! Configuration sources (highest priority first):
//! 1. Command line flags and environment variables (PODHOST_HOST, PODHOST_ROOT,
//!    PODHOST_CREDENTIAL, PODHOST_PORT, PODHOST_FRONT)
//! 2. YAML config file given with `--config`
//! 3. Defaults (root `/podhost`, port 80, web UI in `./front`)
//!
//! The public host has no default and must come from one of the first two.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::library::{CATALOG_FILE, PODCASTS_DIR};

pub const DEFAULT_ROOT: &str = "/podhost";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_FRONT: &str = "front";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub host: Option<String>,
    pub root: Option<PathBuf>,
    pub credential: Option<String>,
    pub port: Option<u16>,
    pub front: Option<PathBuf>,
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub root: Option<PathBuf>,
    pub credential: Option<String>,
    pub port: Option<u16>,
    pub front: Option<PathBuf>,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Public base URL, with scheme and without a trailing `/`
    pub host: String,
    /// Storage root holding the catalog file and the content tree
    pub root: PathBuf,
    /// `user:password` or a bare password; `None` disables authentication
    pub credential: Option<String>,
    pub port: u16,
    /// Built management web UI, served at the base path
    pub front: PathBuf,
}

impl Config {
    /// Merge overrides, the optional config file and defaults
    pub fn resolve(overrides: Overrides, file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        let host = overrides
            .host
            .or(file.host)
            .context("No public host configured (use --host or PODHOST_HOST)")?;

        Ok(Self {
            host: normalize_host(&host)?,
            root: overrides
                .root
                .or(file.root)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            credential: overrides
                .credential
                .or(file.credential)
                .filter(|c| !c.is_empty()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            front: overrides
                .front
                .or(file.front)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FRONT)),
        })
    }

    /// Path component of the host URL that all routes are mounted under,
    /// e.g. `/pods` for `https://example.com/pods`; empty for the domain root
    pub fn base_path(&self) -> String {
        match Url::parse(&self.host) {
            Ok(url) => url.path().trim_end_matches('/').to_string(),
            Err(_) => String::new(),
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    pub fn content_root(&self) -> PathBuf {
        self.root.join(PODCASTS_DIR)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Host:       {}", self.host)?;
        writeln!(f, "Base path:  {}", display_or(&self.base_path(), "/"))?;
        writeln!(f, "Port:       {}", self.port)?;
        writeln!(f, "Root:       {}", self.root.display())?;
        writeln!(f, "Catalog:    {}", self.catalog_path().display())?;
        writeln!(f, "Content:    {}", self.content_root().display())?;
        writeln!(f, "Web UI:     {}", self.front.display())?;
        let auth = if self.credential.is_some() {
            "basic"
        } else {
            "(none)"
        };
        write!(f, "Auth:       {}", auth)
    }
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Add `https://` when no scheme is given and drop trailing slashes.
/// Only `http` and `https` hosts are accepted.
pub fn normalize_host(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Host must not be empty");
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let host = with_scheme.trim_end_matches('/').to_string();

    let url = Url::parse(&host).with_context(|| format!("Invalid host URL: {}", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Host must be an http or https URL: {}", raw);
    }
    Ok(host)
}
