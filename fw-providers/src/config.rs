//! Backend configuration
//!
//! Backends are declared in a TOML file:
//!
//! ```toml
//! [[backends]]
//! name = "home"
//! kind = "local"
//! root = "/home/me"
//! file_mode = 0o644
//!
//! [[backends]]
//! name = "mirror"
//! kind = "ftp"
//! root = "/pub"
//! read_only = true
//! [backends.ftp]
//! host = "ftp.example.org"
//! ```

use fw_core::{FwError, FwResult, HandleConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Backend flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Ftp,
}

/// FTP connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpSettings {
    pub host: String,
    /// Port (default: 21)
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    #[serde(default = "default_ftp_user")]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Passive data connections (default: true)
    #[serde(default = "default_true")]
    pub passive: bool,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl FtpSettings {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_ftp_port(),
            username: default_ftp_user(),
            password: None,
            passive: true,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_ftp_port() -> u16 {
    21
}

fn default_ftp_user() -> String {
    "anonymous".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

/// One named backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub kind: BackendKind,
    #[serde(flatten)]
    pub handle: HandleConfig,
    #[serde(default)]
    pub ftp: Option<FtpSettings>,
}

impl BackendConfig {
    pub fn local(name: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BackendKind::Local,
            handle: HandleConfig::new(root),
            ftp: None,
        }
    }

    pub fn ftp(name: impl Into<String>, root: impl Into<String>, settings: FtpSettings) -> Self {
        Self {
            name: name.into(),
            kind: BackendKind::Ftp,
            handle: HandleConfig::new(root),
            ftp: Some(settings),
        }
    }

    pub fn validate(&self) -> FwResult<()> {
        if self.name.is_empty() {
            return Err(FwError::Config("backend name must not be empty".into()));
        }
        if self.kind == BackendKind::Ftp && self.ftp.is_none() {
            return Err(FwError::Config(format!(
                "backend {} is ftp but has no [ftp] settings",
                self.name
            )));
        }
        Ok(())
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FwConfig {
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl FwConfig {
    pub fn parse(text: &str) -> FwResult<Self> {
        let config: FwConfig =
            toml::from_str(text).map_err(|e| FwError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> FwResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| FwError::io(path.display().to_string(), e))?;
        debug!(path = %path.display(), "loading configuration");
        Self::parse(&text)
    }

    /// `<config dir>/fileway/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "hyperpolymath", "fileway")
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// Load `path`, or the default file, falling back to a single local
    /// backend rooted at `/` when neither exists
    pub fn load_or_default(path: Option<&Path>) -> FwResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::fallback()),
        }
    }

    pub fn fallback() -> Self {
        Self {
            backends: vec![BackendConfig::local("local", "/")],
        }
    }

    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name == name)
    }

    fn validate(&self) -> FwResult<()> {
        for (i, backend) in self.backends.iter().enumerate() {
            backend.validate()?;
            if self.backends[..i].iter().any(|b| b.name == backend.name) {
                return Err(FwError::Config(format!("duplicate backend name {}", backend.name)));
            }
        }
        Ok(())
    }
}
