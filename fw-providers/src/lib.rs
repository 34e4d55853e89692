//! Storage providers for Fileway
//!
//! Local filesystem and FTP gateways, the configuration model that declares
//! them, and a registry of named handles built from it.

pub mod config;
mod local;

#[cfg(feature = "ftp")]
pub mod ftp;

pub use config::{BackendConfig, BackendKind, FtpSettings, FwConfig};
pub use local::LocalBackend;

#[cfg(feature = "ftp")]
pub use ftp::FtpBackend;

use fw_core::{AdapterHandle, FwError, FwResult, Gateway};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Build the gateway a backend declaration describes
pub fn gateway_for(config: &BackendConfig) -> FwResult<Box<dyn Gateway>> {
    config.validate()?;
    match config.kind {
        BackendKind::Local => Ok(Box::new(LocalBackend::new(&config.handle.root))),
        #[cfg(feature = "ftp")]
        BackendKind::Ftp => {
            let settings = config
                .ftp
                .clone()
                .ok_or_else(|| FwError::Config(format!("backend {} has no ftp settings", config.name)))?;
            Ok(Box::new(FtpBackend::new(settings, config.handle.root.clone())))
        }
        #[cfg(not(feature = "ftp"))]
        BackendKind::Ftp => Err(FwError::Unsupported(format!(
            "backend {}: built without ftp support",
            config.name
        ))),
    }
}

/// Build and connect a handle for one backend
pub fn connect(config: &BackendConfig) -> FwResult<AdapterHandle> {
    let handle = AdapterHandle::new(&config.name, config.handle.clone(), gateway_for(config)?);
    handle.connect()?;
    Ok(handle)
}

/// Named handles, connected on first use
pub struct BackendRegistry {
    configs: Vec<BackendConfig>,
    handles: BTreeMap<String, AdapterHandle>,
}

impl BackendRegistry {
    pub fn new(config: FwConfig) -> Self {
        Self {
            configs: config.backends,
            handles: BTreeMap::new(),
        }
    }

    pub fn configs(&self) -> &[BackendConfig] {
        &self.configs
    }

    /// Handle for `name`, connecting it if this is the first request
    pub fn get(&mut self, name: &str) -> FwResult<&AdapterHandle> {
        if !self.handles.contains_key(name) {
            let config = self
                .configs
                .iter()
                .find(|c| c.name == name)
                .ok_or_else(|| FwError::Config(format!("unknown backend: {}", name)))?;
            let handle = connect(config)?;
            debug!(backend = name, "registered handle");
            self.handles.insert(name.to_string(), handle);
        }
        self.handles
            .get(name)
            .ok_or_else(|| FwError::Config(format!("unknown backend: {}", name)))
    }

    /// Connect several backends at once, returning them in request order
    pub fn get_many(&mut self, names: &[&str]) -> FwResult<Vec<&AdapterHandle>> {
        for name in names {
            self.get(name)?;
        }
        names
            .iter()
            .map(|name| {
                self.handles
                    .get(*name)
                    .ok_or_else(|| FwError::Config(format!("unknown backend: {}", name)))
            })
            .collect()
    }

    /// Close every connected handle
    pub fn close_all(&mut self) {
        for (name, handle) in std::mem::take(&mut self.handles) {
            if let Err(e) = handle.close() {
                warn!(backend = %name, error = %e, "close failed");
            }
        }
    }
}

impl Drop for BackendRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}
