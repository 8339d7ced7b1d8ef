//! Starting the runtime process.
//!
//! The launcher executable reads a JSON startup manifest naming the runtime
//! version and its command-line arguments. Without a configured launcher the
//! runtime is assumed to be running already.

use crate::base::error::RuntimeError;
use crate::config::RuntimeConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeSection {
    pub version: String,
    pub arguments: String,
}

/// Startup manifest handed to the launcher with `--config=`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartupManifest {
    pub runtime: RuntimeSection,
    /// Always null: the application is created over the connection instead.
    pub startup_app: Option<String>,
    pub websocket_port: u16,
}

impl StartupManifest {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            runtime: RuntimeSection {
                version: config.runtime_version.clone(),
                arguments: config.extra_args.clone(),
            },
            startup_app: None,
            websocket_port: config.runtime_port,
        }
    }

    /// Write the manifest into `dir`, returning the file path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, RuntimeError> {
        let path = dir.join(format!("proxyauth-{}.json", std::process::id()));
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(&path, json)
            .map_err(|e| RuntimeError::Launch(format!("writing {}: {}", path.display(), e)))?;
        Ok(path)
    }
}

/// Spawn the configured launcher, if any. Returns the child's pid.
///
/// The child is not awaited; its lifetime is governed by `exit-desktop`.
pub async fn launch(config: &RuntimeConfig) -> Result<Option<u32>, RuntimeError> {
    let Some(launcher) = config.launcher.as_ref() else {
        tracing::debug!("No runtime launcher configured, expecting a running runtime");
        return Ok(None);
    };

    let manifest = StartupManifest::from_config(config).write_to(&std::env::temp_dir())?;
    tracing::info!(
        launcher = %launcher.display(),
        manifest = %manifest.display(),
        version = %config.runtime_version,
        "Launching runtime"
    );

    let child = Command::new(launcher)
        .arg(format!("--config={}", manifest.display()))
        .spawn()
        .map_err(|e| RuntimeError::Launch(format!("{}: {}", launcher.display(), e)))?;

    Ok(child.id())
}
