//! Working directory of a provisioning attempt

use crate::error::{ProvisionError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const INSTALL_CONFIG: &str = "install-config.yaml";
pub const INSTALL_CONFIG_PRESERVED: &str = "install-config.yaml.orig";
pub const AGENT_CONFIG: &str = "agent-config.yaml";
pub const BOOT_IMAGE: &str = "agent.x86_64.iso";
pub const PXE_DIR: &str = "boot-artifacts";
pub const AUTH_DIR: &str = "auth";
pub const KUBECONFIG: &str = "kubeconfig";
pub const KUBEADMIN_PASSWORD: &str = "kubeadmin-password";

/// Directory holding every artifact of one attempt.
///
/// The asset generator is its only writer; later stages read from it.
/// Nothing is removed on drop so operators can inspect or reuse it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Reuse `requested` (creating it if needed) or create a fresh temporary directory
    pub fn prepare(requested: Option<&Path>) -> Result<Self> {
        let path = match requested {
            Some(path) => {
                std::fs::create_dir_all(path).map_err(|e| ProvisionError::io(path, e))?;
                debug!("Reusing working directory {}", path.display());
                path.to_path_buf()
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("assets-")
                    .tempdir()
                    .map_err(|e| ProvisionError::io(std::env::temp_dir(), e))?;
                let path = dir.into_path();
                info!("Created working directory {}", path.display());
                path
            }
        };
        Ok(Self { path })
    }

    /// Refer to an existing working directory without touching it
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn install_config_path(&self) -> PathBuf {
        self.join(INSTALL_CONFIG)
    }

    pub fn preserved_install_config_path(&self) -> PathBuf {
        self.join(INSTALL_CONFIG_PRESERVED)
    }

    pub fn agent_config_path(&self) -> PathBuf {
        self.join(AGENT_CONFIG)
    }

    pub fn boot_image_path(&self) -> PathBuf {
        self.join(BOOT_IMAGE)
    }

    pub fn pxe_dir(&self) -> PathBuf {
        self.join(PXE_DIR)
    }

    pub fn kubeconfig_path(&self) -> PathBuf {
        self.path.join(AUTH_DIR).join(KUBECONFIG)
    }

    pub fn kubeadmin_password_path(&self) -> PathBuf {
        self.path.join(AUTH_DIR).join(KUBEADMIN_PASSWORD)
    }

    /// Write a file relative to the working directory
    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProvisionError::io(parent, e))?;
        }
        std::fs::write(&path, contents).map_err(|e| ProvisionError::io(&path, e))?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Read a file relative to the working directory, `None` if it does not exist
    pub fn read_optional(&self, name: &str) -> Result<Option<String>> {
        read_optional(&self.join(name))
    }
}

/// Read a text file, mapping "not found" to `None`
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProvisionError::io(path, e)),
    }
}
