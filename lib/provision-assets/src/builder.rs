//! External image builder

use async_trait::async_trait;
use provision_core::{process, Result};
use std::path::PathBuf;
use tokio::process::Command;

pub const RELEASE_IMAGE_OVERRIDE_ENV: &str = "OPENSHIFT_INSTALL_RELEASE_IMAGE_OVERRIDE";
pub const REGISTRY_AUTH_FILE_ENV: &str = "REGISTRY_AUTH_FILE";
pub const REGISTRIES_CONF_ENV: &str = "CONTAINERS_REGISTRIES_CONF";

/// Inputs of one image builder invocation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageBuildRequest {
    pub workdir: PathBuf,
    pub release_image: Option<String>,
    pub registries_conf: Option<PathBuf>,
    pub auth_file: Option<PathBuf>,
}

/// Builds the agent boot image (and PXE artifacts) from the working directory
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn create_image(&self, request: &ImageBuildRequest) -> Result<()>;

    async fn create_pxe_files(&self, request: &ImageBuildRequest) -> Result<()>;
}

/// Runs the installer binary, e.g. `openshift-install agent create image --dir W`
#[derive(Clone, Debug)]
pub struct InstallerCommand {
    program: PathBuf,
    log_level: String,
}

impl InstallerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            log_level: "info".to_string(),
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Command for `agent <args...> --dir W` with the request's environment applied
    pub fn command(&self, args: &[&str], request: &ImageBuildRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("agent")
            .args(args)
            .arg("--dir")
            .arg(&request.workdir)
            .arg("--log-level")
            .arg(&self.log_level);

        if let Some(release_image) = &request.release_image {
            cmd.env(RELEASE_IMAGE_OVERRIDE_ENV, release_image);
        }
        if let Some(auth_file) = &request.auth_file {
            cmd.env(REGISTRY_AUTH_FILE_ENV, auth_file);
        }
        if let Some(registries_conf) = &request.registries_conf {
            cmd.env(REGISTRIES_CONF_ENV, registries_conf);
        }
        cmd
    }
}

impl Default for InstallerCommand {
    fn default() -> Self {
        Self::new("openshift-install")
    }
}

#[async_trait]
impl ImageBuilder for InstallerCommand {
    async fn create_image(&self, request: &ImageBuildRequest) -> Result<()> {
        let mut cmd = self.command(&["create", "image"], request);
        process::run(&mut cmd, &self.program_name(), "Building agent boot image").await
    }

    async fn create_pxe_files(&self, request: &ImageBuildRequest) -> Result<()> {
        let mut cmd = self.command(&["create", "pxe-files"], request);
        process::run(&mut cmd, &self.program_name(), "Building PXE artifacts").await
    }
}
