use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle of one host's virtual media mount
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum MediaMountState {
    Unmounted,
    Inserting,
    Verifying,
    Mounted,
    Failed(String),
}

impl MediaMountState {
    /// Mounted and Failed end an invocation
    pub fn is_terminal(&self) -> bool {
        matches!(self, MediaMountState::Mounted | MediaMountState::Failed(_))
    }
}

impl fmt::Display for MediaMountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaMountState::Unmounted => f.write_str("Unmounted"),
            MediaMountState::Inserting => f.write_str("Inserting"),
            MediaMountState::Verifying => f.write_str("Verifying"),
            MediaMountState::Mounted => f.write_str("Mounted"),
            MediaMountState::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

/// Outcome of a successful mount on one host
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountReport {
    pub host: String,
    pub state: MediaMountState,
    /// Power action issued after mounting, "none" when not requested
    pub last_action: String,
    /// Last state observed from the BMC's media resource
    pub last_task_state: String,
    pub mounted_at: DateTime<Utc>,
}

/// Artifacts produced by asset generation
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAssets {
    pub workdir: PathBuf,
    pub iso_path: PathBuf,
    #[serde(rename = "isoURL")]
    pub iso_url: Option<String>,
    /// Hex SHA-256 of the boot image
    pub iso_sha256: Option<String>,
    /// PXE artifacts directory, when emitted
    pub pxe_dir: Option<PathBuf>,
}

/// Credentials of the installed cluster
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub kubeconfig: String,
    pub kubeadmin_password: String,
    #[serde(rename = "consoleURL")]
    pub console_url: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("kubeconfig", &format_args!("<{} bytes>", self.kubeconfig.len()))
            .field("kubeadmin_password", &"<redacted>")
            .field("console_url", &self.console_url)
            .finish()
    }
}

/// Progress of the install wait for one attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstallProgress {
    Waiting,
    Complete(Credentials),
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!MediaMountState::Unmounted.is_terminal());
        assert!(!MediaMountState::Inserting.is_terminal());
        assert!(!MediaMountState::Verifying.is_terminal());
        assert!(MediaMountState::Mounted.is_terminal());
        assert!(MediaMountState::Failed("timeout".to_string()).is_terminal());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            kubeconfig: "apiVersion: v1".to_string(),
            kubeadmin_password: "hunter2".to_string(),
            console_url: "https://console".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("https://console"));
    }
}
