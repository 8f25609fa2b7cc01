//! Credential files written by the installer

use kube::config::Kubeconfig;
use provision_assets::InstallConfig;
use provision_core::workdir::{self, INSTALL_CONFIG, INSTALL_CONFIG_PRESERVED};
use provision_core::{ProvisionError, Result, WorkDir};
use tracing::debug;

/// Kubeconfig and admin password, only when both files are complete.
///
/// A password file must be non-empty and the kubeconfig must parse and name
/// at least one cluster. Contents are returned exactly as written.
pub fn read_complete_credentials(workdir: &WorkDir) -> Result<Option<(String, String)>> {
    let password = match workdir::read_optional(&workdir.kubeadmin_password_path())? {
        Some(password) if !password.trim().is_empty() => password,
        _ => return Ok(None),
    };
    let kubeconfig = match workdir::read_optional(&workdir.kubeconfig_path())? {
        Some(kubeconfig) => kubeconfig,
        None => return Ok(None),
    };

    match Kubeconfig::from_yaml(&kubeconfig) {
        Ok(parsed) if !parsed.clusters.is_empty() => Ok(Some((kubeconfig, password))),
        Ok(_) => {
            debug!("kubeconfig names no cluster yet");
            Ok(None)
        }
        Err(e) => {
            debug!("kubeconfig not parseable yet: {}", e);
            Ok(None)
        }
    }
}

/// Console URL from the recorded install configuration.
///
/// The installer consumes install-config.yaml, so the preserved copy is
/// preferred.
pub fn console_url(workdir: &WorkDir) -> Result<String> {
    for name in [INSTALL_CONFIG_PRESERVED, INSTALL_CONFIG] {
        if let Some(text) = workdir.read_optional(name)? {
            return Ok(InstallConfig::from_yaml(&text)?.console_url());
        }
    }
    Err(ProvisionError::Internal(format!(
        "no install configuration recorded in {}",
        workdir.path().display()
    )))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const KUBECONFIG: &str = "apiVersion: v1
kind: Config
clusters:
- name: edge
  cluster:
    server: https://api.edge.example.com:6443
contexts:
- name: admin
  context:
    cluster: edge
    user: admin
current-context: admin
users:
- name: admin
  user:
    token: abc
";

    pub(crate) const INSTALL_CONFIG_YAML: &str = "apiVersion: v1
baseDomain: example.com
metadata:
  name: edge
networking:
  networkType: OVNKubernetes
  clusterNetwork:
  - cidr: 10.128.0.0/14
    hostPrefix: 23
  serviceNetwork:
  - 172.30.0.0/16
  machineNetwork:
  - cidr: 192.168.111.0/24
compute:
- name: worker
  replicas: 0
controlPlane:
  name: master
  replicas: 1
platform:
  none: {}
pullSecret: '{}'
sshKey: ssh-ed25519 AAAA
";

    pub(crate) fn write_credentials(workdir: &WorkDir, kubeconfig: &str, password: &str) {
        workdir.write("auth/kubeconfig", kubeconfig).unwrap();
        workdir.write("auth/kubeadmin-password", password).unwrap();
    }

    #[test]
    fn test_complete_credentials_returned_verbatim() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::open(scratch.path());
        write_credentials(&workdir, KUBECONFIG, "Xk2p-aBcD-eFgH-iJkL\n");

        let (kubeconfig, password) = read_complete_credentials(&workdir).unwrap().unwrap();
        assert_eq!(kubeconfig, KUBECONFIG);
        assert_eq!(password, "Xk2p-aBcD-eFgH-iJkL\n");
    }

    #[test]
    fn test_partial_credentials_are_incomplete() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::open(scratch.path());
        assert_eq!(read_complete_credentials(&workdir).unwrap(), None);

        workdir.write("auth/kubeconfig", KUBECONFIG).unwrap();
        assert_eq!(read_complete_credentials(&workdir).unwrap(), None);

        workdir.write("auth/kubeadmin-password", "  \n").unwrap();
        assert_eq!(read_complete_credentials(&workdir).unwrap(), None);
    }

    #[test]
    fn test_password_without_kubeconfig() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::open(scratch.path());
        workdir.write("auth/kubeadmin-password", "secret").unwrap();
        assert_eq!(read_complete_credentials(&workdir).unwrap(), None);
    }

    #[test]
    fn test_kubeconfig_without_clusters() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::open(scratch.path());
        write_credentials(&workdir, "apiVersion: v1\nclusters: []\n", "secret");
        assert_eq!(read_complete_credentials(&workdir).unwrap(), None);

        write_credentials(&workdir, "clusters: [unterminated", "secret");
        assert_eq!(read_complete_credentials(&workdir).unwrap(), None);
    }

    #[test]
    fn test_console_url_prefers_preserved_copy() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::open(scratch.path());
        workdir.write(INSTALL_CONFIG_PRESERVED, INSTALL_CONFIG_YAML).unwrap();

        assert_eq!(
            console_url(&workdir).unwrap(),
            "https://console-openshift-console.apps.edge.example.com"
        );
    }

    #[test]
    fn test_console_url_without_install_config() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::open(scratch.path());
        assert!(matches!(
            console_url(&workdir).unwrap_err(),
            ProvisionError::Internal(_)
        ));
    }
}
