//! Asset generation: installer documents, boot image, optional file server

use crate::agent_config::AgentConfig;
use crate::builder::{ImageBuildRequest, ImageBuilder};
use crate::install_config::InstallConfig;
use crate::serve::FileServer;
use provision_api::{ClusterSpec, GeneratedAssets, ServeFrom};
use provision_core::workdir::{AGENT_CONFIG, BOOT_IMAGE, INSTALL_CONFIG, INSTALL_CONFIG_PRESERVED};
use provision_core::{ProvisionError, Result, WorkDir};
use sha2::{Digest, Sha256};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Produces the installer inputs and the boot image for a validated spec
pub struct AssetGenerator {
    builder: Arc<dyn ImageBuilder>,
    serve_bind: Option<IpAddr>,
}

impl AssetGenerator {
    pub fn new(builder: Arc<dyn ImageBuilder>) -> Self {
        Self {
            builder,
            serve_bind: None,
        }
    }

    /// Local address the boot image server listens on (port comes from the spec).
    ///
    /// Defaults to the unspecified address of the served address's family.
    pub fn with_serve_bind(mut self, bind: IpAddr) -> Self {
        self.serve_bind = Some(bind);
        self
    }

    /// Write install-config.yaml (plus a preserved copy) and agent-config.yaml
    pub fn render(spec: &ClusterSpec, workdir: &WorkDir) -> Result<InstallConfig> {
        let trust_bundle = match spec.mirror.as_ref().and_then(|m| m.ca_bundle.as_ref()) {
            Some(path) => Some(
                std::fs::read_to_string(path).map_err(|e| ProvisionError::io(path, e))?,
            ),
            None => None,
        };

        let install_config = InstallConfig::from_spec(spec, trust_bundle);
        let install_yaml = install_config.to_yaml()?;
        // The installer consumes install-config.yaml; the copy records what was requested.
        workdir.write(INSTALL_CONFIG, &install_yaml)?;
        workdir.write(INSTALL_CONFIG_PRESERVED, &install_yaml)?;

        let agent_yaml = AgentConfig::from_spec(spec).to_yaml()?;
        workdir.write(AGENT_CONFIG, agent_yaml)?;

        info!(
            cluster = %spec.cluster_name,
            workdir = %workdir.path().display(),
            "Rendered installer configuration"
        );
        Ok(install_config)
    }

    /// Render the documents, build the boot image and, when requested, serve it.
    ///
    /// A failing image build aborts generation; a failing file server does not.
    pub async fn generate(&self, spec: &ClusterSpec, workdir: &WorkDir) -> Result<GeneratedAssets> {
        Self::render(spec, workdir)?;

        let request = ImageBuildRequest {
            workdir: workdir.path().to_path_buf(),
            release_image: spec.release_image.clone(),
            registries_conf: spec.mirror.as_ref().and_then(|m| m.registries_conf.clone()),
            auth_file: spec.mirror.as_ref().and_then(|m| m.auth_file.clone()),
        };

        self.builder.create_image(&request).await?;

        let iso_path = workdir.boot_image_path();
        if !iso_path.is_file() {
            return Err(ProvisionError::Internal(format!(
                "image builder succeeded but {} does not exist",
                iso_path.display()
            )));
        }
        let iso_sha256 = sha256_file(&iso_path).await?;
        info!(iso = %iso_path.display(), sha256 = %iso_sha256, "Boot image ready");

        let pxe_dir = if spec.emit_pxe {
            self.builder.create_pxe_files(&request).await?;
            Some(workdir.pxe_dir())
        } else {
            None
        };

        let iso_url = spec.serve_from.as_ref().map(|serve| {
            self.spawn_server(serve, workdir);
            boot_image_url(serve)
        });

        Ok(GeneratedAssets {
            workdir: workdir.path().to_path_buf(),
            iso_path,
            iso_url,
            iso_sha256: Some(iso_sha256),
            pxe_dir,
        })
    }

    // Fire-and-forget: the server outlives this call and its failures only
    // surface as hosts failing to fetch the image.
    fn spawn_server(&self, serve: &ServeFrom, workdir: &WorkDir) {
        let bind = self.serve_bind.unwrap_or_else(|| default_bind(&serve.address));
        let addr = SocketAddr::new(bind, serve.port);
        info!(%addr, root = %workdir.path().display(), "Serving boot media");
        let server = FileServer::new(workdir.path(), addr);
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                warn!(%addr, error = %e, "Boot image server stopped");
            }
        });
    }
}

/// URL BMCs fetch the boot image from; IPv6 literals are bracketed
pub fn boot_image_url(serve: &ServeFrom) -> String {
    let authority = match serve.address.trim_matches(|c: char| c == '[' || c == ']').parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, serve.port).to_string(),
        Err(_) => format!("{}:{}", serve.address, serve.port),
    };
    format!("http://{}/{}", authority, BOOT_IMAGE)
}

fn default_bind(address: &str) -> IpAddr {
    match address.trim_matches(|c: char| c == '[' || c == ']').parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    }
}

async fn sha256_file(path: &Path) -> Result<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut file = std::fs::File::open(&path).map_err(|e| ProvisionError::io(&path, e))?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher).map_err(|e| ProvisionError::io(&path, e))?;
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| ProvisionError::Internal(format!("digest task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install_config::tests::spec;
    use async_trait::async_trait;
    use provision_api::MirrorSpec;
    use std::sync::Mutex;

    /// Builder writing a placeholder image, or failing like a broken release
    #[derive(Default)]
    struct FakeBuilder {
        fail: bool,
        calls: Mutex<Vec<(String, ImageBuildRequest)>>,
    }

    #[async_trait]
    impl ImageBuilder for FakeBuilder {
        async fn create_image(&self, request: &ImageBuildRequest) -> Result<()> {
            self.calls.lock().unwrap().push(("image".to_string(), request.clone()));
            if self.fail {
                return Err(ProvisionError::ExternalProcess {
                    program: "openshift-install".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "failed to fetch release image".to_string(),
                });
            }
            std::fs::write(request.workdir.join(BOOT_IMAGE), b"ISO").unwrap();
            Ok(())
        }

        async fn create_pxe_files(&self, request: &ImageBuildRequest) -> Result<()> {
            self.calls.lock().unwrap().push(("pxe".to_string(), request.clone()));
            std::fs::create_dir_all(request.workdir.join("boot-artifacts")).unwrap();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_generate_writes_documents_and_builds_once() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::open(scratch.path());
        let builder = Arc::new(FakeBuilder::default());
        let generator = AssetGenerator::new(builder.clone());

        let assets = generator.generate(&spec(), &workdir).await.unwrap();

        assert!(workdir.install_config_path().is_file());
        assert!(workdir.preserved_install_config_path().is_file());
        assert!(workdir.agent_config_path().is_file());
        assert_eq!(assets.iso_path, workdir.boot_image_path());
        assert_eq!(assets.iso_url, None);
        assert_eq!(assets.pxe_dir, None);
        assert_eq!(
            assets.iso_sha256.as_deref(),
            Some("6dc87bf3ac7649b799be35cdd8b3a0bdae66a0447c69c286e01df5c87c589859")
        );

        let calls = builder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "image");
        assert_eq!(calls[0].1.workdir, scratch.path());
        assert_eq!(
            calls[0].1.release_image.as_deref(),
            Some("quay.io/openshift-release-dev/ocp-release:4.16.0-x86_64")
        );
    }

    #[tokio::test]
    async fn test_generate_pxe_and_url() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::open(scratch.path());
        let builder = Arc::new(FakeBuilder::default());
        let generator = AssetGenerator::new(builder.clone()).with_serve_bind(Ipv4Addr::LOCALHOST.into());

        let mut spec = spec();
        spec.emit_pxe = true;
        spec.serve_from = Some(ServeFrom {
            address: "192.168.111.1".to_string(),
            port: 0,
        });

        let assets = generator.generate(&spec, &workdir).await.unwrap();

        assert_eq!(
            assets.iso_url.as_deref(),
            Some("http://192.168.111.1:0/agent.x86_64.iso")
        );
        assert_eq!(assets.pxe_dir, Some(workdir.pxe_dir()));
        let calls = builder.calls.lock().unwrap();
        let kinds: Vec<&str> = calls.iter().map(|(kind, _)| kind.as_str()).collect();
        assert_eq!(kinds, vec!["image", "pxe"]);
    }

    #[tokio::test]
    async fn test_build_failure_is_fatal() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::open(scratch.path());
        let builder = Arc::new(FakeBuilder {
            fail: true,
            ..Default::default()
        });
        let generator = AssetGenerator::new(builder.clone());
        let mut spec = spec();
        spec.emit_pxe = true;

        let err = generator.generate(&spec, &workdir).await.unwrap_err();

        assert!(matches!(err, ProvisionError::ExternalProcess { .. }));
        // No PXE build after a failed image build; documents stay for inspection
        assert_eq!(builder.calls.lock().unwrap().len(), 1);
        assert!(workdir.install_config_path().is_file());
    }

    #[tokio::test]
    async fn test_mirror_passes_trust_bundle_and_registry_config() {
        let scratch = tempfile::tempdir().unwrap();
        let ca = scratch.path().join("ca.pem");
        std::fs::write(&ca, "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n").unwrap();
        let workdir = WorkDir::open(scratch.path().join("work"));
        std::fs::create_dir_all(workdir.path()).unwrap();

        let mut spec = spec();
        spec.mirror = Some(MirrorSpec {
            endpoint: "mirror.local:5000".to_string(),
            ca_bundle: Some(ca),
            registries_conf: Some(scratch.path().join("registries.conf")),
            auth_file: Some(scratch.path().join("auth.json")),
        });

        let builder = Arc::new(FakeBuilder::default());
        AssetGenerator::new(builder.clone())
            .generate(&spec, &workdir)
            .await
            .unwrap();

        let written = std::fs::read_to_string(workdir.install_config_path()).unwrap();
        let config = InstallConfig::from_yaml(&written).unwrap();
        assert!(config
            .additional_trust_bundle
            .as_deref()
            .unwrap()
            .contains("BEGIN CERTIFICATE"));
        assert_eq!(config.image_digest_sources.len(), 2);

        let calls = builder.calls.lock().unwrap();
        assert_eq!(
            calls[0].1.registries_conf,
            Some(scratch.path().join("registries.conf"))
        );
        assert_eq!(calls[0].1.auth_file, Some(scratch.path().join("auth.json")));
    }

    #[test]
    fn test_missing_ca_bundle_file() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::open(scratch.path());
        let mut spec = spec();
        spec.mirror = Some(MirrorSpec {
            endpoint: "mirror.local:5000".to_string(),
            ca_bundle: Some(scratch.path().join("missing.pem")),
            registries_conf: Some(scratch.path().join("registries.conf")),
            auth_file: None,
        });
        let err = AssetGenerator::render(&spec, &workdir).unwrap_err();
        assert!(matches!(err, ProvisionError::Io { .. }));
    }

    #[test]
    fn test_boot_image_url_ipv6() {
        let serve = ServeFrom {
            address: "fd00:1101::1".to_string(),
            port: 8080,
        };
        assert_eq!(boot_image_url(&serve), "http://[fd00:1101::1]:8080/agent.x86_64.iso");

        let bracketed = ServeFrom {
            address: "[fd00:1101::1]".to_string(),
            port: 8080,
        };
        assert_eq!(boot_image_url(&bracketed), "http://[fd00:1101::1]:8080/agent.x86_64.iso");

        let named = ServeFrom {
            address: "images.lab".to_string(),
            port: 80,
        };
        assert_eq!(boot_image_url(&named), "http://images.lab:80/agent.x86_64.iso");
    }

    #[test]
    fn test_default_bind_follows_address_family() {
        assert_eq!(default_bind("fd00:1101::1"), IpAddr::V6(Ipv6Addr::UNSPECIFIED));
        assert_eq!(default_bind("192.168.111.1"), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(default_bind("images.lab"), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn test_boot_image_url() {
        let serve = ServeFrom {
            address: "192.168.111.1".to_string(),
            port: 8080,
        };
        assert_eq!(boot_image_url(&serve), "http://192.168.111.1:8080/agent.x86_64.iso");
    }
}
