//! Mirror registry preparation
//!
//! Lays out the files a disconnected install needs to pull the release from
//! a local registry: a registry auth file, a containers-registries v2
//! configuration redirecting the release repositories, and the mirror's CA.

use crate::install_config::RELEASE_REPOSITORIES;
use provision_api::MirrorSpec;
use provision_core::{ProvisionError, Result, WorkDir};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const AUTH_FILE: &str = "auth.json";
pub const REGISTRIES_CONF: &str = "registries.conf";
pub const CA_BUNDLE: &str = "ca.pem";

const DEFAULT_REGISTRY_HOST: &str = "mirror.local";

#[derive(Clone, Debug, Default)]
pub struct MirrorRegistryArgs {
    /// Registry host, with optional port and scheme
    pub registry_host: Option<String>,

    /// Inline PEM bundle trusted for the registry
    pub ca_bundle: Option<String>,

    /// Inline registry auth JSON; an empty auth set when absent
    pub auth: Option<String>,

    /// Pull from the mirror without TLS verification
    pub insecure: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorArtifacts {
    pub endpoint: String,
    pub auth_file_path: PathBuf,
    pub registries_conf: PathBuf,
    pub ca_bundle_path: Option<PathBuf>,
}

impl MirrorArtifacts {
    /// Mirror block for a cluster spec pointing at these files
    pub fn to_mirror_spec(&self) -> MirrorSpec {
        MirrorSpec {
            endpoint: self.endpoint.clone(),
            ca_bundle: self.ca_bundle_path.clone(),
            registries_conf: Some(self.registries_conf.clone()),
            auth_file: Some(self.auth_file_path.clone()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct RegistriesConf {
    unqualified_search_registries: Vec<String>,
    registry: Vec<Registry>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Registry {
    prefix: String,
    location: String,
    mirror_by_digest_only: bool,
    mirror: Vec<RegistryMirror>,
}

#[derive(Serialize)]
struct RegistryMirror {
    location: String,
    insecure: bool,
}

pub struct MirrorRegistry;

impl MirrorRegistry {
    /// Write the mirror files into `dir`, or a fresh `mirror-` temporary directory
    pub fn prepare(args: &MirrorRegistryArgs, dir: Option<&Path>) -> Result<MirrorArtifacts> {
        let dir = match dir {
            Some(path) => WorkDir::prepare(Some(path))?,
            None => {
                let path = tempfile::Builder::new()
                    .prefix("mirror-")
                    .tempdir()
                    .map_err(|e| ProvisionError::io(std::env::temp_dir(), e))?
                    .into_path();
                WorkDir::open(path)
            }
        };

        let endpoint = args
            .registry_host
            .clone()
            .unwrap_or_else(|| DEFAULT_REGISTRY_HOST.to_string());

        if let Some(auth) = &args.auth {
            serde_json::from_str::<serde_json::Value>(auth)?;
        }
        let auth_file_path = dir.write(AUTH_FILE, args.auth.as_deref().unwrap_or("{}"))?;

        let conf = registries_conf(&endpoint, args.insecure)?;
        let registries_conf = dir.write(REGISTRIES_CONF, conf)?;

        let ca_bundle_path = match &args.ca_bundle {
            Some(pem) => Some(dir.write(CA_BUNDLE, pem)?),
            None => None,
        };

        info!(
            endpoint = %endpoint,
            dir = %dir.path().display(),
            "Prepared mirror registry configuration"
        );

        Ok(MirrorArtifacts {
            endpoint,
            auth_file_path,
            registries_conf,
            ca_bundle_path,
        })
    }
}

/// Mirror location of a release repository on `endpoint`
pub fn mirror_location(endpoint: &str, path: &str) -> String {
    let host = endpoint
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("{}/{}", host, path)
}

fn registries_conf(endpoint: &str, insecure: bool) -> Result<String> {
    let conf = RegistriesConf {
        unqualified_search_registries: Vec::new(),
        registry: RELEASE_REPOSITORIES
            .iter()
            .map(|(source, path)| Registry {
                prefix: String::new(),
                location: source.to_string(),
                mirror_by_digest_only: true,
                mirror: vec![RegistryMirror {
                    location: mirror_location(endpoint, path),
                    insecure,
                }],
            })
            .collect(),
    };
    toml::to_string(&conf).map_err(|e| ProvisionError::Config(format!("registries.conf: {}", e)))
}
