//! Command line interface

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use provision_api::{ClusterSpec, MirrorSpec};
use provision_assets::{AssetGenerator, InstallerCommand, MirrorRegistry, MirrorRegistryArgs};
use provision_core::{validate, Clock, TokioClock, WorkDir};
use provision_install::{CompletionWaiter, DelegateWaiter, FilePoller};
use provision_orchestrator::{ProvisionMetrics, Provisioner};
use provision_redfish::RedfishMounter;
use serde::Serialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Bare-metal cluster provisioning with agent-based installs
#[derive(Parser, Debug)]
#[command(name = "cluster-provisioner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate, build the boot image, mount it on the hosts and wait for the install
    Provision(ProvisionArgs),
    /// Check a cluster spec without touching anything
    Validate(SpecArgs),
    /// Write the installer documents into a working directory
    Render(RenderArgs),
    /// Print the JSON schema of the cluster spec
    Schema,
    /// Prepare mirror registry files for a disconnected install
    Mirror(MirrorArgs),
}

#[derive(Args, Debug)]
pub struct SpecArgs {
    /// Cluster spec file (YAML or JSON)
    #[arg(short = 'f', long)]
    pub spec: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WaitStrategy {
    /// Run the installer's own wait-for command
    Delegate,
    /// Poll the working directory for credentials
    Poll,
}

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Working directory, overriding the spec's
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Installer binary
    #[arg(long, env = "PROVISION_INSTALLER", default_value = "openshift-install")]
    pub installer: PathBuf,

    /// Installer log level
    #[arg(long, default_value = "info")]
    pub installer_log_level: String,

    /// How install completion is observed
    #[arg(long, value_enum, default_value_t = WaitStrategy::Delegate)]
    pub wait: WaitStrategy,

    /// Install completion timeout in minutes
    #[arg(long, env = "PROVISION_INSTALL_TIMEOUT_MINS", default_value_t = 90)]
    pub install_timeout_mins: u64,

    /// Also wait for bootstrap completion, bounded by this many minutes
    #[arg(long, env = "PROVISION_BOOTSTRAP_TIMEOUT_MINS")]
    pub bootstrap_timeout_mins: Option<u64>,

    /// Credential poll interval in seconds (poll strategy)
    #[arg(long, default_value_t = 30)]
    pub poll_interval_secs: u64,

    /// Timeout of a single Redfish request in seconds
    #[arg(long, default_value_t = 30)]
    pub redfish_timeout_secs: u64,

    /// Local address the boot image server binds; the unspecified address
    /// of the served address's family when unset
    #[arg(long)]
    pub serve_bind: Option<IpAddr>,

    /// Write Prometheus metrics here when the attempt ends
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Working directory, overriding the spec's
    #[arg(long)]
    pub workdir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MirrorArgs {
    /// Registry host serving the mirrored release
    #[arg(long)]
    pub registry_host: Option<String>,

    /// PEM bundle trusted for the registry
    #[arg(long)]
    pub ca_bundle: Option<PathBuf>,

    /// Registry auth JSON
    #[arg(long)]
    pub auth_file: Option<PathBuf>,

    /// Pull from the mirror without TLS verification
    #[arg(long)]
    pub insecure: bool,

    /// Output directory; a temporary one is created when unset
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Provision(args) => provision(args).await,
            Commands::Validate(args) => {
                let spec = load_spec(&args.spec)?;
                check(&args.spec, &spec)?;
                println!("{} is valid", args.spec.display());
                Ok(())
            }
            Commands::Render(args) => render(args),
            Commands::Schema => {
                let schema = schemars::schema_for!(ClusterSpec);
                println!("{}", serde_json::to_string_pretty(&schema)?);
                Ok(())
            }
            Commands::Mirror(args) => mirror(args),
        }
    }
}

fn load_spec(path: &Path) -> Result<ClusterSpec> {
    ClusterSpec::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn check(path: &Path, spec: &ClusterSpec) -> Result<()> {
    if let Err(e) = validate(spec) {
        bail!("{} is invalid at {}: {}", path.display(), e.field(), e);
    }
    Ok(())
}

async fn provision(args: ProvisionArgs) -> Result<()> {
    let mut spec = load_spec(&args.spec.spec)?;
    if let Some(workdir) = args.workdir.clone() {
        spec.workdir = Some(workdir);
    }

    let clock: Arc<dyn Clock> = Arc::new(TokioClock);
    let installer = InstallerCommand::new(&args.installer).with_log_level(&args.installer_log_level);

    let completion: Arc<dyn CompletionWaiter> = match args.wait {
        WaitStrategy::Delegate => {
            let mut waiter = DelegateWaiter::new(installer.clone(), clock.clone());
            if let Some(mins) = args.bootstrap_timeout_mins {
                waiter = waiter.with_bootstrap_timeout(Duration::from_secs(mins * 60));
            }
            Arc::new(waiter)
        }
        WaitStrategy::Poll => Arc::new(
            FilePoller::new(clock.clone()).with_interval(Duration::from_secs(args.poll_interval_secs)),
        ),
    };

    let mounter = RedfishMounter::new()
        .with_clock(clock)
        .with_request_timeout(Duration::from_secs(args.redfish_timeout_secs));

    let mut generator = AssetGenerator::new(Arc::new(installer));
    if let Some(bind) = args.serve_bind {
        generator = generator.with_serve_bind(bind);
    }

    let provisioner = Provisioner::new(
        generator,
        Arc::new(mounter),
        completion,
        Duration::from_secs(args.install_timeout_mins * 60),
        ProvisionMetrics::new()?,
    );

    let result = provisioner.provision(&spec).await;

    if let Some(path) = &args.metrics_file {
        let text = provisioner.metrics().gather()?;
        std::fs::write(path, text).with_context(|| format!("writing metrics to {}", path.display()))?;
    }

    match result {
        Ok(outcome) => {
            info!(console = %outcome.credentials.console_url, "Cluster provisioned");
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(e) => {
            if e.is_indeterminate() {
                error!("Attempt is indeterminate, the cluster may still be installing");
            }
            Err(e).context(format!("provisioning {} failed", spec.cluster_name))
        }
    }
}

fn render(args: RenderArgs) -> Result<()> {
    let spec = load_spec(&args.spec.spec)?;
    check(&args.spec.spec, &spec)?;

    let requested = args.workdir.as_deref().or(spec.workdir.as_deref());
    let workdir = WorkDir::prepare(requested)?;
    AssetGenerator::render(&spec, &workdir)?;

    println!("{}", workdir.path().display());
    Ok(())
}

#[derive(Serialize)]
struct MirrorBlock {
    mirror: MirrorSpec,
}

fn mirror(args: MirrorArgs) -> Result<()> {
    let read = |path: &Option<PathBuf>| -> Result<Option<String>> {
        path.as_ref()
            .map(|p| std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())))
            .transpose()
    };

    let registry_args = MirrorRegistryArgs {
        registry_host: args.registry_host.clone(),
        ca_bundle: read(&args.ca_bundle)?,
        auth: read(&args.auth_file)?,
        insecure: args.insecure,
    };
    let artifacts = MirrorRegistry::prepare(&registry_args, args.dir.as_deref())?;

    // Ready to paste into a cluster spec
    let block = MirrorBlock {
        mirror: artifacts.to_mirror_spec(),
    };
    print!("{}", serde_yaml::to_string(&block)?);
    Ok(())
}
