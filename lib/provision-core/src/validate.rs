//! Cluster spec validation
//!
//! Rules run in a fixed order and the first failure is reported, so the same
//! spec always produces the same error.

use crate::error::ValidationError;
use ipnetwork::IpNetwork;
use provision_api::v1alpha1::cluster::SUPPORTED_NETWORK_TYPE;
use provision_api::ClusterSpec;
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// Check a cluster spec. Has no side effects.
pub fn validate(spec: &ClusterSpec) -> Result<(), ValidationError> {
    check_network_type(spec)?;
    check_control_plane_replicas(spec.control_plane_replicas)?;
    let machine_network = check_networks(spec)?;
    check_rendezvous_ip(spec, &machine_network)?;
    check_host_addresses(spec, &machine_network)?;
    check_mirror(spec)?;
    check_boot_image_sources(spec)?;

    debug!(cluster = %spec.cluster_name, "cluster spec is valid");
    Ok(())
}

/// Whether two networks share any address
pub fn cidrs_overlap(a: &IpNetwork, b: &IpNetwork) -> bool {
    a.contains(b.network()) || b.contains(a.network())
}

fn check_network_type(spec: &ClusterSpec) -> Result<(), ValidationError> {
    if spec.networking.network_type != SUPPORTED_NETWORK_TYPE {
        return Err(ValidationError::UnsupportedNetworkType {
            found: spec.networking.network_type.clone(),
            expected: SUPPORTED_NETWORK_TYPE,
        });
    }
    Ok(())
}

fn check_control_plane_replicas(replicas: u32) -> Result<(), ValidationError> {
    match replicas {
        1 => Ok(()),
        n if n >= 3 => Ok(()),
        n => Err(ValidationError::InvalidControlPlaneReplicas(n)),
    }
}

fn parse_cidr(field: &'static str, value: &str) -> Result<IpNetwork, ValidationError> {
    value.parse().map_err(|_| ValidationError::InvalidCidr {
        field,
        value: value.to_string(),
    })
}

/// Parse the three networks, reject overlaps and return the machine network
fn check_networks(spec: &ClusterSpec) -> Result<IpNetwork, ValidationError> {
    let networking = &spec.networking;
    let networks = [
        (
            "networking.clusterNetwork.cidr",
            parse_cidr("networking.clusterNetwork.cidr", &networking.cluster_network.cidr)?,
        ),
        (
            "networking.serviceCIDR",
            parse_cidr("networking.serviceCIDR", &networking.service_cidr)?,
        ),
        (
            "networking.machineCIDR",
            parse_cidr("networking.machineCIDR", &networking.machine_cidr)?,
        ),
    ];

    for (i, (first, first_net)) in networks.iter().enumerate() {
        for (second, second_net) in &networks[i + 1..] {
            if cidrs_overlap(first_net, second_net) {
                return Err(ValidationError::OverlappingCidrs {
                    first: *first,
                    first_cidr: first_net.to_string(),
                    second: *second,
                    second_cidr: second_net.to_string(),
                });
            }
        }
    }

    Ok(networks[2].1)
}

fn check_rendezvous_ip(
    spec: &ClusterSpec,
    machine_network: &IpNetwork,
) -> Result<(), ValidationError> {
    let replicas = spec.total_replicas();
    let Some(raw) = spec.rendezvous_ip() else {
        if replicas > 1 {
            return Err(ValidationError::MissingRendezvousIp { replicas });
        }
        return Ok(());
    };

    let ip: IpAddr = raw
        .parse()
        .map_err(|_| ValidationError::InvalidRendezvousIp(raw.to_string()))?;

    if !machine_network.contains(ip) {
        return Err(ValidationError::RendezvousOutsideMachineNetwork {
            ip: ip.to_string(),
            machine_cidr: machine_network.to_string(),
        });
    }
    Ok(())
}

fn check_host_addresses(
    spec: &ClusterSpec,
    machine_network: &IpNetwork,
) -> Result<(), ValidationError> {
    for (index, host) in spec.hosts().iter().enumerate() {
        for address in host.static_ipv4_addresses() {
            let ip: Ipv4Addr =
                address
                    .parse()
                    .map_err(|_| ValidationError::InvalidHostAddress {
                        host: host.display_name(index),
                        address: address.clone(),
                    })?;

            if !machine_network.contains(IpAddr::V4(ip)) {
                return Err(ValidationError::HostAddressOutsideMachineNetwork {
                    host: host.display_name(index),
                    address,
                    machine_cidr: machine_network.to_string(),
                });
            }
        }
    }
    Ok(())
}

// A mirror endpoint on its own leaves the installer without trust or pull
// rewrites, so both files are required.
fn check_mirror(spec: &ClusterSpec) -> Result<(), ValidationError> {
    let Some(mirror) = &spec.mirror else {
        return Ok(());
    };

    let missing = match (&mirror.ca_bundle, &mirror.registries_conf) {
        (Some(_), Some(_)) => return Ok(()),
        (None, None) => "caBundle and registriesConf",
        (None, Some(_)) => "caBundle",
        (Some(_), None) => "registriesConf",
    };

    Err(ValidationError::IncompleteMirror {
        endpoint: mirror.endpoint.clone(),
        missing,
    })
}

fn check_boot_image_sources(spec: &ClusterSpec) -> Result<(), ValidationError> {
    if spec.serve_from.is_some() {
        return Ok(());
    }
    match spec.bmc.iter().find(|host| host.iso_url.is_none()) {
        Some(host) => Err(ValidationError::MissingBootImageUrl {
            host: host.display_name().to_string(),
        }),
        None => Ok(()),
    }
}
