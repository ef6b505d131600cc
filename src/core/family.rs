//! Address family selection
//!
//! Direct rules are namespaced per family. A descriptor is materialized for
//! the family of its address literals, or for both families when it carries
//! no address at all.

use ipnetwork::IpNetwork;
use tracing::debug;

use crate::core::error::{Error, Result};
use crate::core::rule::RuleDescriptor;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum AddressFamily {
    #[strum(serialize = "ipv4")]
    V4,
    #[strum(serialize = "ipv6")]
    V6,
}

/// Families tried when a rule names no address
pub const ALL_FAMILIES: [AddressFamily; 2] = [AddressFamily::V4, AddressFamily::V6];

/// Classifies an optional address field. Blank counts as absent.
fn classify(field: &'static str, value: Option<&str>) -> Result<Option<AddressFamily>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let network: IpNetwork = value.parse().map_err(|_| Error::InvalidAddress {
        field,
        value: value.to_string(),
    })?;

    Ok(Some(if network.is_ipv4() {
        AddressFamily::V4
    } else {
        AddressFamily::V6
    }))
}

/// Selects the families a descriptor must be compiled for, in apply order.
///
/// IPv4 is checked across source and destination before IPv6, so a rule with
/// an IPv4 source and an IPv6 destination is treated as IPv4.
///
/// # Errors
///
/// Returns `Error::InvalidAddress` when a non-blank address is not an IP
/// literal or CIDR.
pub fn select_families(descriptor: &RuleDescriptor) -> Result<Vec<AddressFamily>> {
    let source = classify("source", descriptor.source.as_deref())?;
    let destination = classify("destination", descriptor.destination.as_deref())?;

    let has = |family: AddressFamily| source == Some(family) || destination == Some(family);

    let families = if has(AddressFamily::V4) {
        vec![AddressFamily::V4]
    } else if has(AddressFamily::V6) {
        vec![AddressFamily::V6]
    } else {
        ALL_FAMILIES.to_vec()
    };

    debug!(
        rule = descriptor.display_name(),
        ?families,
        "Selected address families"
    );
    Ok(families)
}
