//! `host`: one literal address.

use std::sync::Arc;

use locus_location::{ConfigBag, Location};
use locus_pool::{FixedListProvisioningLocation, MachineRef};
use locus_remote::SshMachineLocation;
use locus_spec::{expand_host_list, LocationSpec};

use crate::context::ResolutionContext;
use crate::error::ResolveError;
use crate::registry::LocationRegistry;
use crate::resolver::{LocationResolver, Resolved};

/// Resolves `host:("1.2.3.4")`, `host:(user@hostname)` or
/// `host:hostname` into a pool of exactly one ssh machine.
pub struct HostResolver;

impl LocationResolver for HostResolver {
    fn prefix(&self) -> &str {
        "host"
    }

    fn resolve(
        &self,
        spec: &LocationSpec,
        mut flags: ConfigBag,
        _registry: &LocationRegistry,
        _cx: &mut ResolutionContext,
    ) -> Result<Resolved, ResolveError> {
        let address = bare_arg(spec)
            .or_else(|| spec.segments().first().cloned())
            .or_else(|| flags.consume_str("hosts"));
        let Some(address) = address else {
            return Err(ResolveError::malformed(
                spec.raw(),
                "host requires an address",
            ));
        };

        let expanded = expand_host_list(&address)
            .map_err(|e| ResolveError::malformed(spec.raw(), e.to_string()))?;
        let [entry] = expanded.as_slice() else {
            return Err(ResolveError::malformed(
                spec.raw(),
                format!("host takes exactly one address, got {}", expanded.len()),
            ));
        };

        let (user, host) = match entry.split_once('@') {
            Some((user, host)) => (Some(user.to_string()), host.to_string()),
            None => (flags.consume_str("user"), entry.clone()),
        };
        let mut machine = SshMachineLocation::new(host);
        if let Some(user) = user {
            machine = machine.with_user(user);
        }
        let name = machine.display_name();
        let pool = FixedListProvisioningLocation::new(vec![Arc::new(machine) as MachineRef])
            .named(format!("host:{name}"));
        Ok(Resolved::pool(Arc::new(pool)))
    }
}

/// `host:("1.2.3.4")` parses its one quoted token as a key with an
/// empty value.
fn bare_arg(spec: &LocationSpec) -> Option<String> {
    let mut args = spec.args().iter();
    match (args.next(), args.next()) {
        (Some((key, value)), None) if value.is_empty() => Some(key.clone()),
        _ => None,
    }
}
