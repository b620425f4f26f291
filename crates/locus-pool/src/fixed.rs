//! The fixed-list machine pool.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use locus_location::{ConfigBag, Location, LocationCore};
use locus_remote::SshMachineLocation;
use locus_spec::expand_host_list;
use locus_types::LocationId;

use crate::error::PoolError;
use crate::traits::{MachineProvisioner, MachineRef, ObtainFlags};

/// Supplies one more machine for an extensible pool.
pub type MachineSource = Box<dyn Fn() -> Result<MachineRef, PoolError> + Send + Sync>;

/// A pool leasing machines from a fixed candidate list.
///
/// The list is closed unless a [`MachineSource`] makes the pool
/// extensible, in which case an exhausted `obtain` provisions exactly
/// one more machine and retries the selection once.
///
/// Lease bookkeeping invariants, held under the pool lock at all
/// times: `in_use ⊆ all`, `pending_removal ⊆ in_use`, and the
/// available set is `all − in_use` in insertion order.
pub struct FixedListProvisioningLocation {
    core: LocationCore,
    state: Mutex<PoolState>,
    source: Option<MachineSource>,
}

struct PoolState {
    all: Vec<MachineRef>,
    in_use: BTreeSet<LocationId>,
    pending_removal: BTreeSet<LocationId>,
}

impl std::fmt::Debug for FixedListProvisioningLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FixedListProvisioningLocation")
            .field("id", &self.core.id())
            .field("name", &self.core.display_name())
            .field("all", &state.all.len())
            .field("in_use", &state.in_use.len())
            .field("extensible", &self.source.is_some())
            .finish()
    }
}

impl FixedListProvisioningLocation {
    /// A closed pool over the given machines.
    #[must_use]
    pub fn new(machines: Vec<MachineRef>) -> Self {
        Self::assemble(LocationCore::new(), machines, None)
    }

    /// An extensible pool: when the list is exhausted, `source`
    /// provisions one more machine.
    #[must_use]
    pub fn extensible(machines: Vec<MachineRef>, source: MachineSource) -> Self {
        Self::assemble(LocationCore::new(), machines, Some(source))
    }

    fn assemble(core: LocationCore, machines: Vec<MachineRef>, source: Option<MachineSource>) -> Self {
        Self {
            core,
            state: Mutex::new(PoolState {
                all: machines,
                in_use: BTreeSet::new(),
                pending_removal: BTreeSet::new(),
            }),
            source,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(self, name: impl Into<String>) -> Self {
        self.core.set_display_name(name);
        self
    }

    /// Adds a machine to the candidate list.
    pub fn add_machine(&self, machine: MachineRef) {
        let mut state = self.state.lock();
        debug!(pool = %self.display_name(), machine = %machine.id(), "adding machine");
        state.all.push(machine);
    }

    /// Removes a machine from the candidate list.
    ///
    /// A machine currently leased out is not removed immediately: the
    /// removal is deferred and completed by its eventual `release`.
    ///
    /// # Errors
    ///
    /// [`PoolError::MachineUnknown`] when the machine is not in the
    /// list.
    pub fn remove_machine(&self, machine: &MachineRef) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        let id = machine.id();
        if !state.all.iter().any(|m| m.id() == id) {
            return Err(PoolError::MachineUnknown {
                pool: self.display_name(),
                machine: id,
            });
        }
        if state.in_use.contains(&id) {
            info!(pool = %self.display_name(), machine = %id, "machine leased, deferring removal");
            state.pending_removal.insert(id);
        } else {
            state.all.retain(|m| m.id() != id);
        }
        Ok(())
    }

    /// Snapshot of the whole candidate list, leased machines included.
    #[must_use]
    pub fn all_machines(&self) -> Vec<MachineRef> {
        self.state.lock().all.clone()
    }

    /// Snapshot of the currently available machines, in insertion
    /// order.
    #[must_use]
    pub fn available_machines(&self) -> Vec<MachineRef> {
        let state = self.state.lock();
        state
            .all
            .iter()
            .filter(|m| !state.in_use.contains(&m.id()))
            .cloned()
            .collect()
    }

    /// Number of machines currently leased out.
    #[must_use]
    pub fn in_use_count(&self) -> usize {
        self.state.lock().in_use.len()
    }

    fn select(&self, state: &PoolState, flags: &ObtainFlags) -> Result<Option<MachineRef>, PoolError> {
        if let Some(desired) = flags.desired_machine {
            let Some(machine) = state.all.iter().find(|m| m.id() == desired) else {
                return Err(PoolError::MachineUnknown {
                    pool: self.display_name(),
                    machine: desired,
                });
            };
            if state.in_use.contains(&desired) {
                return Err(PoolError::MachineInUse {
                    pool: self.display_name(),
                    machine: desired,
                });
            }
            return Ok(Some(Arc::clone(machine)));
        }
        Ok(state
            .all
            .iter()
            .find(|m| !state.in_use.contains(&m.id()))
            .cloned())
    }
}

impl Location for FixedListProvisioningLocation {
    fn core(&self) -> &LocationCore {
        &self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl MachineProvisioner for FixedListProvisioningLocation {
    fn obtain(&self, flags: &ObtainFlags) -> Result<MachineRef, PoolError> {
        let mut state = self.state.lock();

        let mut selected = self.select(&state, flags)?;
        if selected.is_none() {
            if let Some(source) = &self.source {
                // provision exactly one more machine, then retry the
                // selection once; the pool lock is held throughout so
                // no other caller can steal the new machine
                debug!(pool = %self.display_name(), "pool exhausted, provisioning one machine");
                let provisioned = source()?;
                state.all.push(provisioned);
                selected = self.select(&state, flags)?;
            }
        }

        match selected {
            Some(machine) => {
                state.in_use.insert(machine.id());
                debug!(pool = %self.display_name(), machine = %machine.id(), "leased machine");
                Ok(machine)
            }
            None => Err(PoolError::NoMachinesAvailable {
                pool: self.display_name(),
                reason: if self.source.is_some() {
                    "all machines leased and provisioning yielded none".to_string()
                } else {
                    format!("all {} machines leased", state.all.len())
                },
            }),
        }
    }

    fn release(&self, machine: &MachineRef) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        let id = machine.id();
        if !state.in_use.remove(&id) {
            return Err(PoolError::NotLeasedHere {
                pool: self.display_name(),
                machine: id,
            });
        }
        if state.pending_removal.remove(&id) {
            info!(pool = %self.display_name(), machine = %id, "completing deferred removal");
            state.all.retain(|m| m.id() != id);
        }
        debug!(pool = %self.display_name(), machine = %id, "released machine");
        Ok(())
    }
}

/// Builds a fixed-list pool from host entries.
///
/// Entries accept brace-expansion globs and numeric ranges
/// (`host{1,2}`, `node{1-3}`) and an optional `user@` part that
/// overrides the builder-wide default user.
///
/// # Example
///
/// ```
/// use locus_pool::FixedListBuilder;
///
/// let pool = FixedListBuilder::new()
///     .default_user("admin")
///     .add_hosts("10.0.0.1, deploy@web{1-2}")?
///     .named("mypool")
///     .build();
/// assert_eq!(pool.all_machines().len(), 3);
/// # Ok::<(), locus_pool::PoolError>(())
/// ```
#[derive(Debug, Default)]
pub struct FixedListBuilder {
    default_user: Option<String>,
    name: Option<String>,
    machines: Vec<MachineRef>,
}

impl FixedListBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// User applied to hosts without their own `user@` part.
    #[must_use]
    pub fn default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = Some(user.into());
        self
    }

    /// Pool display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds machines from a comma-separated, glob-expandable host
    /// list.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidHosts`] for malformed globs or an empty
    /// expansion.
    pub fn add_hosts(mut self, value: &str) -> Result<Self, PoolError> {
        let expanded = expand_host_list(value).map_err(|e| PoolError::InvalidHosts {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
        if expanded.is_empty() {
            return Err(PoolError::InvalidHosts {
                value: value.to_string(),
                reason: "expands to no hosts".to_string(),
            });
        }
        for entry in expanded {
            let (user, address) = match entry.split_once('@') {
                Some((user, host)) => (Some(user.to_string()), host.to_string()),
                None => (self.default_user.clone(), entry),
            };
            let mut machine = SshMachineLocation::new(address);
            if let Some(user) = user {
                machine = machine.with_user(user);
            }
            self.machines.push(Arc::new(machine));
        }
        Ok(self)
    }

    /// Adds an already-built machine.
    #[must_use]
    pub fn add_machine(mut self, machine: MachineRef) -> Self {
        self.machines.push(machine);
        self
    }

    /// Builds the closed pool.
    #[must_use]
    pub fn build(self) -> FixedListProvisioningLocation {
        let pool = FixedListProvisioningLocation::new(self.machines);
        if let Some(name) = self.name {
            pool.core.set_display_name(name);
        }
        pool
    }

    /// Builds the pool from construction flags plus the builder state:
    /// consumes `hosts`, `user` and the common location flags.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidHosts`] for a malformed `hosts` value.
    pub fn build_from_flags(mut self, mut bag: ConfigBag) -> Result<FixedListProvisioningLocation, PoolError> {
        let core = LocationCore::configured(&mut bag);
        if let Some(user) = bag.consume_str("user") {
            self.default_user = Some(user);
        }
        if let Some(hosts) = bag.consume_str("hosts") {
            self = self.add_hosts(&hosts)?;
        }
        core.absorb_leftovers(bag);
        if let Some(name) = self.name {
            core.set_display_name(name);
        }
        Ok(FixedListProvisioningLocation::assemble(core, self.machines, None))
    }
}
