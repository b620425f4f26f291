//! A machine reachable over SSH, as a location.

use std::collections::BTreeSet;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use locus_location::{ConfigBag, Location, LocationCore, MachineLocation, PortSupplier};
use locus_types::PortRange;

use crate::error::RemoteExecError;
use crate::exec::{run_streamed, ExecResult};
use crate::mutex::MutexTable;
use crate::openssh::OpenSshTool;
use crate::pool::SshToolPool;
use crate::tool::{ExecOptions, SshConfig, SshTool};

/// Best-effort timeout for local reachability probes.
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// A location representing one machine addressable over SSH.
///
/// Owns the channel state for that machine: a validated pool of
/// transport handles, a string-keyed [`MutexTable`], and the set of TCP
/// ports this channel has claimed. All of it is per-instance and
/// rebuilt empty whenever the machine is constructed; none of it
/// survives a process boundary.
///
/// # Example
///
/// ```no_run
/// use locus_remote::{ExecOptions, SshMachineLocation};
///
/// let machine = SshMachineLocation::new("10.0.0.5").with_user("admin");
/// let result = machine.exec_commands(
///     &ExecOptions::summary("uptime check"),
///     &["uptime".to_string()],
/// )?;
/// assert!(result.success());
/// # Ok::<(), locus_remote::RemoteExecError>(())
/// ```
pub struct SshMachineLocation {
    core: LocationCore,
    config: SshConfig,
    tool_factory: Arc<dyn Fn(&SshConfig) -> Box<dyn SshTool> + Send + Sync>,
    pool: SshToolPool,
    mutexes: MutexTable,
    used_ports: Mutex<BTreeSet<u16>>,
    /// Ports this channel has claimed at least once; repeat claims skip
    /// the OS probe.
    ever_claimed: Mutex<BTreeSet<u16>>,
    /// Whether any connection to this channel ever succeeded; gates the
    /// enriched first-failure diagnostic.
    previously_connected: AtomicBool,
}

impl std::fmt::Debug for SshMachineLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshMachineLocation")
            .field("id", &self.core.id())
            .field("target", &self.config.target())
            .finish()
    }
}

impl SshMachineLocation {
    /// Creates a machine for an address, with transport defaults and
    /// the system OpenSSH client.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_config(SshConfig::for_host(address), LocationCore::new())
    }

    /// Creates a machine from construction flags.
    ///
    /// Recognized here: `address` (alias `host`), `user`, `port`,
    /// `privateKeyFile`, plus the common location flags. Leftovers are
    /// kept as properties.
    #[must_use]
    pub fn from_flags(mut bag: ConfigBag) -> Self {
        let core = LocationCore::configured(&mut bag);
        let address = bag
            .consume_str("address")
            .or_else(|| bag.consume_str("host"))
            .unwrap_or_else(|| "localhost".to_string());
        let mut config = SshConfig::for_host(address);
        config.user = bag.consume_str("user");
        if let Some(port) = bag.consume_u64("port") {
            match u16::try_from(port) {
                Ok(port) => config.port = port,
                Err(_) => warn!(port, "ignoring out-of-range port flag"),
            }
        }
        config.private_key_file = bag.consume_str("privateKeyFile");
        core.absorb_leftovers(bag);
        Self::with_config(config, core)
    }

    fn with_config(config: SshConfig, core: LocationCore) -> Self {
        let factory: Arc<dyn Fn(&SshConfig) -> Box<dyn SshTool> + Send + Sync> =
            Arc::new(|config| Box::new(OpenSshTool::new(config.clone())));
        Self::assemble(config, core, factory)
    }

    fn assemble(
        config: SshConfig,
        core: LocationCore,
        tool_factory: Arc<dyn Fn(&SshConfig) -> Box<dyn SshTool> + Send + Sync>,
    ) -> Self {
        if core.custom_name().is_none() {
            core.set_display_name(config.target());
        }
        let pool_config = config.clone();
        let pool_factory = Arc::clone(&tool_factory);
        let pool = SshToolPool::new(
            format!("ssh:{}", config.target()),
            Box::new(move || Ok(pool_factory(&pool_config))),
        );
        Self {
            core,
            config,
            tool_factory,
            pool,
            mutexes: MutexTable::new(),
            used_ports: Mutex::new(BTreeSet::new()),
            ever_claimed: Mutex::new(BTreeSet::new()),
            previously_connected: AtomicBool::new(false),
        }
    }

    /// Sets the login user, refreshing the default display name.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        let had_default_name = self.core.custom_name().as_deref() == Some(&self.config.target());
        self.config.user = Some(user.into());
        if had_default_name {
            self.core.set_display_name(self.config.target());
        }
        self
    }

    /// Sets the SSH port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Substitutes the transport factory; used by tests and by
    /// embedders carrying their own transport.
    #[must_use]
    pub fn with_tool_factory(
        self,
        factory: impl Fn(&SshConfig) -> Box<dyn SshTool> + Send + Sync + 'static,
    ) -> Self {
        Self::assemble(self.config, self.core, Arc::new(factory))
    }

    /// The `user@host` target of this channel.
    #[must_use]
    pub fn target(&self) -> String {
        self.config.target()
    }

    /// The per-channel mutex table.
    #[must_use]
    pub fn mutexes(&self) -> &MutexTable {
        &self.mutexes
    }

    /// Runs commands by feeding each as a line to an interactive login
    /// shell on the machine. A non-zero exit from one line does not
    /// stop the following lines.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteExecError`] for transport or I/O faults. A
    /// non-zero remote exit code is a normal [`ExecResult`].
    pub fn exec_commands(
        &self,
        opts: &ExecOptions,
        commands: &[String],
    ) -> Result<ExecResult, RemoteExecError> {
        self.exec(opts, commands, false)
    }

    /// Runs commands as a script file on the machine, executed as one
    /// process.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteExecError`] for transport or I/O faults.
    pub fn exec_script(
        &self,
        opts: &ExecOptions,
        commands: &[String],
    ) -> Result<ExecResult, RemoteExecError> {
        self.exec(opts, commands, true)
    }

    fn exec(
        &self,
        opts: &ExecOptions,
        commands: &[String],
        script: bool,
    ) -> Result<ExecResult, RemoteExecError> {
        debug!(
            machine = %self.target(),
            summary = %opts.summary,
            commands = commands.len(),
            script,
            "executing remote commands"
        );
        if opts.needs_dedicated_connection() {
            // auth/transport-affecting flags cannot share pooled
            // handles; one dedicated connection, torn down after use
            let config = self.config.with_overrides(&opts.transport);
            let tool = (self.tool_factory)(&config);
            self.connect_checked(tool.as_ref())?;
            let outcome = self.spawn_and_stream(tool.as_ref(), opts, commands, script);
            tool.close();
            outcome
        } else {
            let leased = self.pool.lease()?;
            if !leased.is_connected() {
                if let Err(e) = self.connect_checked(&*leased) {
                    leased.discard();
                    return Err(e);
                }
            }
            match self.spawn_and_stream(&*leased, opts, commands, script) {
                Ok(result) => Ok(result),
                Err(e) => {
                    // a faulted handle must not go back in the pool
                    leased.discard();
                    Err(e)
                }
            }
        }
    }

    fn spawn_and_stream(
        &self,
        tool: &dyn SshTool,
        opts: &ExecOptions,
        commands: &[String],
        script: bool,
    ) -> Result<ExecResult, RemoteExecError> {
        let process = if script {
            tool.spawn_script(opts, commands)?
        } else {
            tool.spawn_commands(opts, commands)?
        };
        run_streamed(process, opts, &self.target())
    }

    /// Connects a tool, wrapping the first-ever failure on this channel
    /// in the extended setup diagnostic. Later reconnect failures
    /// propagate raw.
    fn connect_checked(&self, tool: &dyn SshTool) -> Result<(), RemoteExecError> {
        match tool.connect() {
            Ok(()) => {
                self.previously_connected.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(source) if !self.previously_connected.load(Ordering::SeqCst) => {
                Err(RemoteExecError::FirstConnect {
                    target: self.target(),
                    source: Box::new(source),
                })
            }
            Err(source) => Err(source),
        }
    }

    /// Best-effort probe: TCP connect to the SSH port, then a trivial
    /// command. Never errors; unknown means unreachable.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        if !self.port_answers(self.config.port) {
            debug!(machine = %self.target(), "not reachable: ssh port closed");
            return false;
        }
        match self.exec_commands(&ExecOptions::summary("isReachable"), &["true".to_string()]) {
            Ok(result) => result.success(),
            Err(e) => {
                debug!(machine = %self.target(), error = %e, "not reachable");
                false
            }
        }
    }

    /// Whether something on the machine accepts connections on `port`.
    fn port_answers(&self, port: u16) -> bool {
        let Ok(addrs) = (self.config.host.as_str(), port).to_socket_addrs() else {
            return false;
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok() {
                return true;
            }
        }
        false
    }
}

impl Location for SshMachineLocation {
    fn core(&self) -> &LocationCore {
        &self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn close(&self) {
        debug!(machine = %self.target(), "closing remote channel");
        self.pool.close_all();
    }
}

impl MachineLocation for SshMachineLocation {
    fn address(&self) -> String {
        self.config.host.clone()
    }

    fn user(&self) -> Option<String> {
        self.config.user.clone()
    }
}

impl PortSupplier for SshMachineLocation {
    fn obtain_specific_port(&self, port: u16) -> bool {
        let mut used = self.used_ports.lock();
        if used.contains(&port) {
            return false;
        }
        // ports below 1024 are trusted; the first-ever claim of a
        // higher port gets a best-effort "is it actually free" probe
        let first_claim = !self.ever_claimed.lock().contains(&port);
        if port >= 1024 && first_claim && self.port_answers(port) {
            debug!(machine = %self.target(), port, "port already answers, refusing claim");
            return false;
        }
        used.insert(port);
        self.ever_claimed.lock().insert(port);
        true
    }

    fn obtain_port(&self, range: &PortRange) -> Option<u16> {
        let claimed = range.iter().find(|p| self.obtain_specific_port(*p));
        if claimed.is_none() {
            debug!(machine = %self.target(), range = %range, "no obtainable port in range");
        }
        claimed
    }

    fn release_port(&self, port: u16) {
        self.used_ports.lock().remove(&port);
    }
}
