//! Validated pooling of SSH transport handles.

use std::ops::Deref;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::RemoteExecError;
use crate::tool::SshTool;

type Supplier = Box<dyn Fn() -> Result<Box<dyn SshTool>, RemoteExecError> + Send + Sync>;

/// A pool of reusable transport handles for one target.
///
/// Handles are supplied on demand, validated before reuse (a handle is
/// viable only while its liveness check passes), and explicitly closed
/// on eviction and shutdown. The pool starts empty and is never
/// persisted; after any process restart it is rebuilt fresh, since live
/// transport handles cannot cross a process boundary.
pub struct SshToolPool {
    name: String,
    supplier: Supplier,
    idle: Mutex<Vec<Box<dyn SshTool>>>,
}

impl std::fmt::Debug for SshToolPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshToolPool")
            .field("name", &self.name)
            .field("idle", &self.idle.lock().len())
            .finish()
    }
}

impl SshToolPool {
    /// Creates an empty pool over a handle supplier.
    #[must_use]
    pub fn new(name: impl Into<String>, supplier: Supplier) -> Self {
        Self {
            name: name.into(),
            supplier,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Leases a handle: the most recently returned viable one, or a
    /// freshly supplied handle when none survives validation.
    ///
    /// Handles that fail the liveness check are closed and dropped, not
    /// handed out.
    pub fn lease(&self) -> Result<PooledTool<'_>, RemoteExecError> {
        loop {
            let candidate = self.idle.lock().pop();
            match candidate {
                Some(tool) if tool.is_connected() => {
                    return Ok(PooledTool {
                        pool: self,
                        tool: Some(tool),
                    });
                }
                Some(stale) => {
                    debug!(pool = %self.name, "evicting non-viable pooled handle");
                    stale.close();
                }
                None => {
                    let tool = (self.supplier)()?;
                    return Ok(PooledTool {
                        pool: self,
                        tool: Some(tool),
                    });
                }
            }
        }
    }

    /// Number of idle handles, for tests and diagnostics.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Closes and drops every idle handle.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.idle.lock().drain(..).collect();
        debug!(pool = %self.name, count = drained.len(), "closing pooled handles");
        for tool in drained {
            tool.close();
        }
    }

    fn give_back(&self, tool: Box<dyn SshTool>) {
        self.idle.lock().push(tool);
    }
}

impl Drop for SshToolPool {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// A leased handle; returns to the pool on drop unless discarded.
pub struct PooledTool<'p> {
    pool: &'p SshToolPool,
    tool: Option<Box<dyn SshTool>>,
}

impl PooledTool<'_> {
    /// Closes the handle instead of returning it to the pool.
    pub fn discard(mut self) {
        if let Some(tool) = self.tool.take() {
            tool.close();
        }
    }
}

impl Deref for PooledTool<'_> {
    type Target = dyn SshTool;

    fn deref(&self) -> &Self::Target {
        self.tool
            .as_deref()
            .expect("leased tool present until drop")
    }
}

impl Drop for PooledTool<'_> {
    fn drop(&mut self) {
        if let Some(tool) = self.tool.take() {
            self.pool.give_back(tool);
        }
    }
}
