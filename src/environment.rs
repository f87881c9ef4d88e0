use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::error::{DbIntError, Result};

/// Settings for the process-wide [`Environment`].
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// Worker threads driving backend I/O.
    pub worker_threads: usize,
    pub thread_name: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            worker_threads: 1,
            thread_name: "dbint-env".to_string(),
        }
    }
}

/// The driver environment shared by every connection.
///
/// Create it once at startup and pass it to each
/// [`Connection::connect`](crate::Connection::connect). It owns the runtime
/// that backend I/O runs on; every public operation blocks on it, so the
/// API is synchronous. It is torn down when the last connection holding it
/// and the owner's handle are dropped.
///
/// Do not call into a connection from inside an async context; blocking on
/// the environment's runtime from there panics.
pub struct Environment {
    runtime: Runtime,
    config: EnvironmentConfig,
    connections: AtomicUsize,
}

impl Environment {
    /// Creates an environment with the default configuration.
    pub fn new() -> Result<Arc<Self>> {
        Self::with_config(EnvironmentConfig::default())
    }

    pub fn with_config(config: EnvironmentConfig) -> Result<Arc<Self>> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()
            .map_err(|e| DbIntError::Environment(e.to_string()))?;
        debug!(worker_threads = config.worker_threads, "environment initialized");
        Ok(Arc::new(Self {
            runtime,
            config,
            connections: AtomicUsize::new(0),
        }))
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Number of connections currently holding this environment.
    pub fn open_connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub(crate) fn attach(&self) {
        self.connections.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn detach(&self) {
        self.connections.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        debug!("environment released");
    }
}
