use async_trait::async_trait;

use super::NativeStatement;
use crate::diagnostics::CallResult;

/// Which concrete backend a connection talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BackendKind {
    Postgres,
    InMemory,
}

/// Cursor model requested when a statement handle is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    ForwardOnly,
    /// Scrollable snapshot, required for absolute positioning.
    Static,
}

/// Trait for backend driver implementations.
/// A driver is responsible for:
/// - Naming itself in the connection descriptor
/// - Opening native sessions from a descriptor
#[async_trait]
pub trait Driver: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Driver identifier placed in the `Driver={...}` descriptor segment.
    fn name(&self) -> &str;

    /// Opens a session using a descriptor built by
    /// [`ConnectOptions::descriptor`](crate::ConnectOptions::descriptor).
    async fn connect(&self, descriptor: &str) -> CallResult<Box<dyn Session>>;
}

/// An open native session.
#[async_trait]
pub trait Session: Send + Sync {
    /// No-op round trip used to verify liveness.
    async fn ping(&self) -> CallResult<()>;

    async fn allocate_statement(&self, mode: CursorMode) -> CallResult<Box<dyn NativeStatement>>;

    async fn disconnect(&self) -> CallResult<()>;
}
