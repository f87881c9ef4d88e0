mod driver;
mod statement;

pub use driver::{BackendKind, CursorMode, Driver, Session};
pub use statement::{FetchOrientation, NativeStatement};
