mod placeholders;
mod rowset;
mod tokio_postgres;

pub use self::in_memory_test::{
    InMemoryTestDriver, InMemoryTestResponse, InMemoryTestResponseBuilder, RecordedQuery,
};
pub use self::tokio_postgres::TokioPostgresDriver;
