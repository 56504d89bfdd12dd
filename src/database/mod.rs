pub mod pool;
pub mod postgres;
pub mod storage;

pub use postgres::PgStorage;
pub use storage::{KeyValueStore, MemoryStorage};
