pub mod gc;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use gc::run_purge_cycle;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use traits::{KeyValueEntry, KeyValueStore, NewEntry, StorageError};
