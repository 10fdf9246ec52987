pub mod memory;
pub mod postgres;
pub mod seed;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use seed::{seed_admin, seed_demo_catalog};
pub use store::{CatalogStore, IdentityStore, OrderStore, StatusUpdate, StorageError};
