pub mod domain;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgReadingStore;
pub use store::{Metric, ReadingStore, Scope};
