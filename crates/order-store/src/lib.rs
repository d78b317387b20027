//! Durable, transactional persistence for the order aggregate.
//!
//! An order header and its items are always written as one unit; readers never
//! observe one without the other.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{OrderStore, validate_new_order};
