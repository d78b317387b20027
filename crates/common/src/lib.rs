//! Shared types used across the checkout services.

pub mod types;

pub use types::{IdParseError, OrderId, ProductId, UserId};
