use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string-encoded identifier is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}': expected a positive integer")]
pub struct IdParseError {
    /// Which identifier was being parsed ("user ID", "product ID", ...).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw key without validation.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying integer key.
            pub fn as_i64(&self) -> i64 {
                self.0
            }

            /// Parses a string-encoded identifier.
            ///
            /// Surrounding whitespace is not accepted, and the value must be
            /// strictly positive.
            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                match value.parse::<i64>() {
                    Ok(id) if id > 0 => Ok(Self(id)),
                    _ => Err(IdParseError {
                        kind: $kind,
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Identifier of a user in the user directory.
    UserId,
    "user ID"
);

numeric_id!(
    /// Catalog key of a product.
    ProductId,
    "product ID"
);

numeric_id!(
    /// Identifier of a committed order. Assigned by the order store.
    OrderId,
    "order ID"
);
