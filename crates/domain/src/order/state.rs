//! Order status.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of a committed order.
///
/// Checkout only ever commits paid orders, so `Confirmed` is the single
/// reachable status. There is no update path out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Payment was authorized and the order was recorded.
    #[default]
    Confirmed,
}

impl OrderStatus {
    /// Returns the status name as stored and displayed.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "Confirmed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Confirmed" => Ok(OrderStatus::Confirmed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
