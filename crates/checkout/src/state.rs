//! Checkout state machine.

/// The stage an order-creation request has reached.
///
/// State transitions:
/// ```text
/// Validating ──► PricingAndStockCheck ──► Authorizing ──► Committing ──► Done
///      │                  │                    │              │
///      └──────────────────┴────────────────────┴──────────────┴──► Rejected(reason)
/// ```
///
/// Rejection is carried by the returned `CheckoutError`, not by a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckoutStage {
    /// Request shape and identifiers are being checked.
    #[default]
    Validating,

    /// Catalog snapshots are being fetched and the total computed.
    PricingAndStockCheck,

    /// The single payment authorization is in flight.
    Authorizing,

    /// The order is being written to the store.
    Committing,

    /// The order is committed (terminal state).
    Done,
}

impl CheckoutStage {
    /// Returns the stage name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStage::Validating => "Validating",
            CheckoutStage::PricingAndStockCheck => "PricingAndStockCheck",
            CheckoutStage::Authorizing => "Authorizing",
            CheckoutStage::Committing => "Committing",
            CheckoutStage::Done => "Done",
        }
    }
}

impl std::fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stage_is_validating() {
        assert_eq!(CheckoutStage::default(), CheckoutStage::Validating);
    }

    #[test]
    fn test_display() {
        assert_eq!(CheckoutStage::Validating.to_string(), "Validating");
        assert_eq!(
            CheckoutStage::PricingAndStockCheck.to_string(),
            "PricingAndStockCheck"
        );
        assert_eq!(CheckoutStage::Authorizing.to_string(), "Authorizing");
        assert_eq!(CheckoutStage::Committing.to_string(), "Committing");
        assert_eq!(CheckoutStage::Done.to_string(), "Done");
    }
}
