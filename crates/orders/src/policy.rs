use serde::{Deserialize, Serialize};

/// What to do when a sales line asks for more than is on hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockShortfallPolicy {
    /// Accept the line with an `insufficient_stock` warning (backorder).
    #[default]
    Warn,
    /// Reject the line with an `insufficient_stock` policy violation.
    Reject,
}

/// Tunable commercial checks applied by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    pub stock_shortfall: StockShortfallPolicy,
    /// Reject purchase lines below the product's minimum order quantity.
    pub enforce_moq: bool,
    pub packaging_alignment_warnings: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            stock_shortfall: StockShortfallPolicy::Warn,
            enforce_moq: true,
            packaging_alignment_warnings: true,
        }
    }
}
