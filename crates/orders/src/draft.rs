//! Whole-order validation as a batch of independent lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricewise_catalog::{PartyId, ProductId};
use pricewise_core::{DomainError, DomainResult};

use crate::line::{LineRequest, OrderLine, OrderType};

/// An order as submitted: ordered lines, no identity of its own yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub order_type: OrderType,
    pub party_id: Option<PartyId>,
    pub lines: Vec<LineRequest>,
}

impl OrderDraft {
    pub fn new(order_type: OrderType) -> Self {
        Self {
            order_type,
            party_id: None,
            lines: Vec::new(),
        }
    }

    pub fn for_party(mut self, party_id: PartyId) -> Self {
        self.party_id = Some(party_id);
        self
    }

    pub fn line(mut self, request: LineRequest) -> Self {
        self.lines.push(request);
        self
    }
}

/// Result for one line; `line_number` is 1-based in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Accepted {
        line_number: u32,
        line: OrderLine,
    },
    Rejected {
        line_number: u32,
        product_id: ProductId,
        error: DomainError,
    },
}

impl LineOutcome {
    pub fn line_number(&self) -> u32 {
        match self {
            LineOutcome::Accepted { line_number, .. } | LineOutcome::Rejected { line_number, .. } => {
                *line_number
            }
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, LineOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderValidation {
    pub order_type: OrderType,
    pub lines: Vec<LineOutcome>,
    /// Sum of accepted subtotals.
    pub total: Decimal,
}

impl OrderValidation {
    /// Number lines in input order and total the accepted ones. A line whose
    /// subtotal would push the total out of `Decimal` range is rejected.
    pub fn assemble(
        order_type: OrderType,
        results: impl IntoIterator<Item = (ProductId, DomainResult<OrderLine>)>,
    ) -> Self {
        let mut total = Decimal::ZERO;
        let lines = results
            .into_iter()
            .zip(1u32..)
            .map(|((product_id, result), line_number)| match result {
                Ok(line) => match total.checked_add(line.subtotal) {
                    Some(sum) => {
                        total = sum;
                        LineOutcome::Accepted { line_number, line }
                    }
                    None => LineOutcome::Rejected {
                        line_number,
                        product_id,
                        error: DomainError::validation(
                            "order total exceeds the representable range",
                        ),
                    },
                },
                Err(error) => LineOutcome::Rejected {
                    line_number,
                    product_id,
                    error,
                },
            })
            .collect();

        Self {
            order_type,
            lines,
            total,
        }
    }

    /// True iff every line was accepted (warnings allowed).
    pub fn is_acceptable(&self) -> bool {
        self.lines.iter().all(LineOutcome::is_accepted)
    }

    pub fn rejected(&self) -> impl Iterator<Item = &LineOutcome> {
        self.lines.iter().filter(|l| !l.is_accepted())
    }
}
