//! Trade representation produced by the matching engine.
//!
//! A Trade links the bid and ask orders that were matched. Each leg carries
//! the resting order's own price at the instant of the match, so a crossed
//! pair can report different prices per side.

use crate::order;
use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

/// One leg of an execution: the order it touched, its resting price, and the
/// matched quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TradeSide {
    pub order_id: order::Id,
    pub price: order::Price,
    pub quantity: order::Quantity,
}

/// A single execution between a bid and an ask.
///
/// Both legs always carry the same quantity.
#[derive(Debug, Copy, Clone, Serialize, ToSchema)]
pub struct Trade {
    pub bid: TradeSide,
    pub ask: TradeSide,
    /// UTC timestamp when the trade was generated.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub timestamp: OffsetDateTime,
}
