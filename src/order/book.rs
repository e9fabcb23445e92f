//! Order book interface and shared types.
//!
//! This module defines the interface expected from an order book
//! implementation, the common types used to represent market depth, and the
//! errors the admission path can produce.

pub mod ladder;

use crate::order::{Id, Modification, Order};
use crate::trade::Trade;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Aggregated depth at a single price level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DepthItem {
    /// Price level.
    pub price: crate::order::Price,
    /// Total resting quantity at this price level.
    pub quantity: crate::order::Quantity,
}

/// A snapshot of the best price levels on both sides of the book.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Depth {
    /// Best bids in descending price order.
    pub bids: Vec<DepthItem>,
    /// Best asks in ascending price order.
    pub asks: Vec<DepthItem>,
}

/// Admission-path errors.
///
/// Every variant is produced before the book is touched; a rejected order
/// leaves no trace in any index.
#[derive(Error, Debug)]
pub enum Error {
    #[error("another order with the same id #{0} already exists")]
    /// Tried to add an order with an id that is already resting.
    DuplicateOrder(Id),
    #[error("could not find order with id #{0}")]
    /// Tried to modify an order that does not exist.
    OrderNotFound(Id),
    #[error("order #{0} has zero quantity")]
    /// Admission requires a positive quantity.
    ZeroQuantity(Id),
    #[error("market order #{0} has no opposite side to price against")]
    /// A market order arrived while the opposite side was empty.
    EmptyOppositeSide(Id),
    #[error("fill-and-kill order #{0} cannot cross at its limit")]
    /// A fill-and-kill order whose limit cannot reach the opposite best.
    CannotCross(Id),
    #[error("fill-or-kill order #{0} exceeds the depth available at its limit")]
    /// A fill-or-kill order the crossable resting volume cannot satisfy.
    InsufficientDepth(Id),
    #[error("modification side for order #{0} does not match the resting order")]
    /// A modification that tried to flip the order's side.
    SideMismatch(Id),
}

/// The core order book interface: admission, cancellation, modification,
/// depth reporting, and the queries the day-order pruner needs.
///
/// Implementations are single-threaded; the concurrency envelope serializes
/// access from outside.
pub trait Book {
    /// Admit a new order, run matching, and return the trades it produced.
    /// Rejections leave the book untouched.
    fn add(&mut self, order: Order) -> Result<Vec<Trade>, Error>;
    /// Cancel a resting order by id. Unknown ids are a no-op, so repeated
    /// cancels are idempotent.
    fn cancel(&mut self, id: Id) -> Option<Order>;
    /// Cancel a batch of orders in one pass, returning those that existed.
    fn cancel_batch(&mut self, ids: &[Id]) -> Vec<Order>;
    /// Cancel-and-replace preserving the resting order's type. The
    /// replacement joins the tail of its new queue.
    fn modify(&mut self, modification: Modification) -> Result<Vec<Trade>, Error>;
    /// Returns a depth snapshot for the requested number of price levels per side.
    fn depth(&self, limit: usize) -> Depth;
    /// Number of resting orders across both sides.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Gets a resting order by its id.
    fn lookup(&self, id: Id) -> Option<&Order>;
    /// Ids of resting orders that expire at the daily cutoff.
    fn day_order_ids(&self) -> Vec<Id>;
}
