use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which side of the book an order rests on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Side {
    Buy,
    Sell,
}

/// Execution policy attached to an order at admission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderType {
    /// Rests until filled or explicitly cancelled.
    GoodTillCancel,
    /// Fills what it can immediately; the remainder is cancelled.
    FillAndKill,
    /// Fills the entire quantity immediately or is rejected.
    FillOrKill,
    /// Rests like GoodTillCancel but is cancelled at the daily cutoff.
    GoodForDay,
    /// No limit price; converted to GoodTillCancel at the worst opposite
    /// price during admission.
    Market,
}

pub type Id = u64;
pub type Price = i32; // ticks
pub type Quantity = u32;

/// A single order and its fill state.
///
/// `filled_quantity` is always `initial_quantity - remaining_quantity`; the
/// book never rests an order whose remaining quantity is zero.
#[derive(Debug, Copy, Clone, Serialize, ToSchema)]
pub struct Order {
    pub id: Id,
    pub order_type: OrderType,
    pub side: Side,
    pub price: Price,
    pub initial_quantity: Quantity,
    pub remaining_quantity: Quantity,
}

impl Order {
    pub fn new(order_type: OrderType, id: Id, side: Side, price: Price, quantity: Quantity) -> Self {
        Order {
            id,
            order_type,
            side,
            price,
            initial_quantity: quantity,
            remaining_quantity: quantity,
        }
    }

    /// A market order has no price of its own; the placeholder is replaced
    /// with the worst opposite price at admission, or the order is rejected.
    pub fn market(id: Id, side: Side, quantity: Quantity) -> Self {
        Order::new(OrderType::Market, id, side, 0, quantity)
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.initial_quantity - self.remaining_quantity
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Consume `quantity` of the remaining amount.
    ///
    /// Overfilling is a matcher bug, never a consequence of client input, so
    /// it aborts rather than returning an error.
    pub fn fill(&mut self, quantity: Quantity) {
        assert!(
            quantity <= self.remaining_quantity,
            "order #{} cannot be filled for more than its remaining quantity",
            self.id
        );
        self.remaining_quantity -= quantity;
    }

    /// Rewrite a market order as a resting limit order at `price`.
    pub fn to_limit(&mut self, price: Price) {
        self.order_type = OrderType::GoodTillCancel;
        self.price = price;
    }
}

/// Cancel-and-replace request for a resting order.
///
/// The replacement keeps the resting order's type but takes the new price and
/// quantity, joining the tail of its queue (time priority is lost). The side
/// must match the resting order's side.
#[derive(Debug, Copy, Clone, Deserialize, ToSchema)]
pub struct Modification {
    pub order_id: Id,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl Modification {
    /// Build the replacement order, carrying over the stored order type.
    pub fn into_order(self, order_type: OrderType) -> Order {
        Order::new(order_type, self.order_id, self.side, self.price, self.quantity)
    }
}

pub mod book;
