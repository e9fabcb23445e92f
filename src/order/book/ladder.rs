//! Order book implementation backed by BTreeMap price levels.
//!
//! This module provides a price-time priority limit order book using two
//! BTreeMaps (one for bids, iterated descending, one for asks, ascending).
//! Each price level maintains a FIFO queue of orders via indices into a Slab,
//! avoiding frequent allocations and allowing O(1) insertion/removal within a
//! level; slab keys stay valid across unrelated insertions and removals, so
//! they double as the per-order locator. Each level also carries running
//! aggregates (total quantity, order count) that feed depth reporting and the
//! fill-or-kill feasibility walk. Matching crosses the best bid and best ask
//! while prices overlap.

use crate::order::book::{Book, Depth, DepthItem, Error};
use crate::order::{Id, Modification, Order, OrderType, Price, Quantity, Side};
use crate::trade::{Trade, TradeSide};
use slab::Slab;
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;

/// Aggregated state for a single price level.
///
/// Keeps the head/tail of a doubly-linked list of orders (by slab index), as
/// well as cumulative quantity and order count for quick depth queries and
/// fill-or-kill checks.
#[derive(Debug, Default)]
struct PriceLevel {
    head: Option<usize>,
    tail: Option<usize>,
    total_quantity: Quantity,
    total_orders: usize,
}

impl PriceLevel {
    /// Append an order node to the back of the level's FIFO queue and update
    /// aggregates. The `order_idx` must reference a valid entry in `orders`.
    fn push(&mut self, orders: &mut Slab<OrderNode>, order_idx: usize) {
        match self.tail {
            Some(tail) => {
                orders[tail].next = Some(order_idx);
                orders[order_idx].prev = Some(tail);
                self.tail = Some(order_idx);
            }
            None => {
                self.head = Some(order_idx);
                self.tail = Some(order_idx);
                orders[order_idx].prev = None;
            }
        }

        self.total_quantity += orders[order_idx].order.remaining_quantity;
        self.total_orders += 1;
    }

    /// Remove a specific order node from the level's queue and update
    /// aggregates. The node must be currently linked in this level.
    fn remove(&mut self, orders: &mut Slab<OrderNode>, order_idx: usize) {
        let prev = orders[order_idx].prev;
        let next = orders[order_idx].next;

        if let Some(p) = prev {
            orders[p].next = next;
        } else {
            self.head = next;
        }
        if let Some(n) = next {
            orders[n].prev = prev;
        } else {
            self.tail = prev;
        }
        self.total_orders -= 1;
        self.total_quantity -= orders[order_idx].order.remaining_quantity;
        orders[order_idx].prev = None;
        orders[order_idx].next = None;
    }
}

/// Node representing an individual order stored in a slab and linked within a
/// price level's FIFO queue.
#[derive(Debug, Clone)]
struct OrderNode {
    order: Order,
    next: Option<usize>,
    prev: Option<usize>,
}

/// BTreeMap-backed order book implementing price-time priority.
#[derive(Debug, Default)]
pub struct Ladder {
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    orders: Slab<OrderNode>,
    order_indexes: HashMap<Id, usize>,
}

impl Ladder {
    /// Create a new, empty order book.
    pub fn new() -> Self {
        Ladder::default()
    }

    fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// True if a new order on `side` at `price` would cross the book.
    fn can_match(&self, side: Side, price: Price) -> bool {
        match side {
            Side::Buy => self.best_ask().is_some_and(|ask| price >= ask),
            Side::Sell => self.best_bid().is_some_and(|bid| price <= bid),
        }
    }

    /// True if the crossable resting volume at prices no worse than `price`
    /// covers `quantity` in full.
    ///
    /// Walks the opposite side's level aggregates from the best price outward
    /// and returns as soon as the accumulated volume suffices.
    fn can_fully_fill(&self, side: Side, price: Price, quantity: Quantity) -> bool {
        let mut needed = quantity;
        match side {
            Side::Buy => {
                for (level_price, level) in &self.asks {
                    if *level_price > price {
                        break;
                    }
                    if level.total_quantity >= needed {
                        return true;
                    }
                    needed -= level.total_quantity;
                }
            }
            Side::Sell => {
                for (level_price, level) in self.bids.iter().rev() {
                    if *level_price < price {
                        break;
                    }
                    if level.total_quantity >= needed {
                        return true;
                    }
                    needed -= level.total_quantity;
                }
            }
        }
        false
    }

    /// Insert an order at the tail of its side/price queue and index it.
    fn insert_resting(&mut self, order: Order) {
        let id = order.id;
        let idx = self.orders.insert(OrderNode {
            order,
            next: None,
            prev: None,
        });
        self.order_indexes.insert(id, idx);
        let level = match self.orders[idx].order.side {
            Side::Buy => self.bids.entry(self.orders[idx].order.price).or_default(),
            Side::Sell => self.asks.entry(self.orders[idx].order.price).or_default(),
        };
        level.push(&mut self.orders, idx);
    }

    /// Remove an order (by slab index) from its price level and delete it
    /// from the book, cleaning up an empty price level in the same pass.
    fn remove_resting(&mut self, idx: usize) -> Order {
        let side = self.orders[idx].order.side;
        let price = self.orders[idx].order.price;

        let level = match side {
            Side::Buy => self.bids.get_mut(&price).unwrap(),
            Side::Sell => self.asks.get_mut(&price).unwrap(),
        };
        level.remove(&mut self.orders, idx);
        if level.total_orders == 0 {
            match side {
                Side::Buy => self.bids.remove(&price),
                Side::Sell => self.asks.remove(&price),
            };
        }

        let node = self.orders.remove(idx);
        self.order_indexes.remove(&node.order.id);
        node.order
    }

    /// Match the best bid and best ask while there is price overlap.
    ///
    /// Fills the front of each best queue by the smaller remaining quantity,
    /// emits a trade whose legs carry the resting prices, removes fully
    /// filled orders, and keeps level aggregates in step. Afterwards a
    /// fill-and-kill order left at either front of book is cancelled; it may
    /// rest only for the duration of this call.
    fn match_orders(&mut self) -> Vec<Trade> {
        let mut trades = Vec::new();

        loop {
            let (Some(bid_price), Some(ask_price)) = (self.best_bid(), self.best_ask()) else {
                break;
            };
            if bid_price < ask_price {
                break;
            }

            let bid_idx = self.bids[&bid_price].head.unwrap();
            let ask_idx = self.asks[&ask_price].head.unwrap();

            let quantity = self.orders[bid_idx]
                .order
                .remaining_quantity
                .min(self.orders[ask_idx].order.remaining_quantity);

            self.orders[bid_idx].order.fill(quantity);
            self.orders[ask_idx].order.fill(quantity);

            let bid = self.orders[bid_idx].order;
            let ask = self.orders[ask_idx].order;
            trades.push(Trade {
                bid: TradeSide {
                    order_id: bid.id,
                    price: bid.price,
                    quantity,
                },
                ask: TradeSide {
                    order_id: ask.id,
                    price: ask.price,
                    quantity,
                },
                timestamp: OffsetDateTime::now_utc(),
            });

            self.bids.get_mut(&bid_price).unwrap().total_quantity -= quantity;
            self.asks.get_mut(&ask_price).unwrap().total_quantity -= quantity;

            if bid.is_filled() {
                self.remove_resting(bid_idx);
            }
            if ask.is_filled() {
                self.remove_resting(ask_idx);
            }
        }

        self.kill_transient_front(Side::Buy);
        self.kill_transient_front(Side::Sell);

        trades
    }

    /// Cancel the front order of the best level on `side` if it is a
    /// fill-and-kill whose remainder could not cross.
    fn kill_transient_front(&mut self, side: Side) {
        let front = match side {
            Side::Buy => self.bids.last_key_value().and_then(|(_, level)| level.head),
            Side::Sell => self.asks.first_key_value().and_then(|(_, level)| level.head),
        };
        if let Some(idx) = front {
            if matches!(self.orders[idx].order.order_type, OrderType::FillAndKill) {
                self.remove_resting(idx);
            }
        }
    }
}

impl Book for Ladder {
    /// Admit an order, enforcing its type policy, then run matching.
    ///
    /// A market order is resolved to a limit at the worst opposite price
    /// before any other check; fill-and-kill must be crossable right now and
    /// fill-or-kill must be coverable in full by the crossable depth.
    fn add(&mut self, order: Order) -> Result<Vec<Trade>, Error> {
        if self.order_indexes.contains_key(&order.id) {
            return Err(Error::DuplicateOrder(order.id));
        }
        if order.initial_quantity == 0 {
            return Err(Error::ZeroQuantity(order.id));
        }

        let mut order = order;
        if matches!(order.order_type, OrderType::Market) {
            let worst_opposite = match order.side {
                Side::Buy => self.asks.keys().next_back().copied(),
                Side::Sell => self.bids.keys().next().copied(),
            };
            match worst_opposite {
                Some(price) => order.to_limit(price),
                None => return Err(Error::EmptyOppositeSide(order.id)),
            }
        }

        if matches!(order.order_type, OrderType::FillAndKill)
            && !self.can_match(order.side, order.price)
        {
            return Err(Error::CannotCross(order.id));
        }

        if matches!(order.order_type, OrderType::FillOrKill)
            && !self.can_fully_fill(order.side, order.price, order.initial_quantity)
        {
            return Err(Error::InsufficientDepth(order.id));
        }

        self.insert_resting(order);
        Ok(self.match_orders())
    }

    /// Cancel a resting order by id; unknown ids are a no-op.
    fn cancel(&mut self, id: Id) -> Option<Order> {
        let idx = self.order_indexes.get(&id).copied()?;
        Some(self.remove_resting(idx))
    }

    /// Cancel every listed order that is still resting.
    fn cancel_batch(&mut self, ids: &[Id]) -> Vec<Order> {
        ids.iter().filter_map(|id| self.cancel(*id)).collect()
    }

    /// Cancel-and-replace preserving the resting order's type.
    ///
    /// Validated before anything is removed, so a rejected modification
    /// leaves the original order in place with its priority intact.
    fn modify(&mut self, modification: Modification) -> Result<Vec<Trade>, Error> {
        let idx = self
            .order_indexes
            .get(&modification.order_id)
            .copied()
            .ok_or(Error::OrderNotFound(modification.order_id))?;
        if modification.quantity == 0 {
            return Err(Error::ZeroQuantity(modification.order_id));
        }

        let resting = &self.orders[idx].order;
        if resting.side != modification.side {
            return Err(Error::SideMismatch(modification.order_id));
        }
        let order_type = resting.order_type;

        self.remove_resting(idx);
        self.add(modification.into_order(order_type))
    }

    /// Return a snapshot of top-of-book depth up to `limit` levels per side.
    fn depth(&self, limit: usize) -> Depth {
        Depth {
            bids: self
                .bids
                .iter()
                .rev()
                .take(limit)
                .map(|(price, level)| DepthItem {
                    price: *price,
                    quantity: level.total_quantity,
                })
                .collect(),
            asks: self
                .asks
                .iter()
                .take(limit)
                .map(|(price, level)| DepthItem {
                    price: *price,
                    quantity: level.total_quantity,
                })
                .collect(),
        }
    }

    /// Number of resting orders across both sides.
    fn len(&self) -> usize {
        self.order_indexes.len()
    }

    // Gets a resting order by its id.
    fn lookup(&self, id: Id) -> Option<&Order> {
        let idx = self.order_indexes.get(&id)?;

        Some(&self.orders[*idx].order)
    }

    /// Ids of resting good-for-day orders, in no particular order.
    fn day_order_ids(&self) -> Vec<Id> {
        self.orders
            .iter()
            .filter(|(_, node)| matches!(node.order.order_type, OrderType::GoodForDay))
            .map(|(_, node)| node.order.id)
            .collect()
    }
}
