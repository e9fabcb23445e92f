//! Concurrency envelope around a [`Book`] plus the day-order pruner.
//!
//! All index mutation is serialized by a single book-wide mutex; read-only
//! operations take the same lock. A background thread sleeps until the next
//! daily cutoff and then cancels every resting good-for-day order in one
//! critical section. Shutdown is cooperative: dropping the engine raises the
//! shutdown flag under the condition variable's mutex, notifies the sleeping
//! pruner, and joins it.

use crate::config::ExpiryConfig;
use crate::order::book::{Book, Depth, Error};
use crate::order::{Id, Modification, Order};
use crate::trade::Trade;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use time::{OffsetDateTime, Time};
use tracing::info;

struct Shared<T> {
    book: Mutex<T>,
    /// Raised once, under `parked`, when the engine is being torn down.
    shutdown: AtomicBool,
    /// The pruner sleeps on this pair between cutoffs.
    parked: Mutex<()>,
    wakeup: Condvar,
}

/// Thread-safe order book engine.
///
/// Owns the book behind a mutex and the pruner thread for the book's
/// lifetime. Every public operation corresponds to one critical section;
/// in particular [`Engine::modify_order`] holds the lock across the whole
/// cancel-and-replace, so no other operation can interleave.
pub struct Engine<T: Book> {
    shared: Arc<Shared<T>>,
    pruner: Option<JoinHandle<()>>,
}

impl<T: Book + Send + 'static> Engine<T> {
    /// Wrap `book` and start the pruner with the given cutoff configuration.
    pub fn new(book: T, expiry: ExpiryConfig) -> Self {
        let cutoff = Time::from_hms(expiry.hour, expiry.minute, 0)
            .expect("expiry cutoff out of range");
        let guard_interval = Duration::from_millis(expiry.guard);

        let shared = Arc::new(Shared {
            book: Mutex::new(book),
            shutdown: AtomicBool::new(false),
            parked: Mutex::new(()),
            wakeup: Condvar::new(),
        });

        let pruner = std::thread::Builder::new()
            .name("day-order-pruner".into())
            .spawn({
                let shared = Arc::clone(&shared);
                move || prune_day_orders(&shared, cutoff, guard_interval)
            })
            .expect("could not spawn the day-order pruner");

        Self {
            shared,
            pruner: Some(pruner),
        }
    }
}

impl<T: Book> Engine<T> {
    /// Admit a new order and return the trades it produced.
    pub fn add_order(&self, order: Order) -> Result<Vec<Trade>, Error> {
        let trades = self.shared.book.lock().unwrap().add(order)?;
        metrics::counter!("orders_admitted").increment(1);
        metrics::counter!("trades_emitted").increment(trades.len() as u64);
        Ok(trades)
    }

    /// Cancel an order by id; unknown ids are a no-op.
    pub fn cancel_order(&self, id: Id) -> Option<Order> {
        self.shared.book.lock().unwrap().cancel(id)
    }

    /// Cancel a batch of orders inside a single critical section.
    pub fn cancel_orders(&self, ids: &[Id]) -> Vec<Order> {
        self.shared.book.lock().unwrap().cancel_batch(ids)
    }

    /// Cancel-and-replace under one lock acquisition.
    pub fn modify_order(&self, modification: Modification) -> Result<Vec<Trade>, Error> {
        let trades = self.shared.book.lock().unwrap().modify(modification)?;
        metrics::counter!("trades_emitted").increment(trades.len() as u64);
        Ok(trades)
    }

    /// Aggregated depth up to `limit` levels per side.
    pub fn depth(&self, limit: usize) -> Depth {
        self.shared.book.lock().unwrap().depth(limit)
    }

    /// Total number of resting orders.
    pub fn size(&self) -> usize {
        self.shared.book.lock().unwrap().len()
    }

    /// Copy of a resting order, if present.
    pub fn lookup(&self, id: Id) -> Option<Order> {
        self.shared.book.lock().unwrap().lookup(id).copied()
    }
}

impl<T: Book> Drop for Engine<T> {
    /// Stop the pruner: raise the flag under the condvar's mutex so the
    /// signal cannot fall between the pruner's flag check and its wait, then
    /// notify and join.
    fn drop(&mut self) {
        {
            let _parked = self.shared.parked.lock().unwrap();
            self.shared.shutdown.store(true, Ordering::Release);
        }
        self.shared.wakeup.notify_all();
        if let Some(handle) = self.pruner.take() {
            let _ = handle.join();
        }
    }
}

/// Background loop cancelling good-for-day orders at each daily cutoff.
///
/// Sleeps on the condition variable until the next cutoff (plus the guard
/// interval) or until shutdown. A wakeup that is neither shutdown nor the
/// deadline recomputes the deadline and goes back to sleep, so a missed or
/// stale cutoff is never swept twice.
fn prune_day_orders<T: Book>(shared: &Shared<T>, cutoff: Time, guard_interval: Duration) {
    let mut parked = shared.parked.lock().unwrap();
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }

        let wait = until_next_cutoff(cutoff) + guard_interval;
        let (reacquired, status) = shared.wakeup.wait_timeout(parked, wait).unwrap();
        parked = reacquired;

        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        if !status.timed_out() {
            continue;
        }

        let mut book = shared.book.lock().unwrap();
        let expired = book.day_order_ids();
        if expired.is_empty() {
            continue;
        }
        let cancelled = book.cancel_batch(&expired);
        drop(book);

        metrics::counter!("day_orders_expired").increment(cancelled.len() as u64);
        info!(count = cancelled.len(), "cancelled good-for-day orders at cutoff");
    }
}

/// Time remaining until the next occurrence of `cutoff` on the local clock.
///
/// Falls back to UTC when the local offset cannot be determined.
fn until_next_cutoff(cutoff: Time) -> Duration {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let next = next_cutoff(now, cutoff);
    Duration::try_from(next - now).unwrap_or_default()
}

/// The first instant at or after `now` with wall-clock time `cutoff`,
/// excluding `now` itself: a cutoff that already passed today resolves to
/// tomorrow, never to a past instant.
fn next_cutoff(now: OffsetDateTime, cutoff: Time) -> OffsetDateTime {
    let today = now.replace_time(cutoff);
    if today <= now {
        today + time::Duration::days(1)
    } else {
        today
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::book::ladder::Ladder;
    use crate::order::{OrderType, Side};
    use time::macros::datetime;

    fn test_expiry() -> ExpiryConfig {
        ExpiryConfig {
            hour: 16,
            minute: 0,
            guard: 100,
        }
    }

    fn gtc(id: u64, side: Side, price: i32, quantity: u32) -> Order {
        Order::new(OrderType::GoodTillCancel, id, side, price, quantity)
    }

    #[test]
    fn next_cutoff_is_always_in_the_future() {
        let cutoff = Time::from_hms(16, 0, 0).unwrap();

        let morning = datetime!(2024-03-04 09:30:00 UTC);
        assert_eq!(
            next_cutoff(morning, cutoff),
            datetime!(2024-03-04 16:00:00 UTC),
            "a morning clock should target the same day's cutoff"
        );

        let evening = datetime!(2024-03-04 17:45:00 UTC);
        assert_eq!(
            next_cutoff(evening, cutoff),
            datetime!(2024-03-05 16:00:00 UTC),
            "a clock past the cutoff should target tomorrow"
        );

        let exactly = datetime!(2024-03-04 16:00:00 UTC);
        assert_eq!(
            next_cutoff(exactly, cutoff),
            datetime!(2024-03-05 16:00:00 UTC),
            "the cutoff instant itself belongs to the next day"
        );
    }

    #[test]
    fn operations_round_trip_through_the_lock() {
        let engine = Engine::new(Ladder::new(), test_expiry());

        assert!(engine.add_order(gtc(1, Side::Buy, 100, 10)).unwrap().is_empty());
        let trades = engine.add_order(gtc(2, Side::Sell, 100, 4)).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].bid.quantity, 4);

        assert_eq!(engine.size(), 1);
        assert_eq!(engine.lookup(1).map(|o| o.remaining_quantity), Some(6));

        let depth = engine.depth(usize::MAX);
        assert_eq!(depth.bids.len(), 1);
        assert!(depth.asks.is_empty());

        let trades = engine
            .modify_order(Modification {
                order_id: 1,
                side: Side::Buy,
                price: 99,
                quantity: 6,
            })
            .unwrap();
        assert!(trades.is_empty());
        assert_eq!(engine.lookup(1).map(|o| o.price), Some(99));

        assert!(engine.cancel_order(1).is_some());
        assert!(engine.cancel_order(1).is_none(), "cancel is idempotent");
        assert_eq!(engine.size(), 0);
    }

    #[test]
    fn batch_cancel_under_one_lock() {
        let engine = Engine::new(Ladder::new(), test_expiry());
        engine.add_order(gtc(1, Side::Buy, 100, 1)).unwrap();
        engine.add_order(gtc(2, Side::Buy, 101, 1)).unwrap();
        engine.add_order(gtc(3, Side::Sell, 105, 1)).unwrap();

        let cancelled = engine.cancel_orders(&[1, 2, 99]);
        assert_eq!(cancelled.len(), 2);
        assert_eq!(engine.size(), 1);
    }

    #[test]
    fn drop_stops_the_pruner_promptly() {
        // The next 16:00 cutoff is far away; drop must not wait for it.
        let engine = Engine::new(Ladder::new(), test_expiry());
        engine.add_order(gtc(1, Side::Buy, 100, 1)).unwrap();
        drop(engine);
    }

    #[test]
    fn concurrent_admissions_are_serialized() {
        let engine = Arc::new(Engine::new(Ladder::new(), test_expiry()));

        let handles: Vec<_> = (0..4u64)
            .map(|worker| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for i in 0..50u64 {
                        let id = worker * 1_000 + i;
                        // Non-crossing orders so every one of them rests.
                        let side = if worker % 2 == 0 { Side::Buy } else { Side::Sell };
                        let price = if worker % 2 == 0 { 100 - worker as i32 } else { 200 + worker as i32 };
                        engine.add_order(gtc(id, side, price, 1)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.size(), 200, "every admission must be visible after the joins");
    }
}
