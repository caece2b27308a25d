//! Price levels and the ordered bid/ask maps that hold them.

use std::collections::BTreeMap;

/// One price's worth of resting orders, stored as the head/tail of an
/// intrusive FIFO linked through each order's own `prev`/`next` slab-index
/// fields (see `order.rs`), plus a running volume aggregate.
///
/// Invariant (spec.md §3, Price level): `aggregate_volume` always equals the
/// sum of `volume_remaining` over every order linked into this level.
/// Storing `head`/`tail` instead of a `VecDeque` of indices is what makes
/// `unlink` an O(1) operation given only an order's locator — the order
/// index (spec.md §3 "Order index") never has to scan a level to erase an
/// order from it.
#[derive(Debug, Default)]
pub struct PriceLevel {
    head: Option<u32>,
    tail: Option<u32>,
    count: usize,
    aggregate_volume: i64,
}

impl PriceLevel {
    /// Links `slab_idx` onto the tail of this level's FIFO and folds
    /// `volume` into the aggregate. Returns the previous tail (if any) so
    /// the caller can point that order's `next` at `slab_idx` and
    /// `slab_idx`'s `prev` at it — `PriceLevel` only tracks head/tail/count,
    /// the per-order links themselves live in the order arena.
    pub fn push_tail(&mut self, slab_idx: u32, volume: i64) -> Option<u32> {
        let old_tail = self.tail;
        self.tail = Some(slab_idx);
        if self.head.is_none() {
            self.head = Some(slab_idx);
        }
        self.count += 1;
        self.aggregate_volume += volume;
        old_tail
    }

    /// Unlinks `slab_idx` from this level's FIFO in O(1): the caller
    /// supplies `slab_idx`'s own `prev`/`next` (read off the order before
    /// removing it from the arena) and is responsible for re-pointing
    /// those neighbors' opposite links in the arena itself.
    pub fn unlink(&mut self, slab_idx: u32, prev: Option<u32>, next: Option<u32>) {
        if self.head == Some(slab_idx) {
            self.head = next;
        }
        if self.tail == Some(slab_idx) {
            self.tail = prev;
        }
        self.count = self.count.saturating_sub(1);
    }

    pub fn reduce_volume(&mut self, amount: i64) {
        self.aggregate_volume -= amount;
    }

    pub fn aggregate_volume(&self) -> i64 {
        self.aggregate_volume
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// One side (bid or ask) of the book: an ordered map from price (in ticks)
/// to the `PriceLevel` resting there. Ascending key order lets the best
/// bid/ask be read off the map's last/first entry directly.
#[derive(Debug, Default)]
pub struct BookSide {
    levels: BTreeMap<i64, PriceLevel>,
}

impl BookSide {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level_mut(&mut self, price_ticks: i64) -> &mut PriceLevel {
        self.levels.entry(price_ticks).or_default()
    }

    pub fn get(&self, price_ticks: i64) -> Option<&PriceLevel> {
        self.levels.get(&price_ticks)
    }

    /// Removes the price level if it has become empty. Call after any
    /// mutation that might have drained a level's sequence.
    pub fn prune_if_empty(&mut self, price_ticks: i64) {
        if self.levels.get(&price_ticks).is_some_and(PriceLevel::is_empty) {
            self.levels.remove(&price_ticks);
        }
    }

    pub fn best_price(&self, highest: bool) -> Option<i64> {
        if highest {
            self.levels.keys().next_back().copied()
        } else {
            self.levels.keys().next().copied()
        }
    }

    pub fn volume_at(&self, price_ticks: i64) -> i64 {
        self.levels
            .get(&price_ticks)
            .map(PriceLevel::aggregate_volume)
            .unwrap_or(0)
    }

    /// Sum of aggregate volume for every level at or below `price_ticks`.
    pub fn volume_at_or_below(&self, price_ticks: i64) -> i64 {
        self.levels
            .range(..=price_ticks)
            .map(|(_, level)| level.aggregate_volume())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i64, &PriceLevel)> {
        self.levels.iter()
    }
}
