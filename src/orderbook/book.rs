//! The per-symbol order book: the state machine at the center of this
//! engine (spec.md §4.3). `BookState` holds the pure, synchronously-testable
//! logic; `SymbolBook` wraps it in the two-queue, one-thread runtime that
//! drives it through history replay and live processing.

use super::error::OrderBookError;
use super::level::BookSide;
use super::order::{Order, OrderSlab};
use super::pending::PendingQueue;
use super::strategy::SealStrategy;
use crate::collaborators::SignalSink;
use crate::registry::{format_account, AccountRegistry};
use crate::tick::{Market, MarketEvent, OrderKind, OrderTick, Side, TradeKind, TradeTick};

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long a pending event may wait for its predecessor before it is
/// silently discarded (spec.md §4.3.3).
pub const EVENT_TIMEOUT_MS: i64 = 60_000;

/// Window, relative to phase A's final watermark, used to seed the
/// duplicate-suppression id sets handed off to phase B (spec.md §4.3 step 4).
const HISTORY_ID_RETENTION_MS: i64 = 600_000;

/// Phase A's timed wait on the history queue (spec.md §4.3 step 1).
const PHASE_A_TIMEOUT: Duration = Duration::from_secs(3);

const PHASE_A_DRAIN_EVERY: usize = 100;
const PHASE_B_DRAIN_EVERY: usize = 10;
const QUEUE_CAPACITY: usize = 4_096;

/// A read-only view of book state for collaborators outside the owning
/// thread (spec.md §5: "readers acquire a shared-exclusive lock").
#[derive(Debug, Clone)]
pub struct BookSnapshot {
    pub symbol: String,
    pub best_bid: Option<(i64, i64)>,
    pub best_ask: Option<(i64, i64)>,
    pub order_count: usize,
}

/// The order book for one symbol: bids, asks, the order arena, the id
/// index, the pending-event queue and the duplicate-suppression sets. Every
/// mutation is made through `apply_event`/`drain_pending`; nothing here
/// spawns a thread or touches a queue — that's `SymbolBook`'s job.
#[derive(Debug)]
pub struct BookState {
    symbol: String,
    market: Market,
    bids: BookSide,
    asks: BookSide,
    orders: OrderSlab,
    order_index: HashMap<i64, u32>,
    pending: PendingQueue,
    history_order_ids: HashSet<i64>,
    history_trade_ids: HashSet<i64>,
    last_event_timestamp_ms: i64,
    buy_done_trade_ids: HashSet<i64>,
    sell_done_trade_ids: HashSet<i64>,
    strategy: SealStrategy,
}

impl BookState {
    pub fn new(symbol: String) -> Self {
        let market = Market::from_symbol(&symbol);
        Self {
            symbol,
            market,
            bids: BookSide::new(),
            asks: BookSide::new(),
            orders: OrderSlab::new(),
            order_index: HashMap::new(),
            pending: PendingQueue::new(),
            history_order_ids: HashSet::new(),
            history_trade_ids: HashSet::new(),
            last_event_timestamp_ms: 0,
            buy_done_trade_ids: HashSet::new(),
            sell_done_trade_ids: HashSet::new(),
            strategy: SealStrategy::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn order_index_len(&self) -> usize {
        self.order_index.len()
    }

    pub fn has_order(&self, id: i64) -> bool {
        self.order_index.contains_key(&id)
    }

    pub fn order_volume_remaining(&self, id: i64) -> Option<i64> {
        let idx = *self.order_index.get(&id)?;
        self.orders.get(idx).map(|o| o.volume_remaining)
    }

    pub fn bid_volume_at(&self, price_ticks: i64) -> i64 {
        self.bids.volume_at(price_ticks)
    }

    pub fn ask_volume_at(&self, price_ticks: i64) -> i64 {
        self.asks.volume_at(price_ticks)
    }

    pub fn last_event_timestamp_ms(&self) -> i64 {
        self.last_event_timestamp_ms
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn already_alerted(&self) -> bool {
        self.strategy.already_alerted()
    }

    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            symbol: self.symbol.clone(),
            best_bid: self
                .bids
                .best_price(true)
                .map(|p| (p, self.bids.volume_at(p))),
            best_ask: self
                .asks
                .best_price(false)
                .map(|p| (p, self.asks.volume_at(p))),
            order_count: self.order_index.len(),
        }
    }

    fn book_side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn insert_order(&mut self, id: i64, price_ticks: i64, side: Side, volume: i64) {
        let idx = self.orders.insert(Order {
            id,
            price_ticks,
            side,
            volume_remaining: volume,
            prev: None,
            next: None,
        });
        let old_tail = self
            .book_side_mut(side)
            .level_mut(price_ticks)
            .push_tail(idx, volume);
        if let Some(old_tail_idx) = old_tail {
            if let Some(old_tail_order) = self.orders.get_mut(old_tail_idx) {
                old_tail_order.next = Some(idx);
            }
        }
        if let Some(order) = self.orders.get_mut(idx) {
            order.prev = old_tail;
        }
        self.order_index.insert(id, idx);
    }

    /// Reduces an order's remaining volume by `delta`, removing it (and its
    /// price level if now empty) when that drops to zero or below. The one
    /// mutation path every cancel/execution funnels through, preserving the
    /// removal invariants of spec.md §4.3.4. Unlinking by `idx` is O(1): the
    /// order index gives the slab locator directly, and the order's own
    /// `prev`/`next` links let the level detach it without scanning its FIFO
    /// (spec.md §3 "Order index": "O(1) find/erase").
    fn reduce_or_remove_order(&mut self, idx: u32, delta: i64) {
        let Some(order) = self.orders.get_mut(idx) else {
            return;
        };
        order.volume_remaining -= delta;
        let side = order.side;
        let price = order.price_ticks;
        let remaining = order.volume_remaining;
        let id = order.id;
        let prev = order.prev;
        let next = order.next;

        self.book_side_mut(side).level_mut(price).reduce_volume(delta);

        if remaining <= 0 {
            if let Some(prev_idx) = prev {
                if let Some(prev_order) = self.orders.get_mut(prev_idx) {
                    prev_order.next = next;
                }
            }
            if let Some(next_idx) = next {
                if let Some(next_order) = self.orders.get_mut(next_idx) {
                    next_order.prev = prev;
                }
            }
            self.book_side_mut(side).level_mut(price).unlink(idx, prev, next);
            self.book_side_mut(side).prune_if_empty(price);
            self.order_index.remove(&id);
            self.orders.remove(idx);
        }
    }

    /// Applies one market event, deduping against the history id sets and
    /// advancing the watermark first (spec.md §4.3 "apply_event dispatcher").
    pub fn apply_event(&mut self, ev: MarketEvent) {
        match &ev {
            MarketEvent::Order(o) => {
                if self.history_order_ids.contains(&o.id()) {
                    tracing::trace!(
                        target: "book",
                        symbol = %self.symbol,
                        id = o.id(),
                        "dropping duplicate order already seen in history"
                    );
                    return;
                }
            }
            MarketEvent::Trade(t) => {
                if self.history_trade_ids.contains(&t.trade_num) {
                    tracing::trace!(
                        target: "book",
                        symbol = %self.symbol,
                        trade_num = t.trade_num,
                        "dropping duplicate trade already seen in history"
                    );
                    return;
                }
            }
        }

        self.last_event_timestamp_ms = self.last_event_timestamp_ms.max(ev.timestamp_ms());

        match ev {
            MarketEvent::Order(o) => self.handle_order_tick(o),
            MarketEvent::Trade(t) => self.handle_trade_tick(t),
        }
    }

    fn handle_order_tick(&mut self, ev: OrderTick) {
        match ev.kind {
            OrderKind::Limit => {
                self.insert_order(ev.id(), ev.price_ticks, ev.side, ev.volume);
            }
            OrderKind::Cancel if self.market.is_shanghai() => {
                let id = ev.id();
                if let Some(&idx) = self.order_index.get(&id) {
                    self.reduce_or_remove_order(idx, ev.volume);
                } else if ev.timestamp_ms + EVENT_TIMEOUT_MS >= self.last_event_timestamp_ms {
                    self.pending.push(MarketEvent::Order(ev));
                } else {
                    tracing::trace!(
                        target: "book",
                        symbol = %self.symbol,
                        id,
                        "stale cancel for unknown order dropped"
                    );
                }
            }
            OrderKind::Cancel | OrderKind::Market | OrderKind::BestOfSide => {
                // Shenzhen cancels only ever arrive via the trade channel
                // (TradeKind::Cancel, handled in handle_trade_cancel); an
                // order-tick cancel on SZ is ignored the same way priceless
                // order kinds are.
            }
        }
    }

    fn handle_trade_tick(&mut self, ev: TradeTick) {
        match ev.kind {
            TradeKind::Cancel => self.handle_trade_cancel(ev),
            TradeKind::Execution => self.handle_execution(ev),
        }
    }

    fn handle_trade_cancel(&mut self, ev: TradeTick) {
        for id in [ev.buy_id, ev.sell_id] {
            if id == 0 {
                continue;
            }
            if let Some(&idx) = self.order_index.get(&id) {
                self.reduce_or_remove_order(idx, ev.volume);
            } else if ev.timestamp_ms + EVENT_TIMEOUT_MS >= self.last_event_timestamp_ms {
                self.pending.push(MarketEvent::Trade(ev.clone()));
            } else {
                tracing::trace!(
                    target: "book",
                    symbol = %self.symbol,
                    id,
                    "stale trade-channel cancel for unknown order dropped"
                );
            }
        }
    }

    /// Shanghai publishes only the resting side of an execution; the
    /// aggressor's order never appears in the book, so a trade whose side
    /// matches the looked-up order's side must not decrement it (spec.md
    /// §4.3.2 `on_match`).
    fn on_match(&mut self, order_id: i64, volume: i64, trade_side: Side) {
        let Some(&idx) = self.order_index.get(&order_id) else {
            return;
        };
        let Some(order) = self.orders.get(idx) else {
            return;
        };
        if self.market.is_shanghai() && order.side == trade_side {
            tracing::trace!(
                target: "book",
                symbol = %self.symbol,
                order_id,
                "shanghai aggressor side, no decrement"
            );
            return;
        }
        self.reduce_or_remove_order(idx, volume);
    }

    fn handle_execution(&mut self, ev: TradeTick) {
        let buy_present = ev.buy_id != 0 && self.order_index.contains_key(&ev.buy_id);
        let sell_present = ev.sell_id != 0 && self.order_index.contains_key(&ev.sell_id);

        match (buy_present, sell_present) {
            (true, true) => {
                self.on_match(ev.buy_id, ev.volume, ev.side);
                self.on_match(ev.sell_id, ev.volume, ev.side);
                self.buy_done_trade_ids.remove(&ev.trade_num);
                self.sell_done_trade_ids.remove(&ev.trade_num);
            }
            (true, false) => {
                if !self.buy_done_trade_ids.contains(&ev.trade_num) {
                    self.on_match(ev.buy_id, ev.volume, ev.side);
                    self.buy_done_trade_ids.insert(ev.trade_num);
                }
                self.push_pending_or_drop(ev);
            }
            (false, true) => {
                if !self.sell_done_trade_ids.contains(&ev.trade_num) {
                    self.on_match(ev.sell_id, ev.volume, ev.side);
                    self.sell_done_trade_ids.insert(ev.trade_num);
                }
                self.push_pending_or_drop(ev);
            }
            (false, false) => {
                self.push_pending_or_drop(ev);
            }
        }
    }

    /// Shared tail for "neither/one side present": push back for a later
    /// retry if still within the event timeout, otherwise drop it and clear
    /// any done-set marker so an abandoned trade id doesn't linger forever.
    fn push_pending_or_drop(&mut self, ev: TradeTick) {
        let trade_num = ev.trade_num;
        if ev.timestamp_ms + EVENT_TIMEOUT_MS >= self.last_event_timestamp_ms {
            self.pending.push(MarketEvent::Trade(ev));
        } else {
            self.buy_done_trade_ids.remove(&trade_num);
            self.sell_done_trade_ids.remove(&trade_num);
        }
    }

    /// Replays every currently pending event once; anything still
    /// unresolved re-enters the queue via the normal `apply_event` paths
    /// (spec.md §4.3.3).
    pub fn drain_pending(&mut self) {
        let drained = self.pending.drain_all();
        for ev in drained {
            self.apply_event(ev);
        }
    }

    /// Seeds the duplicate-suppression sets phase B relies on from the ids
    /// seen during phase A's replay, restricted to the trailing retention
    /// window (spec.md §4.3 step 4).
    fn seed_history_ids(&mut self, order_seen: Vec<(i64, i64)>, trade_seen: Vec<(i64, i64)>) {
        let watermark = self.last_event_timestamp_ms;
        self.history_order_ids = order_seen
            .into_iter()
            .filter(|&(_, ts)| watermark - ts <= HISTORY_ID_RETENTION_MS)
            .map(|(id, _)| id)
            .collect();
        self.history_trade_ids = trade_seen
            .into_iter()
            .filter(|&(_, ts)| watermark - ts <= HISTORY_ID_RETENTION_MS)
            .map(|(id, _)| id)
            .collect();
    }

    /// Runs after a live event's mutation (spec.md §4.4). Returns whether
    /// the seal-unwind condition just fired; callers must send the alert and
    /// call `mark_strategy_alerted` themselves on a successful send.
    pub fn evaluate_seal_strategy(&mut self, event_timestamp_ms: i64) -> bool {
        self.strategy.evaluate(&self.bids, &self.asks, event_timestamp_ms)
    }

    pub fn mark_strategy_alerted(&mut self) {
        self.strategy.mark_alerted();
    }
}

/// The runtime around one `BookState`: two MPSC queues and the single
/// thread that is the state's sole mutator (spec.md §5). Producers only
/// ever enqueue through `push_history`/`push_live`.
pub struct SymbolBook {
    symbol: String,
    state: Arc<RwLock<BookState>>,
    history_tx: Option<Sender<MarketEvent>>,
    live_tx: Option<Sender<MarketEvent>>,
    running: Arc<AtomicBool>,
    history_order_done: Arc<AtomicBool>,
    history_trade_done: Arc<AtomicBool>,
    history_phase_complete: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SymbolBook {
    pub fn spawn(
        symbol: String,
        sink: Arc<dyn SignalSink>,
        registry: Arc<AccountRegistry>,
    ) -> Self {
        let state = Arc::new(RwLock::new(BookState::new(symbol.clone())));
        let (history_tx, history_rx) = bounded(QUEUE_CAPACITY);
        let (live_tx, live_rx) = bounded(QUEUE_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let history_order_done = Arc::new(AtomicBool::new(false));
        let history_trade_done = Arc::new(AtomicBool::new(false));
        let history_phase_complete = Arc::new(AtomicBool::new(false));

        let worker = {
            let state = Arc::clone(&state);
            let running = Arc::clone(&running);
            let history_order_done = Arc::clone(&history_order_done);
            let history_trade_done = Arc::clone(&history_trade_done);
            let history_phase_complete = Arc::clone(&history_phase_complete);
            let thread_symbol = symbol.clone();
            thread::Builder::new()
                .name(format!("book-{thread_symbol}"))
                .spawn(move || {
                    run(
                        thread_symbol,
                        state,
                        history_rx,
                        live_rx,
                        running,
                        history_order_done,
                        history_trade_done,
                        history_phase_complete,
                        sink,
                        registry,
                    )
                })
                .expect("failed to spawn book processing thread")
        };

        Self {
            symbol,
            state,
            history_tx: Some(history_tx),
            live_tx: Some(live_tx),
            running,
            history_order_done,
            history_trade_done,
            history_phase_complete,
            worker: Some(worker),
        }
    }

    pub fn push_history(&self, event: MarketEvent) -> Result<(), OrderBookError> {
        self.history_tx
            .as_ref()
            .ok_or_else(|| self.closed_error())?
            .send(event)
            .map_err(|err| OrderBookError::QueueClosed {
                symbol: self.symbol.clone(),
                reason: err.to_string(),
            })
    }

    pub fn push_live(&self, event: MarketEvent) -> Result<(), OrderBookError> {
        self.live_tx
            .as_ref()
            .ok_or_else(|| self.closed_error())?
            .send(event)
            .map_err(|err| OrderBookError::QueueClosed {
                symbol: self.symbol.clone(),
                reason: err.to_string(),
            })
    }

    fn closed_error(&self) -> OrderBookError {
        OrderBookError::QueueClosed {
            symbol: self.symbol.clone(),
            reason: "book has been shut down".to_string(),
        }
    }

    pub fn mark_history_order_done(&self) {
        self.history_order_done.store(true, Ordering::Release);
    }

    pub fn mark_history_trade_done(&self) {
        self.history_trade_done.store(true, Ordering::Release);
    }

    pub fn history_phase_complete(&self) -> bool {
        self.history_phase_complete.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> BookSnapshot {
        self.state.read().expect("book lock poisoned").snapshot()
    }

    /// Stops the processing thread: flips `running` false and drops both
    /// senders. A blocked `recv`/`recv_timeout` on the now-sender-less
    /// channel returns `Disconnected` immediately — the channel closing is
    /// this engine's rendition of spec.md §5's "sentinel event" push, using
    /// the ownership-driven unblock Rust's channels already provide instead
    /// of a synthetic payload.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        self.history_tx = None;
        self.live_tx = None;
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SymbolBook {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[allow(clippy::too_many_arguments)]
fn run(
    symbol: String,
    state: Arc<RwLock<BookState>>,
    history_rx: Receiver<MarketEvent>,
    live_rx: Receiver<MarketEvent>,
    running: Arc<AtomicBool>,
    history_order_done: Arc<AtomicBool>,
    history_trade_done: Arc<AtomicBool>,
    history_phase_complete: Arc<AtomicBool>,
    sink: Arc<dyn SignalSink>,
    registry: Arc<AccountRegistry>,
) {
    let mut history_buffer: Vec<MarketEvent> = Vec::new();

    loop {
        if !running.load(Ordering::Acquire) {
            return;
        }
        match history_rx.recv_timeout(PHASE_A_TIMEOUT) {
            Ok(ev) => history_buffer.push(ev),
            Err(RecvTimeoutError::Timeout) => {
                if history_order_done.load(Ordering::Acquire)
                    && history_trade_done.load(Ordering::Acquire)
                {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!(target: "book", symbol = %symbol, "history queue disconnected before phase A completed");
                return;
            }
        }
    }

    history_buffer.sort_by_key(|ev| ev.timestamp_ms());

    {
        let mut guard = state.write().expect("book lock poisoned");
        let mut order_seen = Vec::new();
        let mut trade_seen = Vec::new();

        for (i, ev) in history_buffer.into_iter().enumerate() {
            match &ev {
                MarketEvent::Order(o) => order_seen.push((o.id(), o.timestamp_ms)),
                MarketEvent::Trade(t) => trade_seen.push((t.trade_num, t.timestamp_ms)),
            }
            guard.apply_event(ev);
            if (i + 1) % PHASE_A_DRAIN_EVERY == 0 {
                guard.drain_pending();
            }
        }
        guard.drain_pending();
        guard.seed_history_ids(order_seen, trade_seen);
    }
    history_phase_complete.store(true, Ordering::Release);

    let mut since_drain = 0usize;
    loop {
        if !running.load(Ordering::Acquire) {
            return;
        }
        let ev = match live_rx.recv() {
            Ok(ev) => ev,
            Err(_) => return,
        };
        let timestamp_ms = ev.timestamp_ms();

        let mut guard = state.write().expect("book lock poisoned");
        guard.apply_event(ev);
        since_drain += 1;
        if since_drain % PHASE_B_DRAIN_EVERY == 0 {
            guard.drain_pending();
        }
        if guard.evaluate_seal_strategy(timestamp_ms) {
            let payload = format_account(guard.symbol(), &registry);
            match sink.emit(&payload) {
                Ok(()) => {
                    guard.mark_strategy_alerted();
                    tracing::info!(target: "strategy", symbol = %symbol, "seal-unwind alert emitted");
                }
                Err(err) => {
                    tracing::warn!(target: "strategy", symbol = %symbol, error = %err, "signal sink rejected alert, will retry on next event");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick::TradeKind;

    /// Surfaces this module's `tracing` output under `cargo test -- --nocapture`;
    /// harmless to call more than once across the test binary.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn order(id: i64, symbol: &str, side: Side, price: i64, volume: i64, ts: i64) -> MarketEvent {
        MarketEvent::Order(OrderTick {
            seq: 1,
            symbol: symbol.to_string(),
            timestamp_ms: ts,
            order_num: id,
            price_ticks: price,
            volume,
            kind: OrderKind::Limit,
            side,
            orig_num: id,
            seq2: 0,
            channel: 0,
        })
    }

    fn cancel(id: i64, symbol: &str, volume: i64, ts: i64) -> MarketEvent {
        MarketEvent::Order(OrderTick {
            seq: 2,
            symbol: symbol.to_string(),
            timestamp_ms: ts,
            order_num: id,
            price_ticks: 0,
            volume,
            kind: OrderKind::Cancel,
            side: Side::Buy,
            orig_num: id,
            seq2: 0,
            channel: 0,
        })
    }

    fn trade(
        trade_num: i64,
        symbol: &str,
        buy_id: i64,
        sell_id: i64,
        side: Side,
        volume: i64,
        ts: i64,
    ) -> MarketEvent {
        MarketEvent::Trade(TradeTick {
            seq: 1,
            symbol: symbol.to_string(),
            timestamp_ms: ts,
            trade_num,
            price_ticks: 100_000,
            volume,
            amount: volume * 100_000,
            side,
            kind: TradeKind::Execution,
            sell_id,
            buy_id,
        })
    }

    // S1 — basic insert/cancel.
    #[test]
    fn s1_insert_then_full_cancel_leaves_book_empty() {
        init_tracing();
        let mut book = BookState::new("600519".to_string());
        book.apply_event(order(100, "600519", Side::Buy, 101_000, 500, 1_000));
        assert!(book.has_order(100));
        book.apply_event(cancel(100, "600519", 500, 1_001));
        assert!(!book.has_order(100));
        assert_eq!(book.bid_volume_at(101_000), 0);
        assert_eq!(book.order_index_len(), 0);
    }

    // Shenzhen never resolves cancels via the order channel; a type==10
    // record there must be ignored, leaving the resting order untouched.
    #[test]
    fn sz_order_channel_cancel_is_ignored_not_applied() {
        let mut book = BookState::new("000001".to_string());
        book.apply_event(order(42, "000001", Side::Buy, 98_000, 300, 1_000));
        book.apply_event(cancel(42, "000001", 300, 1_001));

        assert!(book.has_order(42));
        assert_eq!(book.order_volume_remaining(42), Some(300));
        assert_eq!(book.bid_volume_at(98_000), 300);
        assert_eq!(book.pending_len(), 0);
    }

    // S2 — partial fill.
    #[test]
    fn s2_partial_fill_leaves_remainder_on_buy_side() {
        let mut book = BookState::new("000001".to_string());
        book.apply_event(order(7, "000001", Side::Buy, 98_000, 300, 1_000));
        book.apply_event(order(9, "000001", Side::Sell, 98_000, 200, 1_001));
        book.apply_event(trade(55, "000001", 7, 9, Side::Sell, 200, 1_002));

        assert_eq!(book.order_volume_remaining(7), Some(100));
        assert!(!book.has_order(9));
        assert_eq!(book.bid_volume_at(98_000), 100);
        assert_eq!(book.ask_volume_at(98_000), 0);
    }

    // S3 — out-of-order trade.
    #[test]
    fn s3_out_of_order_trade_resolves_without_double_decrement() {
        let mut book = BookState::new("000002".to_string());
        book.apply_event(trade(77, "000002", 21, 22, Side::Sell, 100, 900));
        book.apply_event(order(21, "000002", Side::Buy, 50_000, 100, 901));
        book.apply_event(order(22, "000002", Side::Sell, 50_000, 100, 902));
        book.drain_pending();

        assert!(!book.has_order(21));
        assert!(!book.has_order(22));
        assert_eq!(book.pending_len(), 0);
    }

    // S4 — Shanghai aggressor immunity.
    #[test]
    fn s4_shanghai_aggressor_side_is_not_decremented() {
        let mut book = BookState::new("600xxx".to_string());
        book.apply_event(order(500, "600xxx", Side::Buy, 100_000, 200, 1_000));
        book.apply_event(order(501, "600xxx", Side::Sell, 100_000, 200, 1_001));
        book.apply_event(trade(1, "600xxx", 500, 501, Side::Buy, 200, 1_002));

        assert_eq!(book.order_volume_remaining(500), Some(200));
        assert!(!book.has_order(501));
    }

    // S6 — history dedup.
    #[test]
    fn s6_history_seen_order_id_is_not_reinserted_in_phase_b() {
        let mut book = BookState::new("600519".to_string());
        let ev = order(900, "600519", Side::Buy, 101_000, 100, 33_000_000);
        // Phase A: history replay inserts the order and seeds the dedup set
        // from the window around the final watermark.
        book.apply_event(ev.clone());
        book.seed_history_ids(vec![(900, 33_000_000)], vec![]);
        assert!(book.has_order(900));
        assert_eq!(book.order_index_len(), 1);

        // Phase B re-delivers the same tick; it must be dropped, not
        // re-inserted or double-counted.
        book.apply_event(ev);
        assert!(book.has_order(900));
        assert_eq!(book.order_index_len(), 1);
        assert_eq!(book.bid_volume_at(101_000), 100);
    }

    #[test]
    fn invariant_order_volume_never_indexed_at_zero_or_below() {
        let mut book = BookState::new("600519".to_string());
        book.apply_event(order(1, "600519", Side::Buy, 100_000, 100, 1));
        book.apply_event(cancel(1, "600519", 100, 2));
        assert!(!book.has_order(1));
    }

    #[test]
    fn invariant_watermark_is_monotonic() {
        let mut book = BookState::new("600519".to_string());
        book.apply_event(order(1, "600519", Side::Buy, 100_000, 100, 5_000));
        assert_eq!(book.last_event_timestamp_ms(), 5_000);
        book.apply_event(cancel(2, "600519", 10, 1_000));
        assert_eq!(book.last_event_timestamp_ms(), 5_000);
    }

    #[test]
    fn stale_cancel_beyond_timeout_is_dropped_not_pending() {
        let mut book = BookState::new("600519".to_string());
        book.apply_event(order(1, "600519", Side::Buy, 100_000, 100, 100_000));
        book.apply_event(cancel(999, "600519", 10, 0));
        assert_eq!(book.pending_len(), 0);
    }

    #[test]
    fn fresh_cancel_for_unknown_order_is_pending_not_dropped() {
        let mut book = BookState::new("600519".to_string());
        book.apply_event(cancel(999, "600519", 10, 1_000));
        assert_eq!(book.pending_len(), 1);
    }

    #[test]
    fn execution_summing_to_full_volume_removes_order() {
        let mut book = BookState::new("000001".to_string());
        book.apply_event(order(1, "000001", Side::Buy, 100_000, 300, 1));
        book.apply_event(order(2, "000001", Side::Sell, 100_000, 300, 2));
        book.apply_event(trade(1, "000001", 1, 2, Side::Sell, 150, 3));
        book.apply_event(trade(2, "000001", 1, 2, Side::Sell, 150, 4));

        assert!(!book.has_order(1));
        assert!(!book.has_order(2));
        assert_eq!(book.bid_volume_at(100_000), 0);
    }

    #[test]
    fn trade_channel_cancel_reduces_and_erases_order() {
        let mut book = BookState::new("000001".to_string());
        book.apply_event(order(1, "000001", Side::Buy, 100_000, 300, 1));
        let cancel_via_trade = MarketEvent::Trade(TradeTick {
            seq: 1,
            symbol: "000001".to_string(),
            timestamp_ms: 2,
            trade_num: 9,
            price_ticks: 100_000,
            volume: 300,
            amount: 0,
            side: Side::Buy,
            kind: TradeKind::Cancel,
            sell_id: 0,
            buy_id: 1,
        });
        book.apply_event(cancel_via_trade);
        assert!(!book.has_order(1));
    }

    // Cancelling the middle order of a three-deep level must leave the
    // other two intact and still correctly aggregated, exercising the
    // intrusive-list unlink rather than a full-level rebuild.
    #[test]
    fn cancel_of_middle_order_at_a_level_preserves_siblings() {
        let mut book = BookState::new("600519".to_string());
        book.apply_event(order(1, "600519", Side::Buy, 100_000, 100, 1));
        book.apply_event(order(2, "600519", Side::Buy, 100_000, 200, 2));
        book.apply_event(order(3, "600519", Side::Buy, 100_000, 300, 3));
        assert_eq!(book.bid_volume_at(100_000), 600);

        book.apply_event(cancel(2, "600519", 200, 4));

        assert!(book.has_order(1));
        assert!(!book.has_order(2));
        assert!(book.has_order(3));
        assert_eq!(book.bid_volume_at(100_000), 400);

        // The level is still live and further fills against the remaining
        // two orders still work after the middle unlink.
        book.apply_event(order(9, "600519", Side::Sell, 100_000, 400, 5));
        book.apply_event(trade(100, "600519", 1, 9, Side::Sell, 100, 6));
        book.apply_event(trade(101, "600519", 3, 9, Side::Sell, 300, 7));
        assert!(!book.has_order(1));
        assert!(!book.has_order(3));
        assert_eq!(book.bid_volume_at(100_000), 0);
    }
}
