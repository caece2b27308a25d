/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/10/25
******************************************************************************/

//! # L2 Tick-by-Tick Order Book Reconstruction Engine
//!
//! A real-time order book reconstruction engine for Shanghai and Shenzhen
//! Level-2 tick-by-tick market data. This crate rebuilds per-symbol limit
//! order books from raw order and trade tick feeds, reconciling a history
//! backfill against a live feed so that a book started mid-session reaches
//! the same state as one that has been running since the open.
//!
//! ## Key Features
//!
//! - **History-then-live reconstruction**: each symbol's book replays a
//!   sorted history backfill before switching to the live feed, handing off
//!   a bounded-retention set of seen order/trade ids so replayed history
//!   can't be double-applied.
//! - **SH/SZ aware state machine**: Shanghai and Shenzhen order and trade
//!   semantics differ (order id field, aggressor-side immunity on matches)
//!   and are dispatched by `Market::from_symbol`.
//! - **Out-of-order event resolution**: cancels and trades that reference an
//!   order not yet seen are held on a per-book pending queue and replayed
//!   once the watermark advances, with a bounded timeout before a stale
//!   event is dropped.
//! - **Seal-unwind detection**: a per-book strategy watches the bid/ask
//!   imbalance at a limit-up price for the signature of a large seal order
//!   unwinding, and emits an alert through a pluggable `SignalSink`.
//! - **One thread per book**: each symbol's book owns a single writer
//!   thread; readers take a consistent snapshot through `Arc<RwLock<_>>`
//!   without blocking the writer.
//!
//! ## Status
//! This project is currently in active development and is not yet suitable
//! for production use.

pub mod collaborators;
pub mod config;
pub mod orderbook;
pub mod parser;
pub mod prelude;
pub mod registry;
pub mod router;
pub mod tick;

pub use collaborators::{HistoryFeedKind, HistoryLoader, NullSignalSink, SignalSink};
pub use config::EngineConfig;
pub use orderbook::{BookManager, BookSnapshot, BookState, OrderBookError, SymbolBook};
pub use parser::{FeedKind, FrameParser};
pub use registry::{format_account, AccountRegistry};
pub use router::DataRouter;
pub use tick::{Market, MarketEvent, OrderKind, OrderTick, Side, TradeKind, TradeTick};
