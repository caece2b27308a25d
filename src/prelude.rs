/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/10/25
******************************************************************************/

//! Prelude module that re-exports the commonly used types and traits from
//! this crate. Import the essentials with:
//!
//! ```rust
//! use l2_tickbook::prelude::*;
//! ```

pub use crate::collaborators::{HistoryFeedKind, HistoryLoader, NullSignalSink, SignalSink};
pub use crate::config::EngineConfig;
pub use crate::orderbook::manager::BookManager;
pub use crate::orderbook::{BookSnapshot, BookState, OrderBookError, SymbolBook};
pub use crate::parser::{FeedKind, FrameParser};
pub use crate::registry::{format_account, AccountRegistry};
pub use crate::router::DataRouter;
pub use crate::tick::{Market, MarketEvent, OrderKind, OrderTick, Side, TradeKind, TradeTick};
