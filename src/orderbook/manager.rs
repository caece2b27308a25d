//! Multi-symbol book management: the orchestrator that owns every
//! `SymbolBook` and routes events to the right one by symbol.
//!
//! Grounded in the teacher crate's `BookManagerStd` (`HashMap<String,
//! OrderBook<T>>`, `add_book`/`get_book`/`symbols`/`remove_book`), adapted
//! to a registry of threaded `SymbolBook` handles instead of owned
//! single-threaded books, matching spec.md §5: "the symbol -> book map is
//! created by a single orchestrator at bootstrap and treated as read-mostly
//! afterwards; any later insertions are serialized by the orchestrator."

use super::book::SymbolBook;
use super::error::OrderBookError;
use crate::collaborators::SignalSink;
use crate::registry::AccountRegistry;
use crate::tick::MarketEvent;

use std::collections::HashMap;
use std::sync::Arc;

/// Owns one `SymbolBook` per monitored symbol and is the sole point where
/// new symbols are registered.
pub struct BookManager {
    books: HashMap<String, SymbolBook>,
    sink: Arc<dyn SignalSink>,
    registry: Arc<AccountRegistry>,
}

impl BookManager {
    pub fn new(sink: Arc<dyn SignalSink>, registry: Arc<AccountRegistry>) -> Self {
        Self {
            books: HashMap::new(),
            sink,
            registry,
        }
    }

    /// Registers a new symbol and spawns its processing thread. Fails if
    /// the symbol is already registered.
    pub fn add_book(&mut self, symbol: &str) -> Result<(), OrderBookError> {
        if self.books.contains_key(symbol) {
            return Err(OrderBookError::DuplicateSymbol(symbol.to_string()));
        }
        let book = SymbolBook::spawn(
            symbol.to_string(),
            Arc::clone(&self.sink),
            Arc::clone(&self.registry),
        );
        self.books.insert(symbol.to_string(), book);
        Ok(())
    }

    pub fn has_book(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    pub fn get_book(&self, symbol: &str) -> Option<&SymbolBook> {
        self.books.get(symbol)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.books.keys().cloned().collect()
    }

    /// Shuts the book down and drops its handle.
    pub fn remove_book(&mut self, symbol: &str) -> bool {
        self.books.remove(symbol).is_some()
    }

    /// Dispatches a history event to its symbol's book. Unknown symbols are
    /// logged and dropped (spec.md §4.2).
    pub fn push_history(&self, event: MarketEvent) {
        let symbol = event.symbol().to_string();
        match self.books.get(&symbol) {
            Some(book) => {
                if let Err(err) = book.push_history(event) {
                    tracing::warn!(target: "router", symbol = %symbol, error = %err, "failed to enqueue history event");
                }
            }
            None => {
                tracing::warn!(target: "router", symbol = %symbol, "dropping history event for unregistered symbol");
            }
        }
    }

    /// Dispatches a live event to its symbol's book. Unknown symbols are
    /// logged and dropped (spec.md §4.2).
    pub fn push_live(&self, event: MarketEvent) {
        let symbol = event.symbol().to_string();
        match self.books.get(&symbol) {
            Some(book) => {
                if let Err(err) = book.push_live(event) {
                    tracing::warn!(target: "router", symbol = %symbol, error = %err, "failed to enqueue live event");
                }
            }
            None => {
                tracing::warn!(target: "router", symbol = %symbol, "dropping live event for unregistered symbol");
            }
        }
    }

    pub fn mark_history_order_done(&self, symbol: &str) {
        if let Some(book) = self.books.get(symbol) {
            book.mark_history_order_done();
        }
    }

    pub fn mark_history_trade_done(&self, symbol: &str) {
        if let Some(book) = self.books.get(symbol) {
            book.mark_history_trade_done();
        }
    }

    /// Shuts down every book's processing thread.
    pub fn shutdown_all(&mut self) {
        for (_, mut book) in self.books.drain() {
            book.shutdown();
        }
    }
}

impl Drop for BookManager {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}
