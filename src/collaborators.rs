//! Named interfaces for the components spec.md §1 treats as external
//! collaborators: the signal sink and the history loader. Neither is
//! implemented here (no TCP, HTTP, or pipe I/O in this crate) — only the
//! contract a concrete integration must satisfy to plug into a book.

/// Accepts alert payloads for downstream delivery. Called synchronously
/// from a book's processing thread (spec.md §5); a failed send is logged by
/// the caller and never retried or allowed to block book progress.
pub trait SignalSink: Send + Sync {
    fn emit(&self, payload: &str) -> Result<(), String>;
}

/// Which of a symbol's two historical feeds a download request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFeedKind {
    Order,
    Trade,
}

/// Requests historical backfill for a symbol. A real implementation pushes
/// decoded events to the book via `push_history` and then flips the
/// matching `history_order_done`/`history_trade_done` flag once exhausted;
/// this crate only defines the request surface a book-owning orchestrator
/// calls into.
pub trait HistoryLoader: Send + Sync {
    fn request(&self, symbol: &str, kind: HistoryFeedKind);
}

/// A `SignalSink` that records payloads instead of delivering them;
/// useful for tests and as a safe default when no real sink is wired up.
#[derive(Debug, Default)]
pub struct NullSignalSink;

impl SignalSink for NullSignalSink {
    fn emit(&self, _payload: &str) -> Result<(), String> {
        Ok(())
    }
}
