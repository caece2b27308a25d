//! Order book error types

use thiserror::Error;

/// Errors that can surface from the order book engine. Every other failure
/// mode in this system (malformed records, transient resolution, stale
/// pending events, duplicate replays, unknown symbols) is handled in place
/// via logging and never becomes an `Err` — this type is reserved for
/// structural violations and fatal infra failures that must reach a
/// supervisor.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrderBookError {
    /// A symbol was registered twice with the book manager.
    #[error("book already registered for symbol: {0}")]
    DuplicateSymbol(String),

    /// The processing queue for a symbol could not accept more work because
    /// the book's processing thread has already exited.
    #[error("queue for symbol {symbol} is closed: {reason}")]
    QueueClosed { symbol: String, reason: String },

    /// The signal sink rejected an alert payload.
    #[error("signal sink send failed for {symbol}: {reason}")]
    SinkSendFailed { symbol: String, reason: String },

    /// Account registry persistence failed to read or write its backing
    /// file.
    #[error("registry persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    /// Registry contents could not be deserialized.
    #[error("registry deserialization error: {0}")]
    RegistryFormat(#[from] serde_json::Error),

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}
