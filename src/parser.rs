//! Streaming frame parser for the `<tuple#tuple#...>` tick wire format.
//!
//! Grounded in the original `L2Parser.h`'s `splitByComma`/`parseL2Data`, with
//! the addition of a carried residual buffer so the parser can be driven
//! incrementally from a byte stream instead of requiring whole frames.

use crate::tick::{MarketEvent, order_tick_from_fields, trade_tick_from_fields};

/// Which of the two parallel feeds a frame came from; determines whether
/// tuples are decoded as order or trade records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Order,
    Trade,
}

/// Incremental parser that preserves a residual buffer across calls so a
/// frame split across two network reads is not lost.
#[derive(Debug, Default)]
pub struct FrameParser {
    residual: String,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of raw text through the parser, returning every
    /// well-formed `MarketEvent` decoded from complete `<...>` records.
    ///
    /// Residual-buffer rule: if the scan encounters `<` with no matching
    /// `>`, everything from that `<` onward is carried into the next call.
    /// If no `<` is found at all, the buffer is discarded (desynced noise).
    pub fn feed(&mut self, chunk: &str, feed: FeedKind) -> Vec<MarketEvent> {
        let mut data = std::mem::take(&mut self.residual);
        data.push_str(chunk);

        let mut events = Vec::new();
        let mut pos = 0usize;
        let bytes = data.as_str();

        loop {
            let Some(open_rel) = bytes[pos..].find('<') else {
                // No frame start left in the remaining data; discard it.
                pos = bytes.len();
                break;
            };
            let open = pos + open_rel;

            let Some(close_rel) = bytes[open + 1..].find('>') else {
                // Incomplete frame; carry from '<' onward into next call.
                self.residual = bytes[open..].to_string();
                return events;
            };
            let close = open + 1 + close_rel;

            let record = &bytes[open + 1..close];
            self.parse_record(record, feed, &mut events);

            pos = close + 1;
        }

        let _ = pos;
        events
    }

    fn parse_record(&self, record: &str, feed: FeedKind, events: &mut Vec<MarketEvent>) {
        for tuple in record.split('#') {
            if tuple.is_empty() {
                continue;
            }
            let fields: Vec<&str> = tuple.split(',').collect();
            match feed {
                FeedKind::Order => match order_tick_from_fields(&fields) {
                    Some(tick) => events.push(MarketEvent::Order(tick)),
                    None => {
                        tracing::warn!(
                            target: "parser",
                            fields = fields.len(),
                            "dropping malformed order tuple"
                        );
                    }
                },
                FeedKind::Trade => match trade_tick_from_fields(&fields) {
                    Some(tick) => events.push(MarketEvent::Trade(tick)),
                    None => {
                        tracing::warn!(
                            target: "parser",
                            fields = fields.len(),
                            "dropping malformed trade tuple"
                        );
                    }
                },
            }
        }
    }
}
