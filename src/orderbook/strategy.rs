//! Limit-up seal-unwind detector (spec.md §4.4).
//!
//! Tracks the historical high-water mark of unopposed buy volume sitting at
//! the apparent ceiling price and fires once when that volume collapses
//! quickly relative to its own recent trend.

use super::level::BookSide;
use std::collections::BTreeMap;

const SEAL_NOTIONAL_THRESHOLD: i128 = 20_000_000 * 10_000;
const SEAL_RATIO_WINDOW_MS: i64 = 5_000;
const SEAL_RATIO_ALERT_THRESHOLD: f64 = 2.0 / 3.0;
const SEAL_RATIO_CHANGE_THRESHOLD: f64 = 0.2;

#[derive(Debug, Default)]
pub struct SealStrategy {
    max_seal_volume: i64,
    seal_ratio_window: BTreeMap<i64, f64>,
    already_alerted: bool,
}

impl SealStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn already_alerted(&self) -> bool {
        self.already_alerted
    }

    /// Marks the alert as sent. Only the caller knows whether the Signal
    /// Sink actually accepted the payload (spec.md §4.5: "`already_alerted`
    /// still flips only on a successful submission attempt"), so `evaluate`
    /// itself never sets this — it's on the processing loop to call this
    /// after a successful send.
    pub fn mark_alerted(&mut self) {
        self.already_alerted = true;
    }

    /// Evaluates the ceiling-seal condition after a live event's book
    /// mutation. Returns `true` the moment the alert condition is met; the
    /// caller must send the alert and call `mark_alerted` on success before
    /// this stops returning `true` on subsequent calls.
    pub fn evaluate(&mut self, bids: &BookSide, asks: &BookSide, event_timestamp_ms: i64) -> bool {
        if self.already_alerted {
            return false;
        }
        let Some(bb_price) = bids.best_price(true) else {
            return false;
        };
        let bb_vol = bids.volume_at(bb_price);

        if let Some(ba_price) = asks.best_price(false) {
            let probe_limit_price = bb_price.max(ba_price);
            if bb_price < probe_limit_price {
                self.max_seal_volume = 0;
                return false;
            }
        }

        if (bb_vol as i128) * (bb_price as i128) < SEAL_NOTIONAL_THRESHOLD {
            return false;
        }

        let unopposed_ask = asks.volume_at_or_below(bb_price);
        let seal_volume = bb_vol - unopposed_ask;

        if seal_volume > self.max_seal_volume {
            self.max_seal_volume = seal_volume;
            // A fresh high-water mark is itself a ratio-1.0 sample: the seal
            // volume just equaled its own running max. Recording it here
            // keeps the window populated so a later decline has a real
            // max_ratio_in_window to compare against, instead of silently
            // defaulting to 0.0 and never detecting a genuine unwind.
            self.seal_ratio_window
                .retain(|&t, _| t > event_timestamp_ms - SEAL_RATIO_WINDOW_MS);
            self.seal_ratio_window.insert(event_timestamp_ms, 1.0);
            return false;
        }

        self.seal_ratio_window
            .retain(|&t, _| t > event_timestamp_ms - SEAL_RATIO_WINDOW_MS);

        let ratio = if self.max_seal_volume > 0 {
            seal_volume as f64 / self.max_seal_volume as f64
        } else {
            0.0
        };

        let max_ratio_in_window = self
            .seal_ratio_window
            .values()
            .copied()
            .fold(0.0_f64, f64::max);
        let ratio_change = max_ratio_in_window - ratio;

        self.seal_ratio_window.insert(event_timestamp_ms, ratio);

        self.max_seal_volume > 0
            && ratio < SEAL_RATIO_ALERT_THRESHOLD
            && ratio_change > SEAL_RATIO_CHANGE_THRESHOLD
    }
}
