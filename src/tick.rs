//! Tick-level market event types and the primitive field decoders used to
//! build them from wire/CSV text.

use std::fmt;

/// Side of a resting order or a trade's aggressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            1 => Some(Side::Buy),
            2 => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Which exchange a symbol trades on, derived from the leading digit of the
/// symbol code (Shanghai codes start with '6').
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Shanghai,
    Shenzhen,
}

impl Market {
    pub fn from_symbol(symbol: &str) -> Self {
        if symbol.starts_with('6') {
            Market::Shanghai
        } else {
            Market::Shenzhen
        }
    }

    pub fn is_shanghai(self) -> bool {
        matches!(self, Market::Shanghai)
    }
}

/// Kind of an order tuple, per the live-feed wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    Limit,
    BestOfSide,
    Cancel,
}

impl OrderKind {
    fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            1 => Some(OrderKind::Market),
            2 => Some(OrderKind::Limit),
            3 => Some(OrderKind::BestOfSide),
            10 => Some(OrderKind::Cancel),
            _ => None,
        }
    }
}

/// Kind of a trade tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    Execution,
    Cancel,
}

impl TradeKind {
    fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(TradeKind::Execution),
            1 => Some(TradeKind::Cancel),
            _ => None,
        }
    }
}

/// A decoded per-order tick: a new limit order or a cancellation.
#[derive(Debug, Clone)]
pub struct OrderTick {
    pub seq: i64,
    pub symbol: String,
    pub timestamp_ms: i64,
    pub order_num: i64,
    pub price_ticks: i64,
    pub volume: i64,
    pub kind: OrderKind,
    pub side: Side,
    pub orig_num: i64,
    pub seq2: i64,
    pub channel: i64,
}

impl OrderTick {
    /// Order id used for book indexing: Shanghai feeds identify orders by
    /// their original order number, Shenzhen feeds by the order number
    /// carried in this record.
    pub fn id(&self) -> i64 {
        if Market::from_symbol(&self.symbol).is_shanghai() {
            self.orig_num
        } else {
            self.order_num
        }
    }
}

/// A decoded per-trade tick: an execution or a Shenzhen-style cancel report.
#[derive(Debug, Clone)]
pub struct TradeTick {
    pub seq: i64,
    pub symbol: String,
    pub timestamp_ms: i64,
    pub trade_num: i64,
    pub price_ticks: i64,
    pub volume: i64,
    pub amount: i64,
    pub side: Side,
    pub kind: TradeKind,
    pub sell_id: i64,
    pub buy_id: i64,
}

/// A fully decoded tick event, the unit the parser hands to the router.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    Order(OrderTick),
    Trade(TradeTick),
}

impl MarketEvent {
    pub fn symbol(&self) -> &str {
        match self {
            MarketEvent::Order(o) => &o.symbol,
            MarketEvent::Trade(t) => &t.symbol,
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        match self {
            MarketEvent::Order(o) => o.timestamp_ms,
            MarketEvent::Trade(t) => t.timestamp_ms,
        }
    }
}

/// Parses an integer field. Empty input is 0; non-numeric content is 0 with
/// a logged warning, matching the original `svToInt` contract.
pub fn sv_to_int(field: &str) -> i64 {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return 0;
    }
    match trimmed.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(target: "parser", field = trimmed, "invalid integer field, using 0");
            0
        }
    }
}

/// Converts an `HHMMSSmmm` (9 digit) or `HMMSSmmm` (8 digit) integer time
/// field into milliseconds since midnight. Returns -1 if any component is
/// out of range.
///
/// The digit count doesn't change the arithmetic: dividing/modding the
/// integer value by fixed powers of ten recovers H/M/S/ms the same way
/// whether H happens to have a leading zero (9 digits) or not (8 digits).
pub fn time_to_ms(time_field: i64) -> i64 {
    if time_field < 0 {
        return -1;
    }
    let hour = time_field / 10_000_000;
    let minute = (time_field / 100_000) % 100;
    let second = (time_field / 1_000) % 100;
    let millis = time_field % 1_000;

    if !(0..=23).contains(&hour)
        || !(0..=59).contains(&minute)
        || !(0..=59).contains(&second)
        || !(0..=999).contains(&millis)
    {
        return -1;
    }

    (hour * 3600 + minute * 60 + second) * 1000 + millis
}

/// Builds an `OrderTick` from a 13 (live) or 13-14 (historical, extra
/// trailing column ignored) field tuple in
/// `seq, symbol, code, date, time, order_num, price, volume, kind, side,
/// orig_num, seq2, channel` order (the `code`/`date` columns are present in
/// the wire tuple but unused by the book).
pub fn order_tick_from_fields(fields: &[&str]) -> Option<OrderTick> {
    if fields.len() < 13 {
        return None;
    }
    let seq = sv_to_int(fields[0]);
    let symbol = fields[1].trim().to_string();
    let time_raw = sv_to_int(fields[4]);
    let order_num = sv_to_int(fields[5]);
    let price_ticks = sv_to_int(fields[6]);
    let volume = sv_to_int(fields[7]);
    let kind = OrderKind::from_raw(sv_to_int(fields[8]))?;
    let side = Side::from_raw(sv_to_int(fields[9]))?;
    let orig_num = sv_to_int(fields[10]);
    let seq2 = sv_to_int(fields[11]);
    let channel = sv_to_int(fields[12]);

    Some(OrderTick {
        seq,
        symbol,
        timestamp_ms: time_to_ms(time_raw),
        order_num,
        price_ticks,
        volume,
        kind,
        side,
        orig_num,
        seq2,
        channel,
    })
}

/// Builds a `TradeTick` from a 14 field tuple in
/// `seq, symbol, code, date, time, trade_num, price, volume, amount, side,
/// kind, channel_or_blank, sell_id, buy_id` order.
pub fn trade_tick_from_fields(fields: &[&str]) -> Option<TradeTick> {
    if fields.len() < 14 {
        return None;
    }
    let seq = sv_to_int(fields[0]);
    let symbol = fields[1].trim().to_string();
    let time_raw = sv_to_int(fields[4]);
    let trade_num = sv_to_int(fields[5]);
    let price_ticks = sv_to_int(fields[6]);
    let volume = sv_to_int(fields[7]);
    let amount = sv_to_int(fields[8]);
    let side = Side::from_raw(sv_to_int(fields[9]))?;
    let kind = TradeKind::from_raw(sv_to_int(fields[10]))?;
    let sell_id = sv_to_int(fields[12]);
    let buy_id = sv_to_int(fields[13]);

    Some(TradeTick {
        seq,
        symbol,
        timestamp_ms: time_to_ms(time_raw),
        trade_num,
        price_ticks,
        volume,
        amount,
        side,
        kind,
        sell_id,
        buy_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sv_to_int_empty_is_zero() {
        assert_eq!(sv_to_int(""), 0);
    }

    #[test]
    fn sv_to_int_non_numeric_is_zero() {
        assert_eq!(sv_to_int("abc"), 0);
    }

    #[test]
    fn sv_to_int_parses_value() {
        assert_eq!(sv_to_int("12345"), 12345);
    }

    #[test]
    fn time_to_ms_nine_digit() {
        // 09:31:05.123 -> ((9*3600)+31*60+5)*1000+123
        assert_eq!(time_to_ms(093105123), ((9 * 3600 + 31 * 60 + 5) * 1000 + 123));
    }

    #[test]
    fn time_to_ms_eight_digit() {
        // 9:31:05.123 (no leading zero on hour) -> same value
        assert_eq!(time_to_ms(93105123), ((9 * 3600 + 31 * 60 + 5) * 1000 + 123));
    }

    #[test]
    fn time_to_ms_out_of_range_hour() {
        assert_eq!(time_to_ms(253105123), -1);
    }

    #[test]
    fn market_from_symbol() {
        assert!(Market::from_symbol("600519").is_shanghai());
        assert!(!Market::from_symbol("000001").is_shanghai());
    }

    #[test]
    fn order_id_uses_orig_num_for_shanghai() {
        let fields = vec![
            "1", "600519", "0", "0", "093000000", "100", "150000", "500", "2", "1", "900", "0",
            "1",
        ];
        let tick = order_tick_from_fields(&fields).unwrap();
        assert_eq!(tick.id(), 900);
    }

    #[test]
    fn order_id_uses_order_num_for_shenzhen() {
        let fields = vec![
            "1", "000001", "0", "0", "093000000", "100", "150000", "500", "2", "1", "900", "0",
            "1",
        ];
        let tick = order_tick_from_fields(&fields).unwrap();
        assert_eq!(tick.id(), 100);
    }

    proptest::proptest! {
        // sv_to_int round-trips any non-negative integer through its decimal
        // string form (spec.md §8 round-trip law: decode(encode(x)) == x).
        #[test]
        fn sv_to_int_roundtrips_non_negative(n in 0i64..1_000_000_000_000) {
            proptest::prop_assert_eq!(sv_to_int(&n.to_string()), n);
        }

        // time_to_ms is monotonic within a single second: later millisecond
        // offsets never decode to an earlier value.
        #[test]
        fn time_to_ms_monotonic_within_second(h in 0i64..24, m in 0i64..60, s in 0i64..60, ms1 in 0i64..999, ms2 in 0i64..999) {
            let base = h * 10_000_000 + m * 100_000 + s * 1_000;
            let lo = base + ms1.min(ms2);
            let hi = base + ms1.max(ms2);
            proptest::prop_assert!(time_to_ms(lo) <= time_to_ms(hi));
        }
    }
}
