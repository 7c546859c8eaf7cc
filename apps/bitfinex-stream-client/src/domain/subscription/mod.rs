//! Subscription Requests and Registry
//!
//! Domain types for the declarative subscription set the client keeps
//! active on the Bitfinex stream.
//!
//! # Design
//!
//! The registry is an ordered, duplicate-free sequence of
//! [`SubscriptionRequest`] values. It is built once at startup and then
//! only read, so replay order is deterministic and stable across
//! reconnects (server-side channel ids are assigned predictably, which
//! helps debugging). Adding a request that is already present is a
//! no-op, not an error.

// =============================================================================
// Channel Parameters
// =============================================================================

/// Candle aggregation timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    /// One minute candles.
    OneMinute,
    /// Five minute candles.
    FiveMinutes,
    /// Fifteen minute candles.
    FifteenMinutes,
    /// Thirty minute candles.
    ThirtyMinutes,
    /// One hour candles.
    OneHour,
    /// Three hour candles.
    ThreeHours,
    /// Six hour candles.
    SixHours,
    /// Twelve hour candles.
    TwelveHours,
    /// One day candles.
    OneDay,
    /// One week candles.
    OneWeek,
    /// Two week candles.
    TwoWeeks,
    /// One month candles.
    OneMonth,
}

impl Timeframe {
    /// Wire form used in candle subscription keys (`trade:<tf>:<symbol>`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::ThreeHours => "3h",
            Self::SixHours => "6h",
            Self::TwelveHours => "12h",
            Self::OneDay => "1D",
            Self::OneWeek => "7D",
            Self::TwoWeeks => "14D",
            Self::OneMonth => "1M",
        }
    }
}

/// Order book price aggregation tier.
///
/// `P0` is the most precise aggregated tier; `P4` the coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    /// Highest precision aggregated book.
    #[default]
    P0,
    /// One level coarser than `P0`.
    P1,
    /// Two levels coarser than `P0`.
    P2,
    /// Three levels coarser than `P0`.
    P3,
    /// Coarsest aggregated book.
    P4,
}

impl Precision {
    /// Wire form of the precision tier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
        }
    }
}

/// Raw order book depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BookLength {
    /// Top 25 levels per side.
    #[default]
    TwentyFive,
    /// Top 100 levels per side.
    OneHundred,
}

impl BookLength {
    /// Wire form of the depth parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TwentyFive => "25",
            Self::OneHundred => "100",
        }
    }
}

// =============================================================================
// Subscription Request
// =============================================================================

/// One logical subscription the client keeps active.
///
/// Immutable once constructed. Equality is structural over
/// (variant, key, parameters) and is what the registry uses to detect
/// duplicate registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionRequest {
    /// Ticker updates for a trading pair.
    Ticker {
        /// Trading pair, e.g. "BTC/USD".
        symbol: String,
    },
    /// Executed trades for a trading pair.
    Trades {
        /// Trading pair, e.g. "BTC/USD".
        symbol: String,
    },
    /// Funding trades for a currency.
    Funding {
        /// Funding currency, e.g. "USD".
        currency: String,
    },
    /// OHLCV candles for a trading pair at a timeframe.
    Candles {
        /// Trading pair, e.g. "BTC/USD".
        symbol: String,
        /// Aggregation timeframe.
        timeframe: Timeframe,
    },
    /// Aggregated order book for a symbol.
    OrderBook {
        /// Trading pair or funding symbol, e.g. "BTC/USD" or "fUSD".
        symbol: String,
        /// Price aggregation tier.
        precision: Precision,
    },
    /// Raw (per-order) order book for a symbol.
    RawOrderBook {
        /// Trading pair or funding symbol.
        symbol: String,
        /// Book depth.
        length: BookLength,
    },
    /// Status channel, e.g. liquidation feed or derivatives status.
    Status {
        /// Status key, e.g. "liq:global" or "deriv:tBTCF0:USTF0".
        key: String,
    },
}

impl SubscriptionRequest {
    /// Ticker subscription for a trading pair.
    pub fn ticker(symbol: impl Into<String>) -> Self {
        Self::Ticker {
            symbol: symbol.into(),
        }
    }

    /// Trades subscription for a trading pair.
    pub fn trades(symbol: impl Into<String>) -> Self {
        Self::Trades {
            symbol: symbol.into(),
        }
    }

    /// Funding trades subscription for a currency.
    pub fn funding(currency: impl Into<String>) -> Self {
        Self::Funding {
            currency: currency.into(),
        }
    }

    /// Candle subscription for a trading pair at a timeframe.
    pub fn candles(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self::Candles {
            symbol: symbol.into(),
            timeframe,
        }
    }

    /// Aggregated order book subscription.
    pub fn order_book(symbol: impl Into<String>, precision: Precision) -> Self {
        Self::OrderBook {
            symbol: symbol.into(),
            precision,
        }
    }

    /// Raw order book subscription.
    pub fn raw_order_book(symbol: impl Into<String>, length: BookLength) -> Self {
        Self::RawOrderBook {
            symbol: symbol.into(),
            length,
        }
    }

    /// Status channel subscription.
    pub fn status(key: impl Into<String>) -> Self {
        Self::Status { key: key.into() }
    }

    /// The symbol or key this request targets, for logging.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Ticker { symbol }
            | Self::Trades { symbol }
            | Self::Candles { symbol, .. }
            | Self::OrderBook { symbol, .. }
            | Self::RawOrderBook { symbol, .. } => symbol,
            Self::Funding { currency } => currency,
            Self::Status { key } => key,
        }
    }

    /// The wire channel name this request subscribes to.
    #[must_use]
    pub const fn channel(&self) -> &'static str {
        match self {
            Self::Ticker { .. } => "ticker",
            Self::Trades { .. } | Self::Funding { .. } => "trades",
            Self::Candles { .. } => "candles",
            Self::OrderBook { .. } | Self::RawOrderBook { .. } => "book",
            Self::Status { .. } => "status",
        }
    }
}

// =============================================================================
// Subscription Registry
// =============================================================================

/// Ordered, duplicate-free set of subscription requests.
///
/// Insertion order is the replay order. Construction-time only; the
/// registry is shared read-only with the coordinator afterwards.
///
/// # Example
///
/// ```rust
/// use bitfinex_stream_client::domain::subscription::{SubscriptionRegistry, SubscriptionRequest};
///
/// let mut registry = SubscriptionRegistry::new();
/// assert!(registry.add(SubscriptionRequest::ticker("BTC/USD")));
/// assert!(!registry.add(SubscriptionRequest::ticker("BTC/USD"))); // duplicate, no-op
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<SubscriptionRequest>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a request if not already present.
    ///
    /// Returns `true` if the request was inserted, `false` if an equal
    /// request was already registered.
    pub fn add(&mut self, request: SubscriptionRequest) -> bool {
        if self.entries.contains(&request) {
            return false;
        }
        self.entries.push(request);
        true
    }

    /// The full registered sequence, in insertion order.
    #[must_use]
    pub fn all(&self) -> &[SubscriptionRequest] {
        &self.entries
    }

    /// Number of registered requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn add_new_request() {
        let mut registry = SubscriptionRegistry::new();
        assert!(registry.add(SubscriptionRequest::ticker("BTC/USD")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_add_is_noop() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(SubscriptionRequest::trades("BTC/USD"));
        assert!(!registry.add(SubscriptionRequest::trades("BTC/USD")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn equality_includes_parameters() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(SubscriptionRequest::order_book("BTC/USD", Precision::P0));
        // Same symbol, different precision tier: a distinct subscription.
        assert!(registry.add(SubscriptionRequest::order_book("BTC/USD", Precision::P3)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn replay_order_is_insertion_order() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(SubscriptionRequest::ticker("BTC/USD"));
        registry.add(SubscriptionRequest::trades("BTC/USD"));
        registry.add(SubscriptionRequest::funding("USD"));

        let keys: Vec<_> = registry.all().iter().map(SubscriptionRequest::key).collect();
        assert_eq!(keys, vec!["BTC/USD", "BTC/USD", "USD"]);
    }

    #[test]
    fn ticker_and_trades_for_same_symbol_are_distinct() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(SubscriptionRequest::ticker("ETH/USD"));
        assert!(registry.add(SubscriptionRequest::trades("ETH/USD")));
    }

    #[test]
    fn channel_names() {
        assert_eq!(SubscriptionRequest::ticker("BTC/USD").channel(), "ticker");
        assert_eq!(SubscriptionRequest::trades("BTC/USD").channel(), "trades");
        assert_eq!(SubscriptionRequest::funding("USD").channel(), "trades");
        assert_eq!(
            SubscriptionRequest::candles("BTC/USD", Timeframe::OneMinute).channel(),
            "candles"
        );
        assert_eq!(
            SubscriptionRequest::order_book("BTC/USD", Precision::P0).channel(),
            "book"
        );
        assert_eq!(
            SubscriptionRequest::raw_order_book("BTC/USD", BookLength::OneHundred).channel(),
            "book"
        );
        assert_eq!(SubscriptionRequest::status("liq:global").channel(), "status");
    }

    fn arb_request() -> impl Strategy<Value = SubscriptionRequest> {
        let symbol = prop::sample::select(vec!["BTC/USD", "ETH/USD", "NEC/ETH", "fUSD"]);
        prop_oneof![
            symbol.clone().prop_map(SubscriptionRequest::ticker),
            symbol.clone().prop_map(SubscriptionRequest::trades),
            symbol
                .clone()
                .prop_map(|s| SubscriptionRequest::candles(s, Timeframe::OneMinute)),
            symbol.prop_map(|s| SubscriptionRequest::order_book(s, Precision::P0)),
        ]
    }

    proptest! {
        #[test]
        fn re_adding_a_sequence_never_grows_the_registry(
            requests in prop::collection::vec(arb_request(), 0..20)
        ) {
            let mut registry = SubscriptionRegistry::new();
            for request in &requests {
                registry.add(request.clone());
            }
            let first_pass = registry.len();
            let first_order: Vec<_> = registry.all().to_vec();

            for request in &requests {
                registry.add(request.clone());
            }

            prop_assert_eq!(registry.len(), first_pass);
            prop_assert_eq!(registry.all(), first_order.as_slice());
        }
    }
}
