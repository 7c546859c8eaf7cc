//! Outbound Request Encoding
//!
//! Serializes domain subscription requests into Bitfinex v2 `subscribe`
//! event JSON, plus the `ping` event.
//!
//! # Wire Format
//! ```json
//! {"event":"subscribe","channel":"ticker","symbol":"tBTCUSD"}
//! {"event":"subscribe","channel":"candles","key":"trade:1m:tBTCUSD"}
//! {"event":"subscribe","channel":"book","symbol":"tBTCUSD","prec":"R0","len":"100"}
//! {"event":"ping","cid":123456}
//! ```

use serde::Serialize;

use crate::domain::subscription::SubscriptionRequest;

/// Subscribe event, fields populated per channel kind.
#[derive(Debug, Serialize)]
struct SubscribeEvent {
    event: &'static str,
    channel: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prec: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    len: Option<&'static str>,
}

impl SubscribeEvent {
    fn new(channel: &'static str) -> Self {
        Self {
            event: "subscribe",
            channel,
            symbol: None,
            key: None,
            prec: None,
            len: None,
        }
    }
}

/// Ping event with a correlation id echoed back in the pong.
#[derive(Debug, Serialize)]
struct PingEvent {
    event: &'static str,
    cid: u64,
}

/// Normalize a human-friendly pair like "BTC/USD" to the wire symbol
/// "tBTCUSD". Already-prefixed symbols ("tBTCUSD", "fUSD") pass
/// through unchanged.
#[must_use]
pub fn wire_symbol(symbol: &str) -> String {
    if !symbol.contains('/') && (symbol.starts_with('t') || symbol.starts_with('f')) {
        return symbol.to_string();
    }
    let compact: String = symbol.chars().filter(|c| *c != '/').collect();
    format!("t{compact}")
}

/// Funding symbol for a currency: "USD" -> "fUSD".
#[must_use]
pub fn funding_symbol(currency: &str) -> String {
    if currency.starts_with('f') {
        currency.to_string()
    } else {
        format!("f{currency}")
    }
}

/// Encode one subscription request to its wire JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn encode_subscribe(request: &SubscriptionRequest) -> Result<String, serde_json::Error> {
    let mut event = SubscribeEvent::new(request.channel());

    match request {
        SubscriptionRequest::Ticker { symbol } | SubscriptionRequest::Trades { symbol } => {
            event.symbol = Some(wire_symbol(symbol));
        }
        SubscriptionRequest::Funding { currency } => {
            event.symbol = Some(funding_symbol(currency));
        }
        SubscriptionRequest::Candles { symbol, timeframe } => {
            event.key = Some(format!(
                "trade:{}:{}",
                timeframe.as_str(),
                wire_symbol(symbol)
            ));
        }
        SubscriptionRequest::OrderBook { symbol, precision } => {
            event.symbol = Some(wire_symbol(symbol));
            event.prec = Some(precision.as_str());
        }
        SubscriptionRequest::RawOrderBook { symbol, length } => {
            event.symbol = Some(wire_symbol(symbol));
            event.prec = Some("R0");
            event.len = Some(length.as_str());
        }
        SubscriptionRequest::Status { key } => {
            event.key = Some(key.clone());
        }
    }

    serde_json::to_string(&event)
}

/// Encode a ping event.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn encode_ping(cid: u64) -> Result<String, serde_json::Error> {
    serde_json::to_string(&PingEvent { event: "ping", cid })
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::subscription::{BookLength, Precision, Timeframe};

    #[test_case("BTC/USD", "tBTCUSD" ; "pair with slash")]
    #[test_case("NEC/ETH", "tNECETH" ; "altcoin pair")]
    #[test_case("tBTCUSD", "tBTCUSD" ; "already prefixed trading")]
    #[test_case("fUSD", "fUSD" ; "already prefixed funding")]
    #[test_case("BTCUSD", "tBTCUSD" ; "compact pair")]
    fn wire_symbol_normalization(input: &str, expected: &str) {
        assert_eq!(wire_symbol(input), expected);
    }

    #[test]
    fn funding_symbol_prefixes_currency() {
        assert_eq!(funding_symbol("USD"), "fUSD");
        assert_eq!(funding_symbol("fBTC"), "fBTC");
    }

    #[test]
    fn ticker_subscribe_json() {
        let json = encode_subscribe(&SubscriptionRequest::ticker("BTC/USD")).unwrap();
        assert_eq!(
            json,
            r#"{"event":"subscribe","channel":"ticker","symbol":"tBTCUSD"}"#
        );
    }

    #[test]
    fn funding_uses_trades_channel_with_funding_symbol() {
        let json = encode_subscribe(&SubscriptionRequest::funding("USD")).unwrap();
        assert_eq!(
            json,
            r#"{"event":"subscribe","channel":"trades","symbol":"fUSD"}"#
        );
    }

    #[test]
    fn candles_subscribe_uses_key() {
        let json =
            encode_subscribe(&SubscriptionRequest::candles("BTC/USD", Timeframe::OneMinute))
                .unwrap();
        assert_eq!(
            json,
            r#"{"event":"subscribe","channel":"candles","key":"trade:1m:tBTCUSD"}"#
        );
    }

    #[test]
    fn book_subscribe_carries_precision() {
        let json =
            encode_subscribe(&SubscriptionRequest::order_book("BTC/USD", Precision::P3)).unwrap();
        assert_eq!(
            json,
            r#"{"event":"subscribe","channel":"book","symbol":"tBTCUSD","prec":"P3"}"#
        );
    }

    #[test]
    fn raw_book_subscribe_uses_r0_and_length() {
        let json = encode_subscribe(&SubscriptionRequest::raw_order_book(
            "BTCUSD",
            BookLength::OneHundred,
        ))
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"subscribe","channel":"book","symbol":"tBTCUSD","prec":"R0","len":"100"}"#
        );
    }

    #[test]
    fn status_subscribe_uses_raw_key() {
        let json = encode_subscribe(&SubscriptionRequest::status("deriv:tBTCF0:USTF0")).unwrap();
        assert_eq!(
            json,
            r#"{"event":"subscribe","channel":"status","key":"deriv:tBTCF0:USTF0"}"#
        );
    }

    #[test]
    fn ping_json() {
        let json = encode_ping(123_456).unwrap();
        assert_eq!(json, r#"{"event":"ping","cid":123456}"#);
    }
}
