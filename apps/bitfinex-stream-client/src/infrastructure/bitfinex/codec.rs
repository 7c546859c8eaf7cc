//! Stream Frame Decoder
//!
//! Turns raw Bitfinex v2 text frames into [`StreamMessage`] values.
//!
//! The decoder is stateful: `subscribed` acks bind server-assigned
//! channel ids to a channel kind and key, and subsequent array frames
//! are resolved through that map. One decoder instance lives per
//! connection, so the map can never carry ids from a previous session.
//!
//! Frames the decoder cannot resolve (unknown events, ids with no
//! binding) come back as [`StreamMessage::Unknown`] so the caller can
//! log and move on; only non-JSON input is an error.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::streaming::{
    BookLevelMessage, BookMessage, CandleBatchMessage, CandleMessage, ChecksumMessage,
    FundingBatchMessage, FundingTradeMessage, HeartbeatMessage, RawBookLevelMessage,
    RawBookMessage, StatusMessage, StreamMessage, SubscribeAckMessage, TickerMessage,
    TradeBatchMessage, TradeMessage, TradeUpdateKind, TradeUpdateMessage, WalletMessage,
};

/// Decoding failures. Malformed but valid-JSON frames are not errors;
/// they decode to [`StreamMessage::Unknown`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame is not valid JSON at all.
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A payload element did not have the documented shape.
    #[error("malformed {context} payload")]
    Malformed {
        /// Which payload kind failed to parse.
        context: &'static str,
    },

    /// An epoch-millisecond timestamp outside the representable range.
    #[error("timestamp out of range: {0}")]
    Timestamp(i64),
}

/// What kind of data frames a bound channel id carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelKind {
    Ticker,
    Trades,
    FundingTrades,
    Candles,
    Book,
    RawBook,
    Status,
}

/// Resolved identity of one server-assigned channel id.
#[derive(Debug, Clone)]
struct ChannelBinding {
    kind: ChannelKind,
    /// Symbol for symbol channels, subscription key for candles/status.
    key: String,
}

/// Stateful per-connection decoder.
#[derive(Debug, Default)]
pub struct StreamCodec {
    channels: HashMap<u64, ChannelBinding>,
}

impl StreamCodec {
    /// Fresh decoder with no channel bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one text frame into zero or more messages.
    ///
    /// Almost every frame yields exactly one message; wallet snapshots
    /// yield one [`StreamMessage::Wallet`] per wallet.
    ///
    /// # Errors
    ///
    /// Returns an error for non-JSON input or for a bound channel whose
    /// payload does not match its documented shape.
    pub fn decode(&mut self, text: &str) -> Result<Vec<StreamMessage>, CodecError> {
        let value: Value = serde_json::from_str(text)?;
        match value {
            Value::Object(_) => Ok(vec![self.decode_event(value)?]),
            Value::Array(frame) => self.decode_channel_frame(frame),
            other => Ok(vec![StreamMessage::Unknown(other)]),
        }
    }

    // =========================================================================
    // Event Frames
    // =========================================================================

    fn decode_event(&mut self, value: Value) -> Result<StreamMessage, CodecError> {
        let event = value
            .get("event")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let message = match event.as_deref() {
            Some("info") => StreamMessage::Info(serde_json::from_value(value)?),
            Some("subscribed") => {
                let ack: SubscribeAckMessage = serde_json::from_value(value)?;
                self.bind_channel(&ack);
                StreamMessage::SubscribeAck(ack)
            }
            Some("conf") => StreamMessage::ConfigAck(serde_json::from_value(value)?),
            Some("pong") => StreamMessage::Pong(serde_json::from_value(value)?),
            Some("error") => StreamMessage::ServerError(serde_json::from_value(value)?),
            _ => StreamMessage::Unknown(value),
        };
        Ok(message)
    }

    fn bind_channel(&mut self, ack: &SubscribeAckMessage) {
        let kind = match ack.channel.as_str() {
            "ticker" => ChannelKind::Ticker,
            "trades" => {
                if ack.symbol.as_deref().is_some_and(|s| s.starts_with('f')) {
                    ChannelKind::FundingTrades
                } else {
                    ChannelKind::Trades
                }
            }
            "candles" => ChannelKind::Candles,
            "book" => {
                if ack.prec.as_deref() == Some("R0") {
                    ChannelKind::RawBook
                } else {
                    ChannelKind::Book
                }
            }
            "status" => ChannelKind::Status,
            other => {
                tracing::warn!(channel = other, chan_id = ack.chan_id, "unrecognized channel in ack");
                return;
            }
        };

        let key = ack
            .key
            .clone()
            .or_else(|| ack.symbol.clone())
            .unwrap_or_default();

        self.channels
            .insert(ack.chan_id, ChannelBinding { kind, key });
    }

    // =========================================================================
    // Channel Frames
    // =========================================================================

    fn decode_channel_frame(&self, frame: Vec<Value>) -> Result<Vec<StreamMessage>, CodecError> {
        let Some(chan_id) = frame.first().and_then(Value::as_u64) else {
            return Ok(vec![StreamMessage::Unknown(Value::Array(frame))]);
        };
        if frame.len() < 2 {
            return Ok(vec![StreamMessage::Unknown(Value::Array(frame))]);
        }

        match &frame[1] {
            Value::String(tag) => {
                let tag = tag.clone();
                self.decode_tagged_frame(chan_id, &tag, frame)
            }
            Value::Array(_) => {
                let Some(binding) = self.channels.get(&chan_id) else {
                    return Ok(vec![StreamMessage::Unknown(Value::Array(frame))]);
                };
                Ok(vec![decode_payload(binding, &frame[1])?])
            }
            _ => Ok(vec![StreamMessage::Unknown(Value::Array(frame))]),
        }
    }

    fn decode_tagged_frame(
        &self,
        chan_id: u64,
        tag: &str,
        frame: Vec<Value>,
    ) -> Result<Vec<StreamMessage>, CodecError> {
        match tag {
            "hb" => Ok(vec![StreamMessage::Heartbeat(HeartbeatMessage { chan_id })]),
            "cs" => {
                let checksum = frame
                    .get(2)
                    .and_then(Value::as_i64)
                    .ok_or(CodecError::Malformed {
                        context: "checksum",
                    })?;
                let symbol = self
                    .channels
                    .get(&chan_id)
                    .map_or_else(|| chan_id.to_string(), |b| b.key.clone());
                Ok(vec![StreamMessage::Checksum(ChecksumMessage {
                    symbol,
                    checksum,
                })])
            }
            "ws" | "wu" if chan_id == 0 => decode_wallets(tag, &frame),
            "te" | "tu" | "fte" | "ftu" => {
                let Some(binding) = self.channels.get(&chan_id) else {
                    return Ok(vec![StreamMessage::Unknown(Value::Array(frame))]);
                };
                let payload = frame.get(2).ok_or(CodecError::Malformed { context: "trade" })?;
                Ok(vec![decode_trade_update(binding, tag, payload)?])
            }
            _ => Ok(vec![StreamMessage::Unknown(Value::Array(frame))]),
        }
    }
}

// =============================================================================
// Payload Decoding
// =============================================================================

fn decode_payload(binding: &ChannelBinding, payload: &Value) -> Result<StreamMessage, CodecError> {
    let snapshot = payload
        .as_array()
        .and_then(|rows| rows.first())
        .is_some_and(Value::is_array);

    match binding.kind {
        ChannelKind::Ticker => Ok(StreamMessage::Ticker(parse_ticker(&binding.key, payload)?)),
        ChannelKind::Trades => {
            let trades = parse_rows(payload, parse_trade, "trades snapshot")?;
            Ok(StreamMessage::Trades(TradeBatchMessage {
                symbol: binding.key.clone(),
                trades,
            }))
        }
        ChannelKind::FundingTrades => {
            let trades = parse_rows(payload, parse_funding_trade, "funding snapshot")?;
            Ok(StreamMessage::Funding(FundingBatchMessage {
                symbol: binding.key.clone(),
                trades,
            }))
        }
        ChannelKind::Candles => {
            let candles = if snapshot {
                parse_rows(payload, parse_candle, "candles snapshot")?
            } else {
                vec![parse_candle(payload)?]
            };
            Ok(StreamMessage::Candles(CandleBatchMessage {
                key: binding.key.clone(),
                candles,
            }))
        }
        ChannelKind::Book => {
            let levels = if snapshot {
                parse_rows(payload, parse_book_level, "book snapshot")?
            } else {
                vec![parse_book_level(payload)?]
            };
            Ok(StreamMessage::Book(BookMessage {
                symbol: binding.key.clone(),
                levels,
                snapshot,
            }))
        }
        ChannelKind::RawBook => {
            let levels = if snapshot {
                parse_rows(payload, parse_raw_book_level, "raw book snapshot")?
            } else {
                vec![parse_raw_book_level(payload)?]
            };
            Ok(StreamMessage::RawBook(RawBookMessage {
                symbol: binding.key.clone(),
                levels,
                snapshot,
            }))
        }
        ChannelKind::Status => Ok(StreamMessage::Status(StatusMessage {
            key: binding.key.clone(),
            payload: payload.clone(),
        })),
    }
}

fn decode_trade_update(
    binding: &ChannelBinding,
    tag: &str,
    payload: &Value,
) -> Result<StreamMessage, CodecError> {
    if binding.kind == ChannelKind::FundingTrades {
        return Ok(StreamMessage::Funding(FundingBatchMessage {
            symbol: binding.key.clone(),
            trades: vec![parse_funding_trade(payload)?],
        }));
    }

    let kind = if tag.ends_with('e') {
        TradeUpdateKind::Executed
    } else {
        TradeUpdateKind::Updated
    };

    Ok(StreamMessage::Trade(TradeUpdateMessage {
        symbol: binding.key.clone(),
        kind,
        trade: parse_trade(payload)?,
    }))
}

fn decode_wallets(tag: &str, frame: &[Value]) -> Result<Vec<StreamMessage>, CodecError> {
    let payload = frame.get(2).ok_or(CodecError::Malformed { context: "wallet" })?;

    if tag == "ws" {
        let rows = payload
            .as_array()
            .ok_or(CodecError::Malformed { context: "wallet" })?;
        rows.iter()
            .map(|row| Ok(StreamMessage::Wallet(parse_wallet(row)?)))
            .collect()
    } else {
        Ok(vec![StreamMessage::Wallet(parse_wallet(payload)?)])
    }
}

// =============================================================================
// Row Parsers
// =============================================================================

fn parse_rows<T>(
    payload: &Value,
    parse: impl Fn(&Value) -> Result<T, CodecError>,
    context: &'static str,
) -> Result<Vec<T>, CodecError> {
    // A flat row (first element not an array) is a single update.
    let rows = payload
        .as_array()
        .ok_or(CodecError::Malformed { context })?;
    if rows.first().is_some_and(Value::is_array) {
        rows.iter().map(parse).collect()
    } else {
        Ok(vec![parse(payload)?])
    }
}

fn timestamp(mts: i64) -> Result<DateTime<Utc>, CodecError> {
    DateTime::from_timestamp_millis(mts).ok_or(CodecError::Timestamp(mts))
}

fn decimal_at(row: &[Value], index: usize, context: &'static str) -> Result<Decimal, CodecError> {
    let value = row.get(index).ok_or(CodecError::Malformed { context })?;
    serde_json::from_value(value.clone()).map_err(|_| CodecError::Malformed { context })
}

fn int_at(row: &[Value], index: usize, context: &'static str) -> Result<i64, CodecError> {
    row.get(index)
        .and_then(Value::as_i64)
        .ok_or(CodecError::Malformed { context })
}

fn parse_ticker(symbol: &str, payload: &Value) -> Result<TickerMessage, CodecError> {
    const CONTEXT: &str = "ticker";
    let row = payload
        .as_array()
        .ok_or(CodecError::Malformed { context: CONTEXT })?;
    Ok(TickerMessage {
        symbol: symbol.to_string(),
        bid: decimal_at(row, 0, CONTEXT)?,
        bid_size: decimal_at(row, 1, CONTEXT)?,
        ask: decimal_at(row, 2, CONTEXT)?,
        ask_size: decimal_at(row, 3, CONTEXT)?,
        daily_change: decimal_at(row, 4, CONTEXT)?,
        daily_change_relative: decimal_at(row, 5, CONTEXT)?,
        last_price: decimal_at(row, 6, CONTEXT)?,
        volume: decimal_at(row, 7, CONTEXT)?,
        high: decimal_at(row, 8, CONTEXT)?,
        low: decimal_at(row, 9, CONTEXT)?,
    })
}

fn parse_trade(payload: &Value) -> Result<TradeMessage, CodecError> {
    const CONTEXT: &str = "trade";
    let row = payload
        .as_array()
        .ok_or(CodecError::Malformed { context: CONTEXT })?;
    Ok(TradeMessage {
        id: int_at(row, 0, CONTEXT)?,
        executed_at: timestamp(int_at(row, 1, CONTEXT)?)?,
        amount: decimal_at(row, 2, CONTEXT)?,
        price: decimal_at(row, 3, CONTEXT)?,
    })
}

fn parse_funding_trade(payload: &Value) -> Result<FundingTradeMessage, CodecError> {
    const CONTEXT: &str = "funding trade";
    let row = payload
        .as_array()
        .ok_or(CodecError::Malformed { context: CONTEXT })?;
    Ok(FundingTradeMessage {
        id: int_at(row, 0, CONTEXT)?,
        executed_at: timestamp(int_at(row, 1, CONTEXT)?)?,
        amount: decimal_at(row, 2, CONTEXT)?,
        rate: decimal_at(row, 3, CONTEXT)?,
        period: int_at(row, 4, CONTEXT)?,
    })
}

fn parse_candle(payload: &Value) -> Result<CandleMessage, CodecError> {
    const CONTEXT: &str = "candle";
    let row = payload
        .as_array()
        .ok_or(CodecError::Malformed { context: CONTEXT })?;
    Ok(CandleMessage {
        opened_at: timestamp(int_at(row, 0, CONTEXT)?)?,
        open: decimal_at(row, 1, CONTEXT)?,
        close: decimal_at(row, 2, CONTEXT)?,
        high: decimal_at(row, 3, CONTEXT)?,
        low: decimal_at(row, 4, CONTEXT)?,
        volume: decimal_at(row, 5, CONTEXT)?,
    })
}

/// Trading level `[PRICE, COUNT, AMOUNT]`, funding level
/// `[RATE, PERIOD, COUNT, AMOUNT]`.
fn parse_book_level(payload: &Value) -> Result<BookLevelMessage, CodecError> {
    const CONTEXT: &str = "book level";
    let row = payload
        .as_array()
        .ok_or(CodecError::Malformed { context: CONTEXT })?;
    match row.len() {
        3 => Ok(BookLevelMessage {
            price: decimal_at(row, 0, CONTEXT)?,
            count: int_at(row, 1, CONTEXT)?,
            amount: decimal_at(row, 2, CONTEXT)?,
            period: None,
        }),
        4 => Ok(BookLevelMessage {
            price: decimal_at(row, 0, CONTEXT)?,
            period: Some(int_at(row, 1, CONTEXT)?),
            count: int_at(row, 2, CONTEXT)?,
            amount: decimal_at(row, 3, CONTEXT)?,
        }),
        _ => Err(CodecError::Malformed { context: CONTEXT }),
    }
}

/// Trading order `[ORDER_ID, PRICE, AMOUNT]`, funding offer
/// `[OFFER_ID, PERIOD, RATE, AMOUNT]`.
fn parse_raw_book_level(payload: &Value) -> Result<RawBookLevelMessage, CodecError> {
    const CONTEXT: &str = "raw book level";
    let row = payload
        .as_array()
        .ok_or(CodecError::Malformed { context: CONTEXT })?;
    match row.len() {
        3 => Ok(RawBookLevelMessage {
            order_id: int_at(row, 0, CONTEXT)?,
            price: decimal_at(row, 1, CONTEXT)?,
            amount: decimal_at(row, 2, CONTEXT)?,
            period: None,
        }),
        4 => Ok(RawBookLevelMessage {
            order_id: int_at(row, 0, CONTEXT)?,
            period: Some(int_at(row, 1, CONTEXT)?),
            price: decimal_at(row, 2, CONTEXT)?,
            amount: decimal_at(row, 3, CONTEXT)?,
        }),
        _ => Err(CodecError::Malformed { context: CONTEXT }),
    }
}

fn parse_wallet(payload: &Value) -> Result<WalletMessage, CodecError> {
    const CONTEXT: &str = "wallet";
    let row = payload
        .as_array()
        .ok_or(CodecError::Malformed { context: CONTEXT })?;
    let wallet_type = row
        .first()
        .and_then(Value::as_str)
        .ok_or(CodecError::Malformed { context: CONTEXT })?
        .to_string();
    let currency = row
        .get(1)
        .and_then(Value::as_str)
        .ok_or(CodecError::Malformed { context: CONTEXT })?
        .to_string();
    let balance_available = match row.get(4) {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            serde_json::from_value(value.clone())
                .map_err(|_| CodecError::Malformed { context: CONTEXT })?,
        ),
    };
    Ok(WalletMessage {
        wallet_type,
        currency,
        balance: decimal_at(row, 2, CONTEXT)?,
        unsettled_interest: decimal_at(row, 3, CONTEXT)?,
        balance_available,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn one(codec: &mut StreamCodec, text: &str) -> StreamMessage {
        let mut messages = codec.decode(text).unwrap();
        assert_eq!(messages.len(), 1, "expected a single message");
        messages.remove(0)
    }

    fn subscribe_ticker(codec: &mut StreamCodec, chan_id: u64, symbol: &str) {
        one(
            codec,
            &format!(
                r#"{{"event":"subscribed","channel":"ticker","chanId":{chan_id},"symbol":"{symbol}"}}"#
            ),
        );
    }

    #[test]
    fn info_handshake_decodes() {
        let mut codec = StreamCodec::new();
        let message = one(
            &mut codec,
            r#"{"event":"info","version":2,"serverId":"df5c9e5e"}"#,
        );
        let StreamMessage::Info(info) = message else {
            panic!("expected info, got {message:?}");
        };
        assert_eq!(info.version, Some(2));
    }

    #[test]
    fn restart_info_decodes_with_code() {
        let mut codec = StreamCodec::new();
        let message = one(
            &mut codec,
            r#"{"event":"info","code":20051,"msg":"Stopping. Please try to reconnect"}"#,
        );
        let StreamMessage::Info(info) = message else {
            panic!("expected info");
        };
        assert_eq!(info.code, Some(20051));
    }

    #[test]
    fn subscribe_ack_binds_channel_for_data_frames() {
        let mut codec = StreamCodec::new();
        subscribe_ticker(&mut codec, 17, "tBTCUSD");

        let message = one(
            &mut codec,
            "[17,[50000.5,10.2,50001.0,8.7,120.0,0.0024,50000.8,3300.1,50400.0,49100.0]]",
        );
        let StreamMessage::Ticker(ticker) = message else {
            panic!("expected ticker, got {message:?}");
        };
        assert_eq!(ticker.symbol, "tBTCUSD");
        assert_eq!(ticker.last_price, Decimal::new(500_008, 1));
    }

    #[test]
    fn data_frame_without_binding_is_unknown() {
        let mut codec = StreamCodec::new();
        let message = one(&mut codec, "[99,[1.0,2.0,3.0]]");
        assert!(matches!(message, StreamMessage::Unknown(_)));
    }

    #[test]
    fn heartbeat_needs_no_binding() {
        let mut codec = StreamCodec::new();
        let message = one(&mut codec, r#"[42,"hb"]"#);
        assert_eq!(
            message,
            StreamMessage::Heartbeat(HeartbeatMessage { chan_id: 42 })
        );
    }

    #[test]
    fn checksum_resolves_symbol_from_binding() {
        let mut codec = StreamCodec::new();
        one(
            &mut codec,
            r#"{"event":"subscribed","channel":"book","chanId":7,"symbol":"tBTCUSD","prec":"P0"}"#,
        );
        let message = one(&mut codec, r#"[7,"cs",-1448741234]"#);
        let StreamMessage::Checksum(cs) = message else {
            panic!("expected checksum");
        };
        assert_eq!(cs.symbol, "tBTCUSD");
        assert_eq!(cs.checksum, -1_448_741_234);
    }

    #[test]
    fn trade_execution_and_update_keep_their_kind() {
        let mut codec = StreamCodec::new();
        one(
            &mut codec,
            r#"{"event":"subscribed","channel":"trades","chanId":5,"symbol":"tBTCUSD"}"#,
        );

        let te = one(&mut codec, r#"[5,"te",[401597395,1574694478808,0.005,7245.3]]"#);
        let StreamMessage::Trade(te) = te else {
            panic!("expected trade");
        };
        assert_eq!(te.kind, TradeUpdateKind::Executed);
        assert_eq!(te.trade.id, 401_597_395);

        let tu = one(&mut codec, r#"[5,"tu",[401597395,1574694478808,0.005,7245.3]]"#);
        let StreamMessage::Trade(tu) = tu else {
            panic!("expected trade");
        };
        assert_eq!(tu.kind, TradeUpdateKind::Updated);
    }

    #[test]
    fn trades_snapshot_decodes_as_batch() {
        let mut codec = StreamCodec::new();
        one(
            &mut codec,
            r#"{"event":"subscribed","channel":"trades","chanId":5,"symbol":"tBTCUSD"}"#,
        );

        let message = one(
            &mut codec,
            r#"[5,[[401597395,1574694478808,0.005,7245.3],[401597394,1574694477000,-0.01,7245.0]]]"#,
        );
        let StreamMessage::Trades(batch) = message else {
            panic!("expected trades batch");
        };
        assert_eq!(batch.symbol, "tBTCUSD");
        assert_eq!(batch.trades.len(), 2);
        assert_eq!(batch.trades[1].amount, Decimal::new(-1, 2));
    }

    #[test]
    fn funding_channel_decodes_five_element_trades() {
        let mut codec = StreamCodec::new();
        one(
            &mut codec,
            r#"{"event":"subscribed","channel":"trades","chanId":9,"symbol":"fUSD"}"#,
        );

        let snapshot = one(
            &mut codec,
            r#"[9,[[133323543,1574694605000,-59.84,0.00023647,2]]]"#,
        );
        let StreamMessage::Funding(batch) = snapshot else {
            panic!("expected funding batch");
        };
        assert_eq!(batch.symbol, "fUSD");
        assert_eq!(batch.trades[0].period, 2);

        let update = one(&mut codec, r#"[9,"fte",[133323543,1574694605000,-59.84,0.00023647,30]]"#);
        let StreamMessage::Funding(batch) = update else {
            panic!("expected funding update");
        };
        assert_eq!(batch.trades.len(), 1);
        assert_eq!(batch.trades[0].period, 30);
    }

    #[test]
    fn candle_snapshot_and_update() {
        let mut codec = StreamCodec::new();
        one(
            &mut codec,
            r#"{"event":"subscribed","channel":"candles","chanId":12,"key":"trade:1m:tBTCUSD"}"#,
        );

        let snapshot = one(
            &mut codec,
            r#"[12,[[1574698260000,7245.9,7246.0,7246.5,7245.7,65.5],[1574698200000,7245.0,7245.9,7246.0,7244.9,12.1]]]"#,
        );
        let StreamMessage::Candles(batch) = snapshot else {
            panic!("expected candle batch");
        };
        assert_eq!(batch.key, "trade:1m:tBTCUSD");
        assert_eq!(batch.candles.len(), 2);

        let update = one(
            &mut codec,
            r#"[12,[1574698260000,7245.9,7246.1,7246.5,7245.7,66.0]]"#,
        );
        let StreamMessage::Candles(batch) = update else {
            panic!("expected candle update");
        };
        assert_eq!(batch.candles.len(), 1);
        assert_eq!(batch.candles[0].volume, Decimal::new(66, 0));
    }

    #[test]
    fn book_snapshot_then_incremental_update() {
        let mut codec = StreamCodec::new();
        one(
            &mut codec,
            r#"{"event":"subscribed","channel":"book","chanId":21,"symbol":"tBTCUSD","prec":"P0"}"#,
        );

        let snapshot = one(
            &mut codec,
            r#"[21,[[7254.7,3,3.3],[7254.6,1,0.4],[7254.8,2,-1.5]]]"#,
        );
        let StreamMessage::Book(book) = snapshot else {
            panic!("expected book");
        };
        assert!(book.snapshot);
        assert_eq!(book.levels.len(), 3);

        let update = one(&mut codec, "[21,[7254.7,2,2.1]]");
        let StreamMessage::Book(book) = update else {
            panic!("expected book update");
        };
        assert!(!book.snapshot);
        assert_eq!(book.levels[0].count, 2);
        assert!(book.levels[0].period.is_none());
    }

    #[test]
    fn funding_book_level_carries_period() {
        let mut codec = StreamCodec::new();
        one(
            &mut codec,
            r#"{"event":"subscribed","channel":"book","chanId":22,"symbol":"fUSD","prec":"P0"}"#,
        );

        let update = one(&mut codec, "[22,[0.000231,30,2,540.2]]");
        let StreamMessage::Book(book) = update else {
            panic!("expected funding book");
        };
        assert_eq!(book.levels[0].period, Some(30));
        assert_eq!(book.levels[0].count, 2);
    }

    #[test]
    fn r0_ack_binds_a_raw_book() {
        let mut codec = StreamCodec::new();
        one(
            &mut codec,
            r#"{"event":"subscribed","channel":"book","chanId":31,"symbol":"tBTCUSD","prec":"R0","len":"100"}"#,
        );

        let snapshot = one(
            &mut codec,
            "[31,[[34006738527,7254.7,0.6],[34006738528,7254.8,-0.5]]]",
        );
        let StreamMessage::RawBook(book) = snapshot else {
            panic!("expected raw book, got {snapshot:?}");
        };
        assert!(book.snapshot);
        assert_eq!(book.levels[0].order_id, 34_006_738_527);

        let removal = one(&mut codec, "[31,[34006738527,0,0.6]]");
        let StreamMessage::RawBook(book) = removal else {
            panic!("expected raw book update");
        };
        assert_eq!(book.levels[0].price, Decimal::ZERO);
    }

    #[test]
    fn status_payload_is_kept_raw() {
        let mut codec = StreamCodec::new();
        one(
            &mut codec,
            r#"{"event":"subscribed","channel":"status","chanId":91,"key":"liq:global"}"#,
        );

        let message = one(
            &mut codec,
            r#"[91,[["pos",145400868,1609144352338,null,"tBTCUSD",0.12173,34618.82]]]"#,
        );
        let StreamMessage::Status(status) = message else {
            panic!("expected status");
        };
        assert_eq!(status.key, "liq:global");
        assert!(status.payload.is_array());
    }

    #[test]
    fn wallet_snapshot_yields_one_message_per_wallet() {
        let mut codec = StreamCodec::new();
        let messages = codec
            .decode(r#"[0,"ws",[["exchange","BTC",1.1,0,null],["margin","USD",2500.0,0,2100.5]]]"#)
            .unwrap();

        assert_eq!(messages.len(), 2);
        let StreamMessage::Wallet(first) = &messages[0] else {
            panic!("expected wallet");
        };
        assert_eq!(first.currency, "BTC");
        assert!(first.balance_available.is_none());

        let StreamMessage::Wallet(second) = &messages[1] else {
            panic!("expected wallet");
        };
        assert_eq!(second.balance_available, Some(Decimal::new(21_005, 1)));
    }

    #[test]
    fn wallet_update_is_single() {
        let mut codec = StreamCodec::new();
        let message = one(&mut codec, r#"[0,"wu",["exchange","ETH",30.5,0,30.5]]"#);
        let StreamMessage::Wallet(wallet) = message else {
            panic!("expected wallet");
        };
        assert_eq!(wallet.wallet_type, "exchange");
    }

    #[test]
    fn unknown_event_is_preserved_not_rejected() {
        let mut codec = StreamCodec::new();
        let message = one(&mut codec, r#"{"event":"unsubscribed","chanId":17,"status":"OK"}"#);
        let StreamMessage::Unknown(raw) = message else {
            panic!("expected unknown");
        };
        assert_eq!(raw["event"], "unsubscribed");
    }

    #[test]
    fn non_json_input_is_an_error() {
        let mut codec = StreamCodec::new();
        assert!(matches!(
            codec.decode("not json at all"),
            Err(CodecError::Json(_))
        ));
    }

    #[test]
    fn fresh_codec_forgets_previous_session_bindings() {
        let mut codec = StreamCodec::new();
        subscribe_ticker(&mut codec, 17, "tBTCUSD");

        let mut next = StreamCodec::new();
        let message = one(&mut next, "[17,[1,1,1,1,1,1,1,1,1,1]]");
        assert!(matches!(message, StreamMessage::Unknown(_)));
    }
}
