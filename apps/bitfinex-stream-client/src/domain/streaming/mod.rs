//! Decoded Stream Message Types
//!
//! Canonical internal representation of every message kind the Bitfinex
//! v2 stream can deliver, as one tagged union ([`StreamMessage`]).
//!
//! The decoder (infrastructure layer) is the only producer: it resolves
//! channel ids and payload shapes so that every frame carries exactly
//! one unambiguous tag. The router dispatches on that tag and never
//! re-derives it. Forward-incompatible frames arrive as
//! [`StreamMessage::Unknown`] rather than failing.
//!
//! # Wire references
//!
//! - Event frames are JSON objects with an `"event"` field
//!   (`info`, `subscribed`, `conf`, `pong`, `error`).
//! - Channel frames are JSON arrays `[CHAN_ID, ...]`, including
//!   heartbeats `[CHAN_ID, "hb"]` and checksums `[CHAN_ID, "cs", n]`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Control Messages
// =============================================================================

/// Protocol info event, sent by the server on connect and when it
/// requests the client to renegotiate its subscriptions.
///
/// # Wire Format
/// ```json
/// {"event":"info","version":2,"serverId":"...","platform":{"status":1}}
/// {"event":"info","code":20051,"msg":"Stopping. Please try to reconnect"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolInfoMessage {
    /// Protocol version (present on the connect handshake).
    #[serde(default)]
    pub version: Option<u32>,
    /// Server instance identifier.
    #[serde(default, rename = "serverId")]
    pub server_id: Option<String>,
    /// Info code (20051 restart, 20060 maintenance start, 20061 end).
    #[serde(default)]
    pub code: Option<i64>,
    /// Human-readable message accompanying a code.
    #[serde(default)]
    pub msg: Option<String>,
}

/// Configuration acknowledgment (`conf` event).
///
/// # Wire Format
/// ```json
/// {"event":"conf","status":"OK","flags":65536}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAckMessage {
    /// "OK" or an error status.
    pub status: String,
    /// Echoed configuration flags.
    #[serde(default)]
    pub flags: Option<u64>,
}

/// Pong reply to a client ping.
///
/// # Wire Format
/// ```json
/// {"event":"pong","cid":123456,"ts":1573504000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongMessage {
    /// Correlation id echoed from the ping.
    #[serde(default)]
    pub cid: Option<u64>,
    /// Server timestamp of the pong, epoch milliseconds.
    #[serde(default)]
    pub ts: Option<i64>,
}

/// Subscription acknowledgment (`subscribed` event).
///
/// # Wire Format
/// ```json
/// {"event":"subscribed","channel":"ticker","chanId":17,"symbol":"tBTCUSD"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeAckMessage {
    /// Channel name ("ticker", "trades", "candles", "book", "status").
    pub channel: String,
    /// Server-assigned channel id used in subsequent data frames.
    #[serde(rename = "chanId")]
    pub chan_id: u64,
    /// Subscribed symbol, where applicable.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Subscribed key (candles, status), where applicable.
    #[serde(default)]
    pub key: Option<String>,
    /// Book precision tier, where applicable.
    #[serde(default)]
    pub prec: Option<String>,
}

/// Error event from the server.
///
/// # Wire Format
/// ```json
/// {"event":"error","msg":"symbol: invalid","code":10300}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerErrorMessage {
    /// Error code.
    #[serde(default)]
    pub code: Option<i64>,
    /// Error description.
    pub msg: String,
}

/// Channel heartbeat (`[CHAN_ID, "hb"]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatMessage {
    /// Channel id the heartbeat belongs to.
    pub chan_id: u64,
}

// =============================================================================
// Market Data Messages
// =============================================================================

/// Ticker update for a trading pair.
///
/// # Wire Format
/// ```json
/// [CHAN_ID, [BID, BID_SIZE, ASK, ASK_SIZE, DAILY_CHANGE, DAILY_CHANGE_REL,
///            LAST_PRICE, VOLUME, HIGH, LOW]]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerMessage {
    /// Trading pair the ticker belongs to.
    pub symbol: String,
    /// Best bid price.
    pub bid: Decimal,
    /// Sum of the 25 highest bid sizes.
    pub bid_size: Decimal,
    /// Best ask price.
    pub ask: Decimal,
    /// Sum of the 25 lowest ask sizes.
    pub ask_size: Decimal,
    /// Amount the last price has changed since yesterday.
    pub daily_change: Decimal,
    /// Relative daily change.
    pub daily_change_relative: Decimal,
    /// Price of the last trade.
    pub last_price: Decimal,
    /// Daily volume.
    pub volume: Decimal,
    /// Daily high.
    pub high: Decimal,
    /// Daily low.
    pub low: Decimal,
}

/// One executed trade.
///
/// # Wire Format
/// ```json
/// [ID, MTS, AMOUNT, PRICE]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMessage {
    /// Trade id.
    pub id: i64,
    /// Execution time.
    pub executed_at: DateTime<Utc>,
    /// Amount; positive for buy, negative for sell.
    pub amount: Decimal,
    /// Execution price.
    pub price: Decimal,
}

/// Whether a single trade frame was an execution or an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeUpdateKind {
    /// `te` frame, sent as soon as the trade executes.
    Executed,
    /// `tu` frame, sent once the trade id is final.
    Updated,
}

/// Snapshot of recent trades, sent right after subscribing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeBatchMessage {
    /// Trading pair the snapshot belongs to.
    pub symbol: String,
    /// Trades, most recent first as delivered by the server.
    pub trades: Vec<TradeMessage>,
}

/// A single live trade update (`te`/`tu` frame).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeUpdateMessage {
    /// Trading pair the trade belongs to.
    pub symbol: String,
    /// Execution vs. final update.
    pub kind: TradeUpdateKind,
    /// The trade itself.
    pub trade: TradeMessage,
}

/// One funding trade.
///
/// # Wire Format
/// ```json
/// [ID, MTS, AMOUNT, RATE, PERIOD]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingTradeMessage {
    /// Funding trade id.
    pub id: i64,
    /// Execution time.
    pub executed_at: DateTime<Utc>,
    /// Funding amount.
    pub amount: Decimal,
    /// Funding rate.
    pub rate: Decimal,
    /// Funding period in days.
    pub period: i64,
}

/// Funding trades for a currency (snapshot or a single live update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingBatchMessage {
    /// Funding symbol, e.g. "fUSD".
    pub symbol: String,
    /// Funding trades.
    pub trades: Vec<FundingTradeMessage>,
}

/// One OHLCV candle.
///
/// # Wire Format
/// ```json
/// [MTS, OPEN, CLOSE, HIGH, LOW, VOLUME]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleMessage {
    /// Start of the candle period.
    pub opened_at: DateTime<Utc>,
    /// Open price.
    pub open: Decimal,
    /// Close price.
    pub close: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Volume.
    pub volume: Decimal,
}

/// Candles for a subscription key (snapshot or a single live update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleBatchMessage {
    /// Subscription key, e.g. "trade:1m:tBTCUSD".
    pub key: String,
    /// Candles, newest first in snapshots.
    pub candles: Vec<CandleMessage>,
}

/// One aggregated order book level.
///
/// # Wire Format
/// ```json
/// [PRICE, COUNT, AMOUNT]            // trading books
/// [RATE, PERIOD, COUNT, AMOUNT]     // funding books
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevelMessage {
    /// Price (trading) or rate (funding).
    pub price: Decimal,
    /// Number of orders at this level; 0 removes the level.
    pub count: i64,
    /// Total amount at this level; sign encodes side.
    pub amount: Decimal,
    /// Funding period in days; only set for funding books.
    pub period: Option<i64>,
}

/// Aggregated order book frame (snapshot or incremental update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMessage {
    /// Symbol the book belongs to.
    pub symbol: String,
    /// Levels; more than one only in snapshots.
    pub levels: Vec<BookLevelMessage>,
    /// True for the post-subscribe snapshot.
    pub snapshot: bool,
}

/// One raw (per-order) book level.
///
/// # Wire Format
/// ```json
/// [ORDER_ID, PRICE, AMOUNT]             // trading books
/// [OFFER_ID, PERIOD, RATE, AMOUNT]      // funding books
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBookLevelMessage {
    /// Order (or funding offer) id; price 0 removes the order.
    pub order_id: i64,
    /// Order price (trading) or rate (funding).
    pub price: Decimal,
    /// Order amount; sign encodes side.
    pub amount: Decimal,
    /// Funding period in days; only set for funding books.
    pub period: Option<i64>,
}

/// Raw order book frame (snapshot or incremental update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBookMessage {
    /// Symbol the book belongs to.
    pub symbol: String,
    /// Levels; more than one only in snapshots.
    pub levels: Vec<RawBookLevelMessage>,
    /// True for the post-subscribe snapshot.
    pub snapshot: bool,
}

/// Order book checksum notice (`[CHAN_ID, "cs", CHECKSUM]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumMessage {
    /// Symbol the checksum belongs to.
    pub symbol: String,
    /// CRC-32 of the top 25 book levels, as a signed integer.
    pub checksum: i64,
}

/// Status channel frame (liquidations, derivatives status).
///
/// The payload shape varies per status key, so it is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Status key, e.g. "liq:global".
    pub key: String,
    /// Raw status payload.
    pub payload: serde_json::Value,
}

/// Wallet update from the authenticated channel (`ws`/`wu` frames).
///
/// # Wire Format
/// ```json
/// [0, "wu", [WALLET_TYPE, CURRENCY, BALANCE, UNSETTLED_INTEREST, AVAILABLE]]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMessage {
    /// Wallet type: "exchange", "margin" or "funding".
    pub wallet_type: String,
    /// Currency, e.g. "BTC".
    pub currency: String,
    /// Wallet balance.
    pub balance: Decimal,
    /// Unsettled interest.
    pub unsettled_interest: Decimal,
    /// Available balance, when the server reports it.
    pub balance_available: Option<Decimal>,
}

// =============================================================================
// The Tagged Union
// =============================================================================

/// Every message kind the decoder can produce, one tag per kind.
///
/// Ephemeral: one value per decoded frame, consumed by a single
/// dispatch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamMessage {
    /// Ticker update.
    Ticker(TickerMessage),
    /// Trades snapshot.
    Trades(TradeBatchMessage),
    /// Single live trade (`te`/`tu`).
    Trade(TradeUpdateMessage),
    /// Funding trades (snapshot or single update).
    Funding(FundingBatchMessage),
    /// Candles (snapshot or single update).
    Candles(CandleBatchMessage),
    /// Aggregated order book frame.
    Book(BookMessage),
    /// Raw order book frame.
    RawBook(RawBookMessage),
    /// Book checksum notice.
    Checksum(ChecksumMessage),
    /// Status channel frame.
    Status(StatusMessage),
    /// Wallet update.
    Wallet(WalletMessage),
    /// Configuration acknowledgment.
    ConfigAck(ConfigAckMessage),
    /// Pong reply.
    Pong(PongMessage),
    /// Protocol info / renegotiation request.
    Info(ProtocolInfoMessage),
    /// Subscription acknowledgment.
    SubscribeAck(SubscribeAckMessage),
    /// Channel heartbeat.
    Heartbeat(HeartbeatMessage),
    /// Server error event.
    ServerError(ServerErrorMessage),
    /// Anything the decoder does not recognize; raw payload retained.
    Unknown(serde_json::Value),
}

impl StreamMessage {
    /// Stable tag name, used in logs.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Ticker(_) => "ticker",
            Self::Trades(_) => "trades",
            Self::Trade(_) => "trade",
            Self::Funding(_) => "funding",
            Self::Candles(_) => "candles",
            Self::Book(_) => "book",
            Self::RawBook(_) => "raw_book",
            Self::Checksum(_) => "checksum",
            Self::Status(_) => "status",
            Self::Wallet(_) => "wallet",
            Self::ConfigAck(_) => "config_ack",
            Self::Pong(_) => "pong",
            Self::Info(_) => "info",
            Self::SubscribeAck(_) => "subscribe_ack",
            Self::Heartbeat(_) => "heartbeat",
            Self::ServerError(_) => "server_error",
            Self::Unknown(_) => "unknown",
        }
    }
}
