//! Message Router
//!
//! Single dispatch point from a decoded [`StreamMessage`] to the
//! consumer registered for its tag. Exhaustiveness is enforced at
//! construction: [`Consumers`] has one slot per tag, so adding a new
//! message variant without wiring a consumer fails to compile at the
//! dispatch match.
//!
//! A consumer failure is isolated and logged; it never prevents
//! dispatch of the next message. Dispatch runs on a single task, so
//! per-tag arrival order is preserved.

use crate::domain::streaming::{
    BookMessage, CandleBatchMessage, ChecksumMessage, ConfigAckMessage, FundingBatchMessage,
    HeartbeatMessage, PongMessage, ProtocolInfoMessage, RawBookMessage, ServerErrorMessage,
    StatusMessage, StreamMessage, SubscribeAckMessage, TickerMessage, TradeBatchMessage,
    TradeUpdateMessage, WalletMessage,
};

/// Error returned by a consumer callback.
///
/// Consumers must not panic; a returned error is logged by the router
/// and dispatch continues with the next message.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// The consumer could not serialize the message for its sink.
    #[error("message serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Any other consumer-side failure.
    #[error("consumer failed: {0}")]
    Failed(String),
}

/// Boxed consumer callback for one message payload type.
pub type Consumer<T> = Box<dyn Fn(T) -> Result<(), ConsumerError> + Send + Sync>;

/// One consumer slot per [`StreamMessage`] tag.
///
/// Every field is required at construction, which is what makes the
/// router's coverage checkable before any message flows.
pub struct Consumers {
    /// Ticker updates.
    pub on_ticker: Consumer<TickerMessage>,
    /// Trade snapshots.
    pub on_trades: Consumer<TradeBatchMessage>,
    /// Single live trades.
    pub on_trade: Consumer<TradeUpdateMessage>,
    /// Funding trades.
    pub on_funding: Consumer<FundingBatchMessage>,
    /// Candles.
    pub on_candles: Consumer<CandleBatchMessage>,
    /// Aggregated book frames.
    pub on_book: Consumer<BookMessage>,
    /// Raw book frames.
    pub on_raw_book: Consumer<RawBookMessage>,
    /// Book checksum notices.
    pub on_checksum: Consumer<ChecksumMessage>,
    /// Status channel frames.
    pub on_status: Consumer<StatusMessage>,
    /// Wallet updates.
    pub on_wallet: Consumer<WalletMessage>,
    /// Configuration acknowledgments.
    pub on_config_ack: Consumer<ConfigAckMessage>,
    /// Pong replies.
    pub on_pong: Consumer<PongMessage>,
    /// Protocol info messages.
    pub on_info: Consumer<ProtocolInfoMessage>,
    /// Subscription acknowledgments.
    pub on_subscribe_ack: Consumer<SubscribeAckMessage>,
    /// Channel heartbeats.
    pub on_heartbeat: Consumer<HeartbeatMessage>,
    /// Server error events.
    pub on_server_error: Consumer<ServerErrorMessage>,
    /// Unrecognized frames; must log rather than fail.
    pub on_unknown: Consumer<serde_json::Value>,
}

/// Dispatches each decoded message to exactly one consumer.
pub struct MessageRouter {
    consumers: Consumers,
}

impl MessageRouter {
    /// Create a router over a full consumer set.
    #[must_use]
    pub const fn new(consumers: Consumers) -> Self {
        Self { consumers }
    }

    /// Dispatch one message to the consumer registered for its tag.
    ///
    /// Consumer errors are logged and swallowed; the dispatch loop must
    /// survive any single consumer failure.
    pub fn dispatch(&self, message: StreamMessage) {
        let tag = message.tag();

        let result = match message {
            StreamMessage::Ticker(m) => (self.consumers.on_ticker)(m),
            StreamMessage::Trades(m) => (self.consumers.on_trades)(m),
            StreamMessage::Trade(m) => (self.consumers.on_trade)(m),
            StreamMessage::Funding(m) => (self.consumers.on_funding)(m),
            StreamMessage::Candles(m) => (self.consumers.on_candles)(m),
            StreamMessage::Book(m) => (self.consumers.on_book)(m),
            StreamMessage::RawBook(m) => (self.consumers.on_raw_book)(m),
            StreamMessage::Checksum(m) => (self.consumers.on_checksum)(m),
            StreamMessage::Status(m) => (self.consumers.on_status)(m),
            StreamMessage::Wallet(m) => (self.consumers.on_wallet)(m),
            StreamMessage::ConfigAck(m) => (self.consumers.on_config_ack)(m),
            StreamMessage::Pong(m) => (self.consumers.on_pong)(m),
            StreamMessage::Info(m) => (self.consumers.on_info)(m),
            StreamMessage::SubscribeAck(m) => (self.consumers.on_subscribe_ack)(m),
            StreamMessage::Heartbeat(m) => (self.consumers.on_heartbeat)(m),
            StreamMessage::ServerError(m) => (self.consumers.on_server_error)(m),
            StreamMessage::Unknown(raw) => (self.consumers.on_unknown)(raw),
        };

        if let Err(e) = result {
            tracing::warn!(tag, error = %e, "consumer failed, continuing dispatch");
        }
    }
}
