//! Data model: closed enums, requests, callbacks and the event envelope.

mod account;
mod enums;
mod events;
mod instrument;
mod order;

pub use account::{AccountFunds, AccountSnapshot, PositionRecord};
pub use enums::{
    Direction, Offset, OrderStatus, PriceKind, PriceType, TimeCondition, TradeAction,
    VolumeCondition,
};
pub use events::{
    CancelRejection, ExchangeError, GatewayEvent, OrderEvent, OrderRejection, TradeEvent,
};
pub use instrument::InstrumentRecord;
pub use order::{CancelIntent, CancelRequest, Credentials, OrderIntent, OrderRequest, SessionStamp};
