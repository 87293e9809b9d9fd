//! Market data access: historical candles over REST and the live
//! WebSocket feed.

mod feed;
mod rest;

pub use feed::{FeedSettings, UpstoxFeed};
pub use rest::UpstoxMarketData;
