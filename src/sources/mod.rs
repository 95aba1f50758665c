//! Frame source implementations

pub mod channel;
pub mod websocket;

pub use channel::{ChannelPeer, ChannelSource};
pub use websocket::WebSocketSource;
