pub mod client;
pub mod connection;
pub mod protocol;
pub mod router;

pub use client::{SutEvent, WsChannel, WsConnector};
pub use connection::{
    Channel, ChannelState, ConnectionManager, Connector, LinkHealth, LivenessPolicy, Tick,
};
pub use protocol::{Command, InboundFrame, StateUpdate};
pub use router::{FrameSink, route};
