// pulse-api: Async wire client for the Barco Pulse JSON-RPC control protocol

pub mod codec;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod transport;
pub mod wol;

pub use codec::{Envelope, RpcError};
pub use error::Error;
pub use listener::{ListenerEvent, ListenerHandle};
pub use transport::TransportConfig;
pub use wol::MacAddress;
