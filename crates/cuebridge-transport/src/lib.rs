//! cuebridge Transport Layer
//!
//! This crate provides the byte-level plumbing stream modules are built on:
//! - Framers that segment a byte stream into messages (raw, separator, SLIP)
//! - Framed TCP client/server connections
//! - UDP datagram sockets

pub mod error;
pub mod framing;
pub mod traits;

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(feature = "udp")]
pub mod udp;

pub use error::{Result, TransportError};
pub use framing::{
    ByteSeparatorFramer, Framer, FramingMethod, RawFramer, SharedFramer, SlipFramer,
    DEFAULT_MAX_MESSAGE_SIZE,
};
pub use traits::{TransportEvent, TransportReceiver, TransportSender};

#[cfg(feature = "tcp")]
pub use tcp::{TcpConfig, TcpReceiver, TcpSender, TcpServer, TcpTransport};

#[cfg(feature = "udp")]
pub use udp::{UdpConfig, UdpReceiver, UdpTransport};
