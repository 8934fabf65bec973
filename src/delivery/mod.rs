//! Resilient delivery of encoded records to a Fluentd-compatible collector.
//!
//! [`DeliveryClient`] encodes each record on the producer's thread, reserves
//! its size against a fixed byte budget and queues it for a single worker
//! thread. The worker owns the TCP connection exclusively, writes frames in
//! FIFO order and, when a write or connect fails, waits according to a
//! [`Reconnector`](crate::Reconnector) before trying again. Waits are
//! interrupted by [`DeliveryClient::close`].

mod buffer;
mod client;
mod codec;
mod config;
mod state;
mod transport;
mod worker;


pub use buffer::ByteBudget;
pub(crate) use client::FlushHandle;
pub use client::{DeliveryClient, SendError};
pub use codec::{effective_tag, encode_entry};
pub use config::{DEFAULT_HOST, DEFAULT_PORT, DeliveryConfig};
pub use state::ConnectionState;
