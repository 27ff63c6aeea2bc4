//! Byte-level transport abstraction.
//!
//! The session layer talks to devices through the [`Transport`] trait: send a
//! line, read until a pattern appears, close. [`SshTransport`] is the real
//! implementation; tests drive the engine with a scripted in-memory transport
//! instead, so every recovery path can be exercised without a device.
//!
//! [`Connector`] is the factory seam. Reconnection needs to be able to build
//! a brand-new transport mid-task (the old one's channel state is garbage
//! after a drop), so the session holds a connector rather than a one-shot
//! connection.

mod buffer;
pub mod ssh;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;
use std::time::Duration;

use regex::bytes::Regex;

pub use buffer::PatternBuffer;
pub use ssh::{SshConnector, SshTransport};

use crate::descriptor::DeviceDescriptor;
use crate::error::Result;

/// A bidirectional byte stream to one device.
pub trait Transport: Send {
    /// Send `line` followed by a newline.
    fn send_line(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Accumulate output until `pattern` matches near the end of the stream,
    /// returning everything read. Fails with a timeout error if the pattern
    /// does not appear within `timeout`.
    fn read_until(
        &mut self,
        pattern: &Regex,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Close the transport. Closing an already-dead transport is fine.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the transport believes it is still connected. A `true` here is
    /// optimistic; only a read proves liveness.
    fn is_connected(&self) -> bool;
}

/// Factory for transports, so sessions can reconnect on their own.
pub trait Connector: Send + Sync {
    type Transport: Transport;

    /// Establish a fresh transport to the described device.
    fn connect(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;
}
