use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use bytes::Bytes;
use tracing::trace;

use crate::error::{ChannelError, Result};
use crate::traits::{PacketSink, PacketSource};

/// Create a connected in-process channel pair.
///
/// Packets written to one endpoint's sink arrive, in order and with their
/// boundaries intact, at the other endpoint's source.
pub fn memory_pair(mtu: usize) -> (MemoryEndpoint, MemoryEndpoint) {
    let (left_tx, right_rx) = mpsc::channel();
    let (right_tx, left_rx) = mpsc::channel();

    let left = MemoryEndpoint {
        sink: MemorySink { tx: left_tx, mtu },
        source: MemorySource { rx: left_rx },
    };
    let right = MemoryEndpoint {
        sink: MemorySink { tx: right_tx, mtu },
        source: MemorySource { rx: right_rx },
    };
    (left, right)
}

/// One side of a [`memory_pair`].
#[derive(Debug)]
pub struct MemoryEndpoint {
    pub sink: MemorySink,
    pub source: MemorySource,
}

impl MemoryEndpoint {
    /// Separate the endpoint into its write and notify halves.
    pub fn split(self) -> (MemorySink, MemorySource) {
        (self.sink, self.source)
    }
}

/// Outbound half of an in-process channel.
///
/// Cloning yields another writer into the same direction, which lets tests
/// inject packets at arbitrary times.
#[derive(Debug, Clone)]
pub struct MemorySink {
    tx: Sender<Bytes>,
    mtu: usize,
}

impl PacketSink for MemorySink {
    fn write(&mut self, packet: &[u8]) -> Result<()> {
        if packet.len() > self.mtu {
            return Err(ChannelError::PacketTooLarge {
                size: packet.len(),
                mtu: self.mtu,
            });
        }
        trace!(size = packet.len(), "memory channel write");
        self.tx
            .send(Bytes::copy_from_slice(packet))
            .map_err(|_| ChannelError::Closed)
    }

    fn mtu(&self) -> usize {
        self.mtu
    }
}

/// Inbound half of an in-process channel.
#[derive(Debug)]
pub struct MemorySource {
    rx: Receiver<Bytes>,
}

impl PacketSource for MemorySource {
    fn recv(&mut self, poll: Duration) -> Result<Option<Bytes>> {
        match self.rx.recv_timeout(poll) {
            Ok(packet) => Ok(Some(packet)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelError::Closed),
        }
    }
}
