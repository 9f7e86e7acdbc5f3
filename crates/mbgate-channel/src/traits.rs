use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Default link MTU: a BLE 4.2 ATT payload (23-byte MTU minus 3 header bytes).
pub const DEFAULT_MTU: usize = 20;

/// Outbound half of a packet channel (the write characteristic).
///
/// Every call to [`write`](PacketSink::write) is delivered to the peer as one
/// packet. Implementations must reject packets larger than [`mtu`](PacketSink::mtu)
/// instead of splitting them; splitting is the frame layer's job.
pub trait PacketSink: Send {
    /// Write one packet.
    fn write(&mut self, packet: &[u8]) -> Result<()>;

    /// Largest packet the link accepts in a single write.
    fn mtu(&self) -> usize;
}

/// Inbound half of a packet channel (the notify characteristic).
pub trait PacketSource: Send {
    /// Wait up to `poll` for the next packet.
    ///
    /// Returns `Ok(None)` when nothing arrived within `poll`, and
    /// `Err(ChannelError::Closed)` once the peer is gone.
    fn recv(&mut self, poll: Duration) -> Result<Option<Bytes>>;
}

impl<S: PacketSink + ?Sized> PacketSink for Box<S> {
    fn write(&mut self, packet: &[u8]) -> Result<()> {
        (**self).write(packet)
    }

    fn mtu(&self) -> usize {
        (**self).mtu()
    }
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn recv(&mut self, poll: Duration) -> Result<Option<Bytes>> {
        (**self).recv(poll)
    }
}
