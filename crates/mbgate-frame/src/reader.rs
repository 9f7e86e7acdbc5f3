use std::time::Duration;

use bytes::Bytes;
use mbgate_channel::PacketSource;

use crate::config::FrameProfile;
use crate::error::Result;
use crate::sentinel::SentinelReassembler;
use crate::tagged::TaggedReassembler;

/// Reassembly state for whichever profile an endpoint speaks.
#[derive(Debug)]
pub enum Reassembler {
    Tagged(TaggedReassembler),
    Sentinel(SentinelReassembler),
}

impl Reassembler {
    pub fn for_profile(profile: &FrameProfile) -> Self {
        match profile {
            FrameProfile::Tagged(_) => Reassembler::Tagged(TaggedReassembler::new()),
            FrameProfile::Sentinel(cfg) => Reassembler::Sentinel(SentinelReassembler::new(
                Bytes::copy_from_slice(cfg.terminator.as_bytes()),
            )),
        }
    }

    /// Feed one inbound packet; returns a message once one completes.
    pub fn push(&mut self, packet: &[u8]) -> Option<Bytes> {
        match self {
            Reassembler::Tagged(inner) => inner.push(packet),
            Reassembler::Sentinel(inner) => inner.push(packet),
        }
    }

    /// Discard any partial message.
    pub fn reset(&mut self) {
        match self {
            Reassembler::Tagged(inner) => inner.reset(),
            Reassembler::Sentinel(inner) => inner.reset(),
        }
    }

    pub fn buffered_len(&self) -> usize {
        match self {
            Reassembler::Tagged(inner) => inner.buffered_len(),
            Reassembler::Sentinel(inner) => inner.buffered_len(),
        }
    }
}

/// Reads complete messages from a packet source.
///
/// Partial messages survive across calls; only a completed message or an
/// idle poll interval returns control to the caller.
pub struct MessageReader<S> {
    source: S,
    reassembler: Reassembler,
}

impl<S: PacketSource> MessageReader<S> {
    pub fn new(source: S, profile: &FrameProfile) -> Self {
        Self {
            source,
            reassembler: Reassembler::for_profile(profile),
        }
    }

    /// Wait for the next complete message.
    ///
    /// Returns `Ok(None)` when no packet arrives within `poll`.
    pub fn read_message(&mut self, poll: Duration) -> Result<Option<Bytes>> {
        loop {
            let Some(packet) = self.source.recv(poll)? else {
                return Ok(None);
            };
            if let Some(message) = self.reassembler.push(&packet) {
                return Ok(Some(message));
            }
        }
    }

    /// Discard any partial message.
    pub fn reset(&mut self) {
        self.reassembler.reset();
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use mbgate_channel::{memory_pair, ChannelError, PacketSink};

    use super::*;
    use crate::error::FrameError;
    use crate::writer::FragmentWriter;

    const POLL: Duration = Duration::from_millis(100);

    #[test]
    fn reads_tagged_message_written_in_fragments() {
        let (left, right) = memory_pair(8);
        let profile = FrameProfile::tagged(8);
        let mut writer = FragmentWriter::new(left.sink, profile.clone()).unwrap();
        let mut reader = MessageReader::new(right.source, &profile);

        writer.send(b"a message longer than one packet").unwrap();
        let message = reader.read_message(POLL).unwrap().unwrap();
        assert_eq!(message.as_ref(), b"a message longer than one packet");
    }

    #[test]
    fn reads_sentinel_message() {
        let (left, right) = memory_pair(8);
        let profile = FrameProfile::Sentinel(crate::config::SentinelConfig {
            chunk_size: 4,
            chunk_delay: Duration::ZERO,
            terminator_delay: Duration::ZERO,
            ..Default::default()
        });
        let mut writer = FragmentWriter::new(left.sink, profile.clone()).unwrap();
        let mut reader = MessageReader::new(right.source, &profile);

        writer.send(br#"{"status":"ok"}"#).unwrap();
        let message = reader.read_message(POLL).unwrap().unwrap();
        assert_eq!(message.as_ref(), br#"{"status":"ok"}"#);
    }

    #[test]
    fn idle_poll_keeps_partial_message() {
        let (left, right) = memory_pair(8);
        let profile = FrameProfile::tagged(8);
        let mut sink = left.sink;
        let mut reader = MessageReader::new(right.source, &profile);

        sink.write(&[0x01, b'a', b'b']).unwrap();
        assert!(reader.read_message(Duration::from_millis(10)).unwrap().is_none());

        sink.write(&[0x03, b'c']).unwrap();
        assert_eq!(reader.read_message(POLL).unwrap().unwrap().as_ref(), b"abc");
    }

    #[test]
    fn closed_source_propagates() {
        let (left, right) = memory_pair(8);
        drop(left);
        let mut reader = MessageReader::new(right.source, &FrameProfile::default());
        let err = reader.read_message(POLL).unwrap_err();
        assert!(matches!(err, FrameError::Channel(ChannelError::Closed)));
    }

    #[test]
    fn reassembler_follows_profile() {
        let mut tagged = Reassembler::for_profile(&FrameProfile::tagged(20));
        assert_eq!(tagged.push(&[0x00, b'x']).unwrap().as_ref(), b"x");

        let mut sentinel = Reassembler::for_profile(&FrameProfile::sentinel(20));
        assert!(sentinel.push(&[0x00, b'x']).is_none());
        assert_eq!(sentinel.buffered_len(), 2);
        sentinel.reset();
        assert_eq!(sentinel.buffered_len(), 0);
    }
}
