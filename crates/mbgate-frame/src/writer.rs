use std::time::Duration;

use bytes::Bytes;
use mbgate_channel::{ChannelError, PacketSink};
use tracing::{debug, trace};

use crate::config::FrameProfile;
use crate::error::{FrameError, Result};
use crate::sentinel::split_sentinel;
use crate::tagged::split_tagged;

/// Writes whole messages to a packet sink as a sequence of fragments.
///
/// There is no acknowledgment: every fragment is written once, in order, and
/// a lost fragment only shows up as the receiver never completing.
pub struct FragmentWriter<S> {
    inner: S,
    profile: FrameProfile,
}

impl<S: PacketSink> FragmentWriter<S> {
    /// Create a writer, checking the profile against the sink's MTU.
    pub fn new(inner: S, profile: FrameProfile) -> Result<Self> {
        profile.validate()?;
        check_fits_link(&profile, inner.mtu())?;
        Ok(Self { inner, profile })
    }

    /// Fragment and write one message. Returns the number of packets written.
    pub fn send(&mut self, message: &[u8]) -> Result<usize> {
        let packets = self.fragments(message)?;
        let count = packets.len();
        debug!(
            profile = self.profile.name(),
            size = message.len(),
            packets = count,
            "sending message"
        );

        for (i, (packet, delay)) in packets.into_iter().enumerate() {
            trace!(index = i, size = packet.len(), "writing fragment");
            self.inner.write(&packet)?;
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
        Ok(count)
    }

    /// The packets `send` would write for `message`, each with the pause
    /// that follows it.
    ///
    /// Fails without writing anything when a sentinel chunk holding one wide
    /// character is still larger than the link MTU.
    pub fn fragments(&self, message: &[u8]) -> Result<Vec<(Bytes, Duration)>> {
        match &self.profile {
            FrameProfile::Tagged(cfg) => Ok(split_tagged(message, cfg.max_payload())
                .iter()
                .map(|fragment| (fragment.to_packet(), Duration::ZERO))
                .collect()),
            FrameProfile::Sentinel(cfg) => {
                let text = std::str::from_utf8(message)?;
                let chunks = split_sentinel(text, cfg.chunk_size);
                let mtu = self.inner.mtu();
                if let Some(chunk) = chunks.iter().find(|chunk| chunk.len() > mtu) {
                    return Err(ChannelError::PacketTooLarge {
                        size: chunk.len(),
                        mtu,
                    }
                    .into());
                }
                let mut packets: Vec<(Bytes, Duration)> = chunks
                    .into_iter()
                    .map(|chunk| (Bytes::copy_from_slice(chunk.as_bytes()), cfg.chunk_delay))
                    .collect();
                packets.push((
                    Bytes::copy_from_slice(cfg.terminator.as_bytes()),
                    cfg.terminator_delay,
                ));
                Ok(packets)
            }
        }
    }

    pub fn profile(&self) -> &FrameProfile {
        &self.profile
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

fn check_fits_link(profile: &FrameProfile, mtu: usize) -> Result<()> {
    let (what, size) = match profile {
        FrameProfile::Tagged(cfg) => ("tagged mtu", cfg.mtu),
        FrameProfile::Sentinel(cfg) => (
            "sentinel chunk/terminator",
            cfg.chunk_size.max(cfg.terminator.len()),
        ),
    };
    if size > mtu {
        return Err(FrameError::InvalidConfig(format!(
            "{what} {size} exceeds link mtu {mtu}"
        )));
    }
    Ok(())
}
