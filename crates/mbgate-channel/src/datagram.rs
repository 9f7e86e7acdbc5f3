use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, trace};

use crate::error::{ChannelError, Result};
use crate::traits::{PacketSink, PacketSource, DEFAULT_MTU};

const RECV_BUFFER_SIZE: usize = 64 * 1024;
const MIN_POLL: Duration = Duration::from_millis(1);

/// Packet channel over a pair of Unix datagram sockets.
///
/// Each side binds its own path and sends to the peer's path. Datagrams keep
/// their boundaries, so one `write` arrives as exactly one packet, the same
/// way a GATT write/notify characteristic pair behaves. The peer does not
/// need to exist when the channel is bound.
pub struct DatagramChannel {
    socket: UnixDatagram,
    peer: PathBuf,
    mtu: usize,
    guard: Arc<SocketPathGuard>,
}

impl DatagramChannel {
    /// Permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind `local` and address packets to `peer`, using [`DEFAULT_MTU`].
    pub fn bind(local: impl AsRef<Path>, peer: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mtu(local, peer, DEFAULT_MTU)
    }

    /// Bind `local` and address packets to `peer` with an explicit MTU.
    ///
    /// A stale socket file at `local` is removed first; any other kind of
    /// file at that path is left alone and reported as a bind error.
    pub fn bind_with_mtu(
        local: impl AsRef<Path>,
        peer: impl AsRef<Path>,
        mtu: usize,
    ) -> Result<Self> {
        let path = local.as_ref().to_path_buf();
        let peer = peer.as_ref().to_path_buf();

        for candidate in [&path, &peer] {
            let len = candidate.as_os_str().len();
            if len >= Self::MAX_PATH_LEN {
                return Err(ChannelError::PathTooLong {
                    path: candidate.clone(),
                    len,
                    max: Self::MAX_PATH_LEN,
                });
            }
        }

        remove_stale_socket(&path)?;

        let socket = UnixDatagram::bind(&path).map_err(|e| bind_error(&path, e))?;
        std::fs::set_permissions(
            &path,
            std::fs::Permissions::from_mode(Self::DEFAULT_SOCKET_MODE),
        )
        .map_err(|e| bind_error(&path, e))?;
        let metadata = std::fs::symlink_metadata(&path).map_err(|e| bind_error(&path, e))?;

        info!(?path, ?peer, mtu, "bound datagram channel");

        Ok(Self {
            socket,
            peer,
            mtu,
            guard: Arc::new(SocketPathGuard {
                path,
                identity: (metadata.dev(), metadata.ino()),
            }),
        })
    }

    /// Split into independently owned write and notify halves.
    ///
    /// The socket file is removed once both halves are dropped.
    pub fn split(self) -> Result<(DatagramSink, DatagramSource)> {
        let reader = self.socket.try_clone()?;
        let sink = DatagramSink {
            socket: self.socket,
            peer: self.peer,
            mtu: self.mtu,
            _guard: Arc::clone(&self.guard),
        };
        let source = DatagramSource {
            socket: reader,
            buf: vec![0u8; RECV_BUFFER_SIZE],
            _guard: self.guard,
        };
        Ok((sink, source))
    }

    /// The local socket path.
    pub fn path(&self) -> &Path {
        &self.guard.path
    }

    /// The peer socket path packets are sent to.
    pub fn peer(&self) -> &Path {
        &self.peer
    }
}

/// Write half of a [`DatagramChannel`].
pub struct DatagramSink {
    socket: UnixDatagram,
    peer: PathBuf,
    mtu: usize,
    _guard: Arc<SocketPathGuard>,
}

impl PacketSink for DatagramSink {
    fn write(&mut self, packet: &[u8]) -> Result<()> {
        if packet.len() > self.mtu {
            return Err(ChannelError::PacketTooLarge {
                size: packet.len(),
                mtu: self.mtu,
            });
        }
        loop {
            match self.socket.send_to(packet, &self.peer) {
                Ok(_) => {
                    trace!(size = packet.len(), peer = ?self.peer, "datagram write");
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::NotFound
                        || err.kind() == ErrorKind::ConnectionRefused =>
                {
                    debug!(peer = ?self.peer, "datagram peer not listening");
                    return Err(ChannelError::Closed);
                }
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }
    }

    fn mtu(&self) -> usize {
        self.mtu
    }
}

/// Notify half of a [`DatagramChannel`].
pub struct DatagramSource {
    socket: UnixDatagram,
    buf: Vec<u8>,
    _guard: Arc<SocketPathGuard>,
}

impl PacketSource for DatagramSource {
    fn recv(&mut self, poll: Duration) -> Result<Option<Bytes>> {
        self.socket.set_read_timeout(Some(poll.max(MIN_POLL)))?;
        match self.socket.recv(&mut self.buf) {
            Ok(n) => Ok(Some(Bytes::copy_from_slice(&self.buf[..n]))),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(ChannelError::Io(err)),
        }
    }
}

impl std::fmt::Debug for DatagramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramChannel")
            .field("path", &self.guard.path)
            .field("peer", &self.peer)
            .field("mtu", &self.mtu)
            .finish()
    }
}

/// Removes the bound socket file, but only if it is still the one we created.
struct SocketPathGuard {
    path: PathBuf,
    identity: (u64, u64),
}

impl Drop for SocketPathGuard {
    fn drop(&mut self) {
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && (metadata.dev(), metadata.ino()) == self.identity
            {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
            }
        }
    }
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let metadata = std::fs::symlink_metadata(path).map_err(|e| bind_error(path, e))?;
    if !metadata.file_type().is_socket() {
        return Err(bind_error(
            path,
            std::io::Error::new(ErrorKind::AlreadyExists, "existing path is not a unix socket"),
        ));
    }
    debug!(?path, "removing stale socket");
    std::fs::remove_file(path).map_err(|e| bind_error(path, e))
}

fn bind_error(path: &Path, source: std::io::Error) -> ChannelError {
    ChannelError::Bind {
        path: path.to_path_buf(),
        source,
    }
}
