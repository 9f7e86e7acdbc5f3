use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use mbgate_channel::{ChannelError, PacketSink, PacketSource};
use mbgate_frame::{FragmentWriter, Reassembler};
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::response::{parse_response, Response};

/// Where a session is in its current exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    Awaiting,
    Complete,
    TimedOut,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Sending => "sending",
            SessionState::Awaiting => "awaiting",
            SessionState::Complete => "complete",
            SessionState::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State shared between callers and the listener thread.
struct Inbox {
    state: SessionState,
    reassembler: Reassembler,
    completed: Option<Bytes>,
    closed: bool,
}

struct Shared {
    inbox: Mutex<Inbox>,
    ready: Condvar,
    shutdown: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inbox> {
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One request/response conversation with a gateway device.
///
/// Opening a session starts a single listener that feeds every inbound packet
/// into the session's reassembler. Only one exchange runs at a time; a
/// second caller gets [`SessionError::SessionBusy`] instead of waiting.
/// The reassembly buffer is cleared at the start of every exchange, so
/// fragments of a reply that arrived after its deadline never leak into
/// the next one.
pub struct Session {
    shared: Arc<Shared>,
    writer: Mutex<FragmentWriter<Box<dyn PacketSink>>>,
    config: SessionConfig,
    listener: Option<JoinHandle<()>>,
}

impl Session {
    /// Open a session over a channel pair and start its listener.
    pub fn open<W, R>(sink: W, source: R, config: SessionConfig) -> Result<Self>
    where
        W: PacketSink + 'static,
        R: PacketSource + 'static,
    {
        let sink: Box<dyn PacketSink> = Box::new(sink);
        let writer = FragmentWriter::new(sink, config.profile.clone())?;

        let shared = Arc::new(Shared {
            inbox: Mutex::new(Inbox {
                state: SessionState::Idle,
                reassembler: Reassembler::for_profile(&config.profile),
                completed: None,
                closed: false,
            }),
            ready: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let listener = {
            let shared = Arc::clone(&shared);
            let poll = config.listener_poll;
            thread::Builder::new()
                .name("mbgate-listener".to_string())
                .spawn(move || listen(source, &shared, poll))
                .map_err(ChannelError::Io)?
        };

        info!(
            profile = config.profile.name(),
            timeout_ms = millis(config.timeout),
            "session opened"
        );

        Ok(Self {
            shared,
            writer: Mutex::new(writer),
            config,
            listener: Some(listener),
        })
    }

    /// Send `payload` and wait for the complete reply bytes.
    pub fn exchange(&self, payload: &[u8]) -> Result<Bytes> {
        self.exchange_with_timeout(payload, self.config.timeout)
    }

    /// [`exchange`](Self::exchange) with a deadline other than the configured one.
    pub fn exchange_with_timeout(&self, payload: &[u8], timeout: Duration) -> Result<Bytes> {
        {
            let mut inbox = self.shared.lock();
            if inbox.state != SessionState::Idle {
                debug!(state = %inbox.state, "rejecting exchange");
                return Err(SessionError::SessionBusy);
            }
            if inbox.closed {
                return Err(SessionError::Channel(ChannelError::Closed));
            }
            inbox.state = SessionState::Sending;
            inbox.reassembler.reset();
            inbox.completed = None;
        }
        let _idle = IdleOnDrop(&self.shared);

        // A timeout past the clock's range means no deadline.
        let deadline = Instant::now().checked_add(timeout);
        debug!(size = payload.len(), "sending request");
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(payload)?;

        let mut inbox = self.shared.lock();
        if inbox.state == SessionState::Sending {
            inbox.state = SessionState::Awaiting;
        }
        loop {
            if let Some(message) = inbox.completed.take() {
                inbox.state = SessionState::Complete;
                debug!(size = message.len(), "response complete");
                return Ok(message);
            }
            if inbox.closed {
                return Err(SessionError::Channel(ChannelError::Closed));
            }
            let Some(deadline) = deadline else {
                inbox = self
                    .shared
                    .ready
                    .wait(inbox)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };
            let now = Instant::now();
            if now >= deadline {
                inbox.state = SessionState::TimedOut;
                warn!(
                    timeout_ms = millis(timeout),
                    buffered = inbox.reassembler.buffered_len(),
                    "response timed out"
                );
                return Err(SessionError::Timeout(timeout));
            }
            inbox = self
                .shared
                .ready
                .wait_timeout(inbox, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Validate and send a command, then parse the reply.
    ///
    /// A reply that is not a status object comes back as
    /// [`Response::Raw`] rather than an error.
    pub fn submit(&self, command: &Command) -> Result<Response> {
        let payload = command.to_json()?;
        debug!(cmd = command.name(), "submitting command");
        let reply = self.exchange(&payload)?;
        Ok(parse_response(reply))
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the inbound side of the channel has gone away.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(listener) = self.listener.take() {
            let _ = listener.join();
        }
        info!("session closed");
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Returns the session to `Idle` however an exchange ends.
struct IdleOnDrop<'a>(&'a Shared);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.lock().state = SessionState::Idle;
    }
}

fn listen<R: PacketSource>(mut source: R, shared: &Shared, poll: Duration) {
    while !shared.shutdown.load(Ordering::Relaxed) {
        let packet = match source.recv(poll) {
            Ok(Some(packet)) => packet,
            Ok(None) => continue,
            Err(err) => {
                if !matches!(err, ChannelError::Closed) {
                    warn!(error = %err, "listener stopping on channel error");
                } else {
                    debug!("channel closed, listener stopping");
                }
                shared.lock().closed = true;
                shared.ready.notify_all();
                return;
            }
        };

        let mut inbox = shared.lock();
        let Some(message) = inbox.reassembler.push(&packet) else {
            continue;
        };
        match inbox.state {
            SessionState::Sending | SessionState::Awaiting => {
                inbox.completed = Some(message);
                shared.ready.notify_all();
            }
            state => {
                warn!(%state, size = message.len(), "discarding unsolicited message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mbgate_channel::{memory_pair, MemorySink, MemorySource};
    use mbgate_frame::{FrameProfile, FragmentWriter, MessageReader, SentinelConfig};

    use super::*;

    const POLL: Duration = Duration::from_millis(5);

    fn config(timeout_ms: u64) -> SessionConfig {
        SessionConfig {
            timeout: Duration::from_millis(timeout_ms),
            listener_poll: POLL,
            ..SessionConfig::default()
        }
    }

    fn open(config: SessionConfig) -> (Session, MemorySink, MemorySource) {
        let (host, device) = memory_pair(20);
        let session = Session::open(host.sink, host.source, config).expect("session should open");
        (session, device.sink, device.source)
    }

    /// Device that answers each request with `reply(request)`.
    fn spawn_device(
        sink: MemorySink,
        source: MemorySource,
        profile: FrameProfile,
        requests: usize,
        reply: fn(&[u8]) -> Vec<u8>,
    ) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let mut reader = MessageReader::new(source, &profile);
            let mut writer = FragmentWriter::new(sink, profile).expect("device writer");
            for _ in 0..requests {
                let request = loop {
                    if let Some(message) = reader
                        .read_message(Duration::from_millis(50))
                        .expect("device read")
                    {
                        break message;
                    }
                };
                writer.send(&reply(&request)).expect("device write");
            }
        })
    }

    #[test]
    fn exchange_returns_reassembled_reply() {
        let (session, sink, source) = open(config(1000));
        let device = spawn_device(sink, source, FrameProfile::default(), 1, |request| {
            let mut reply = b"echo: ".to_vec();
            reply.extend_from_slice(request);
            reply.extend_from_slice(b" and some padding to force fragmentation");
            reply
        });

        let reply = session.exchange(b"hello").expect("exchange should succeed");
        assert_eq!(
            reply.as_ref(),
            b"echo: hello and some padding to force fragmentation"
        );
        assert_eq!(session.state(), SessionState::Idle);
        device.join().expect("device thread should finish");
    }

    #[test]
    fn submit_parses_status_reply() {
        let (session, sink, source) = open(config(1000));
        let device = spawn_device(sink, source, FrameProfile::default(), 2, |request| {
            if request.starts_with(b"{") {
                br#"{"status":"ok","devices":[]}"#.to_vec()
            } else {
                b"not json".to_vec()
            }
        });

        let response = session.submit(&Command::ListDevices).expect("submit");
        assert!(response.parsed().expect("parsed").is_ok());

        let raw = session.exchange(b"plain").expect("exchange");
        assert!(parse_response(raw).is_raw());
        device.join().expect("device thread should finish");
    }

    #[test]
    fn sentinel_profile_exchange() {
        let profile = FrameProfile::Sentinel(SentinelConfig {
            chunk_size: 8,
            chunk_delay: Duration::ZERO,
            terminator_delay: Duration::ZERO,
            ..SentinelConfig::default()
        });
        let (session, sink, source) = open(config(1000).with_profile(profile.clone()));
        let device = spawn_device(sink, source, profile, 1, |_| {
            br#"{"status":"ok","note":"sentinel framed"}"#.to_vec()
        });

        let response = session.submit(&Command::ListDevices).expect("submit");
        let parsed = response.parsed().expect("parsed");
        assert_eq!(parsed.get("note"), Some(&serde_json::json!("sentinel framed")));
        device.join().expect("device thread should finish");
    }

    #[test]
    fn timeout_reported_and_state_reset() {
        let (session, _sink, _source) = open(config(50));
        let started = Instant::now();
        let err = session.exchange(b"ping").unwrap_err();
        assert!(matches!(err, SessionError::Timeout(t) if t == Duration::from_millis(50)));
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn concurrent_exchange_is_busy() {
        let (session, _sink, _source) = open(config(300));
        let session = Arc::new(session);

        let first = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.exchange(b"slow"))
        };
        let deadline = Instant::now() + Duration::from_secs(1);
        while session.state() == SessionState::Idle && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        let err = session.exchange(b"second").unwrap_err();
        assert!(matches!(err, SessionError::SessionBusy));

        let first = first.join().expect("first exchange thread");
        assert!(matches!(first, Err(SessionError::Timeout(_))));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn late_fragments_do_not_leak_into_next_exchange() {
        let (session, mut sink, _source) = open(config(500));
        assert!(matches!(
            session
                .exchange_with_timeout(b"first", Duration::from_millis(50))
                .unwrap_err(),
            SessionError::Timeout(_)
        ));

        // START of the reply that missed its deadline.
        sink.write(&[0x01, b's', b't', b'a', b'l', b'e']).unwrap();
        thread::sleep(Duration::from_millis(30));

        let mut device = sink.clone();
        let responder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            device.write(&[0x00, b'f', b'r', b'e', b's', b'h']).unwrap();
        });

        let reply = session.exchange(b"second").expect("second exchange");
        assert_eq!(reply.as_ref(), b"fresh");
        responder.join().unwrap();
    }

    #[test]
    fn unsolicited_message_is_discarded() {
        let (session, mut sink, _source) = open(config(50));
        sink.write(&[0x00, b'x']).unwrap();
        thread::sleep(Duration::from_millis(30));

        let err = session.exchange(b"ping").unwrap_err();
        assert!(matches!(err, SessionError::Timeout(_)));
    }

    #[test]
    fn invalid_command_is_not_sent() {
        let (session, _sink, mut source) = open(config(50));
        let command = Command::CreateDevice {
            name: String::new(),
            slave_id: 1,
        };
        let err = session.submit(&command).unwrap_err();
        assert!(matches!(err, SessionError::InvalidCommand(_)));
        assert!(source.recv(Duration::from_millis(20)).unwrap().is_none());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn closed_channel_fails_exchange() {
        let (session, sink, source) = open(config(1000));
        drop(sink);
        drop(source);

        let deadline = Instant::now() + Duration::from_secs(1);
        while !session.is_closed() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        let err = session.exchange(b"ping").unwrap_err();
        assert!(matches!(err, SessionError::Channel(ChannelError::Closed)));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn write_failure_returns_to_idle() {
        let (host, device) = memory_pair(20);
        drop(device.source);
        let session = Session::open(host.sink, host.source, config(100)).unwrap();

        let err = session.exchange(b"ping").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(mbgate_frame::FrameError::Channel(ChannelError::Closed))
        ));
        assert_eq!(session.state(), SessionState::Idle);
        drop(device.sink);
    }

    #[test]
    fn timeout_beyond_clock_range_waits_for_reply() {
        let (session, sink, source) = open(config(1000));
        let device = spawn_device(sink, source, FrameProfile::default(), 1, |_| b"late".to_vec());

        let reply = session
            .exchange_with_timeout(b"ping", Duration::from_secs(u64::MAX))
            .expect("exchange should succeed");
        assert_eq!(reply.as_ref(), b"late");
        assert_eq!(session.state(), SessionState::Idle);
        device.join().expect("device thread should finish");
    }

    #[test]
    fn log_millis_saturate() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn unbounded_wait_ends_when_channel_closes() {
        let (session, sink, source) = open(config(1000));
        let device = thread::spawn(move || {
            let mut reader = MessageReader::new(source, &FrameProfile::default());
            while reader
                .read_message(Duration::from_millis(50))
                .expect("device read")
                .is_none()
            {}
            drop(sink);
        });

        let err = session
            .exchange_with_timeout(b"ping", Duration::MAX)
            .unwrap_err();
        assert!(matches!(err, SessionError::Channel(ChannelError::Closed)));
        assert_eq!(session.state(), SessionState::Idle);
        device.join().expect("device thread should finish");
    }

    #[test]
    fn profile_too_large_for_link_rejected() {
        let (host, _device) = memory_pair(8);
        let result = Session::open(host.sink, host.source, SessionConfig::default());
        assert!(matches!(
            result,
            Err(SessionError::Frame(mbgate_frame::FrameError::InvalidConfig(_)))
        ));
    }
}
