//! Background receiver for the data stream
//!
//! The server pushes frames to the data port (multicast or unicast). One
//! thread per connection receives them, decodes them into the shared scene
//! and notifies listeners.
//!
//! # Stream detection
//!
//! ```text
//!             packet received
//!   ┌─────────┐ ──────────────────────▶ ┌───────────┐
//!   │ Waiting │                         │ Streaming │  timeout: running (100 ms)
//!   │ 1000 ms │ ◀────────────────────── └───────────┘
//!   └─────────┘  > threshold consecutive
//!                timeouts
//! ```
//!
//! While streaming, `NatNetClient::update()` does nothing; once the stream
//! stops the client falls back to polling frames over the command channel.
//!
//! Any socket error other than a timeout ends the thread.

use super::shared::SharedScene;
use crate::config::TimingConfig;
use crate::error::{Error, Result};
use crate::protocol::Codec;
use crate::protocol::constants::MAX_PACKET_SIZE;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Stream state change reported by [`StreamMonitor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Started,
    Stopped,
}

/// Adaptive timeout state machine
#[derive(Debug, Clone)]
pub struct StreamMonitor {
    initial_timeout: Duration,
    running_timeout: Duration,
    threshold: u32,
    timeouts: u32,
    active: bool,
}

impl StreamMonitor {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            initial_timeout: timing.stream_initial_timeout(),
            running_timeout: timing.stream_running_timeout(),
            threshold: timing.stream_timeout_threshold,
            timeouts: 0,
            active: false,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Socket read timeout for the current state
    #[inline]
    pub fn timeout(&self) -> Duration {
        if self.active {
            self.running_timeout
        } else {
            self.initial_timeout
        }
    }

    pub fn on_packet(&mut self) -> Transition {
        self.timeouts = 0;
        if self.active {
            Transition::None
        } else {
            self.active = true;
            Transition::Started
        }
    }

    pub fn on_timeout(&mut self) -> Transition {
        if !self.active {
            return Transition::None;
        }
        self.timeouts += 1;
        if self.timeouts > self.threshold {
            self.active = false;
            self.timeouts = 0;
            Transition::Stopped
        } else {
            Transition::None
        }
    }
}

/// Bind the data socket for a stream source
///
/// Multicast sources bind the wildcard address with address reuse enabled,
/// so several clients on one host can join the same group. Unicast sources
/// bind the source address, falling back to the wildcard address when that
/// address is not local.
pub fn bind_data_socket(source: IpAddr, port: u16) -> Result<UdpSocket> {
    let wildcard = match source {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };

    if source.is_multicast() {
        let socket = bind_shared(SocketAddr::new(wildcard, port))?;
        match source {
            IpAddr::V4(group) => socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?,
            IpAddr::V6(group) => socket.join_multicast_v6(&group, 0)?,
        }
        log::info!("Joined multicast group {} on port {}", source, port);
        return Ok(socket);
    }

    match UdpSocket::bind(SocketAddr::new(source, port)) {
        Ok(socket) => Ok(socket),
        Err(e) => {
            log::warn!(
                "Cannot bind data socket to {}:{} ({}), using {}",
                source,
                port,
                e,
                wildcard
            );
            Ok(UdpSocket::bind(SocketAddr::new(wildcard, port))?)
        }
    }
}

fn bind_shared(addr: SocketAddr) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SockAddr::from(addr))?;
    Ok(socket.into())
}

/// Handle to a running receiver thread
pub struct StreamReceiver {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl StreamReceiver {
    /// Bind the data socket and spawn the receiver thread
    pub fn start(
        source: IpAddr,
        port: u16,
        codec: Codec,
        shared: Arc<SharedScene>,
        streaming: Arc<AtomicBool>,
        timing: &TimingConfig,
    ) -> Result<Self> {
        let socket = bind_data_socket(source, port)?;
        let local_addr = socket.local_addr()?;
        let monitor = StreamMonitor::new(timing);
        socket.set_read_timeout(Some(monitor.timeout()))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("natnet-receiver".to_string())
            .spawn(move || {
                receiver_loop(socket, codec, shared, streaming, thread_shutdown, monitor);
            })
            .map_err(|e| Error::Other(format!("Failed to spawn stream receiver: {}", e)))?;

        log::info!("Stream receiver listening on {}", local_addr);
        Ok(Self {
            shutdown,
            handle: Some(handle),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signal the thread to stop and wait up to `timeout` for it
    ///
    /// Returns false if the thread did not finish in time; it is then left
    /// to exit on its own after its current receive times out.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        self.shutdown.store(true, Ordering::Relaxed);
        let Some(handle) = self.handle.take() else {
            return true;
        };

        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                log::warn!("Stream receiver did not stop within {:?}", timeout);
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }

        if handle.join().is_err() {
            log::error!("Stream receiver thread panicked");
        }
        true
    }
}

impl Drop for StreamReceiver {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

fn receiver_loop(
    socket: UdpSocket,
    mut codec: Codec,
    shared: Arc<SharedScene>,
    streaming: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    mut monitor: StreamMonitor,
) {
    let mut buffer = vec![0u8; MAX_PACKET_SIZE];

    while !shutdown.load(Ordering::Relaxed) {
        let transition = match socket.recv_from(&mut buffer) {
            Ok((len, from)) => {
                log::trace!("Data packet from {} ({} bytes)", from, len);
                if let Err(e) = shared.dispatch(&mut codec, &buffer[..len]) {
                    log::warn!("Dropping data packet from {}: {}", from, e);
                }
                monitor.on_packet()
            }
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                monitor.on_timeout()
            }
            Err(e) => {
                log::error!("Data socket error: {}", e);
                break;
            }
        };

        match transition {
            Transition::Started => {
                log::info!("Data stream active");
                streaming.store(true, Ordering::Relaxed);
            }
            Transition::Stopped => {
                log::warn!("Data stream stopped, falling back to polling");
                streaming.store(false, Ordering::Relaxed);
            }
            Transition::None => continue,
        }

        if let Err(e) = socket.set_read_timeout(Some(monitor.timeout())) {
            log::error!("Failed to set data socket timeout: {}", e);
            break;
        }
    }

    streaming.store(false, Ordering::Relaxed);
    log::info!("Stream receiver exiting");
}
