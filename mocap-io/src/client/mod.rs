//! NatNet client
//!
//! ## Channels
//!
//! | Socket  | Port (default) | Owner                | Traffic                          |
//! |---------|----------------|----------------------|----------------------------------|
//! | command | 1508           | `NatNetClient`       | request/response, blocking       |
//! | data    | 1509           | stream receiver      | frames pushed by the server      |
//!
//! ## Connection sequence
//!
//! 1. Ping: server name and protocol version (no answer: connect fails)
//! 2. Model definition: scene structure
//! 3. First frame, so the scene has data before `connect()` returns
//! 4. `getDataStreamAddress`: multicast group or unicast source
//! 5. `getFramerate`
//! 6. Stream receiver starts on the data port
//!
//! Without a working data stream, call [`NatNetClient::update`] to poll
//! frames over the command channel.
//!
//! # Example
//!
//! ```no_run
//! use mocap_io::client::NatNetClient;
//! use mocap_io::config::ClientConfig;
//!
//! let mut client = NatNetClient::new(ClientConfig::default());
//! client.connect("127.0.0.1")?;
//! println!("Connected to {}", client.server_name());
//! client.update()?;
//! if let Some(actor) = client.scene().find_actor("Rigid.*") {
//!     println!("{} has {} bone(s)", actor.name, actor.bones.len());
//! }
//! client.disconnect();
//! # Ok::<(), mocap_io::Error>(())
//! ```

mod listener;
mod receiver;
mod shared;

pub use listener::{
    ActorListener, ActorWatch, DeviceListener, DeviceWatch, ListenerRegistry, SceneEvent,
    SceneListener,
};
pub use receiver::{StreamMonitor, Transition, bind_data_socket};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::{Codec, CommandPacket, Response, ServerInfo};
use crate::scene::Scene;
use crossbeam_channel::Receiver;
use parking_lot::MutexGuard;
use receiver::StreamReceiver;
use shared::SharedScene;
use std::io::{self, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Resolve a host name or IP literal to its first address
pub fn resolve_host(host: &str) -> Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    (host, 0)
        .to_socket_addrs()
        .map_err(|e| Error::AddressResolution(format!("{}: {}", host, e)))?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| Error::AddressResolution(format!("{}: no addresses", host)))
}

/// Client for a NatNet motion capture server
pub struct NatNetClient {
    config: ClientConfig,
    shared: Arc<SharedScene>,
    codec: Codec,
    tx: CommandPacket,
    rx_buffer: Vec<u8>,
    control: Option<UdpSocket>,
    server: Option<ServerInfo>,
    data_address: Option<IpAddr>,
    frame_rate: Option<f32>,
    receiver: Option<StreamReceiver>,
    streaming: Arc<AtomicBool>,
    error_count: u32,
}

impl NatNetClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            shared: Arc::new(SharedScene::new()),
            codec: Codec::default(),
            tx: CommandPacket::new(),
            rx_buffer: vec![0u8; MAX_PACKET_SIZE],
            control: None,
            server: None,
            data_address: None,
            frame_rate: None,
            receiver: None,
            streaming: Arc::new(AtomicBool::new(false)),
            error_count: 0,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Connect to the server at `host` (name or IP literal)
    ///
    /// An existing connection is closed first. On failure the client is left
    /// fully disconnected.
    pub fn connect(&mut self, host: &str) -> Result<()> {
        if self.is_connected() {
            self.disconnect();
        }

        let host_ip = resolve_host(host)?;
        match self.establish(host_ip) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("Connection to {} failed: {}", host, e);
                self.disconnect();
                Err(e)
            }
        }
    }

    fn establish(&mut self, host: IpAddr) -> Result<()> {
        let local: SocketAddr = match host {
            IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect((host, self.config.network.command_port))?;
        socket.set_read_timeout(Some(self.config.timing.command_timeout()))?;
        log::debug!(
            "Command socket {} -> {}:{}",
            socket.local_addr()?,
            host,
            self.config.network.command_port
        );
        self.control = Some(socket);
        self.codec = Codec::default();
        self.error_count = 0;

        // Handshake
        self.tx.set_ping(&self.config.client.name, self.config.client.version);
        let Response::Ping(info) = self.exchange(NAT_PINGRESPONSE, "ping response")? else {
            return Err(Error::InvalidPacket("expected ping response".to_string()));
        };
        log::info!("Connected to {} (NatNet {})", info, info.natnet_version);
        self.server = Some(info);

        // Scene structure is mandatory, the first frame is not
        self.tx.set_request_model_definition();
        self.exchange(NAT_MODELDEF, "model definition")?;
        self.tx.set_request_frame();
        if let Err(e) = self.exchange(NAT_FRAMEOFDATA, "frame of data") {
            log::warn!("Initial frame request failed: {}", e);
        }

        let data_address = self.query_data_address(host);
        log::info!(
            "Data stream address {} ({})",
            data_address,
            if data_address.is_multicast() {
                "multicast"
            } else {
                "unicast"
            }
        );
        self.data_address = Some(data_address);

        self.frame_rate = match self.send_command(CMD_FRAMERATE) {
            Ok(text) => text.trim().parse::<f32>().ok(),
            Err(e) => {
                log::debug!("Frame rate not available: {}", e);
                None
            }
        };
        if let Some(rate) = self.frame_rate {
            log::info!("Server frame rate {} Hz", rate);
        }

        self.start_receiver(data_address);
        Ok(())
    }

    /// Ask the server where it streams to; the command host is the fallback
    fn query_data_address(&mut self, host: IpAddr) -> IpAddr {
        match self.send_command(CMD_DATA_STREAM_ADDRESS) {
            Ok(text) => match resolve_host(text.trim()) {
                Ok(ip) => ip,
                Err(e) => {
                    log::warn!("Invalid data stream address '{}' ({}), using {}", text, e, host);
                    host
                }
            },
            Err(e) => {
                log::warn!("Data stream address unavailable ({}), using {}", e, host);
                host
            }
        }
    }

    fn start_receiver(&mut self, source: IpAddr) {
        // A receiver that outlived its stop timeout keeps the old flag
        self.streaming = Arc::new(AtomicBool::new(false));
        match StreamReceiver::start(
            source,
            self.config.network.data_port,
            self.codec.clone(),
            Arc::clone(&self.shared),
            Arc::clone(&self.streaming),
            &self.config.timing,
        ) {
            Ok(receiver) => self.receiver = Some(receiver),
            Err(e) => log::warn!("Stream receiver unavailable ({}), poll with update()", e),
        }
    }

    /// Stop streaming and close the command channel
    ///
    /// Always succeeds; returns true once the client is disconnected.
    pub fn disconnect(&mut self) -> bool {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.stop(self.config.timing.receiver_join_timeout());
        }
        self.streaming.store(false, Ordering::Relaxed);

        if self.control.take().is_some() {
            match &self.server {
                Some(info) => log::info!("Disconnected from {}", info),
                None => log::debug!("Command socket closed"),
            }
        }
        self.server = None;
        self.data_address = None;
        self.frame_rate = None;
        self.error_count = 0;
        !self.is_connected()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.control.is_some()
    }

    /// True while frames arrive on the data channel
    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Relaxed)
    }

    /// "name vA.B.C.D", empty when not connected
    pub fn server_name(&self) -> String {
        self.server
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server.as_ref()
    }

    pub fn data_stream_address(&self) -> Option<IpAddr> {
        self.data_address
    }

    /// Frame rate reported by the server during connect
    pub fn frame_rate(&self) -> Option<f32> {
        self.frame_rate
    }

    /// Local address of the data socket, if the receiver is running
    pub fn data_local_addr(&self) -> Option<SocketAddr> {
        self.receiver.as_ref().map(StreamReceiver::local_addr)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Poll a frame unless the data stream is delivering them
    pub fn update(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        if self.is_streaming() {
            return Ok(());
        }
        self.tx.set_request_frame();
        self.exchange(NAT_FRAMEOFDATA, "frame of data").map(|_| ())
    }

    /// Send a free-form request and return the server's answer
    pub fn send_command(&mut self, command: &str) -> Result<String> {
        self.tx.set_request(command)?;
        match self.exchange(NAT_RESPONSE, "response")? {
            Response::Text(text) => Ok(text),
            other => Err(Error::InvalidPacket(format!("unexpected {:?}", other))),
        }
    }

    /// Send the prepared command and wait for a response with packet id `expected`
    ///
    /// Every packet received meanwhile is decoded and applied, but only the
    /// expected type ends the wait.
    fn exchange(&mut self, expected: u16, what: &'static str) -> Result<Response> {
        match self.transact(expected) {
            Err(Error::Io(e)) => Err(self.register_failure(e, what)),
            other => other,
        }
    }

    fn transact(&mut self, expected: u16) -> Result<Response> {
        let Some(socket) = self.control.as_ref() else {
            return Err(Error::NotConnected);
        };
        socket.send(self.tx.as_bytes())?;

        loop {
            let len = socket.recv(&mut self.rx_buffer)?;
            self.error_count = 0;

            match self.shared.dispatch(&mut self.codec, &self.rx_buffer[..len]) {
                Ok(response) if response.packet_id() == expected => return Ok(response),
                Ok(Response::UnrecognizedRequest) if expected == NAT_RESPONSE => {
                    return Err(Error::UnrecognizedRequest);
                }
                Ok(other) => log::debug!(
                    "Discarding packet {} while waiting for {}",
                    other.packet_id(),
                    expected
                ),
                Err(e) => log::warn!("Dropping command channel packet: {}", e),
            }
        }
    }

    /// Count a failed exchange; too many in a row close the connection
    fn register_failure(&mut self, e: io::Error, what: &'static str) -> Error {
        self.error_count += 1;
        let timed_out = matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut);

        if self.error_count == 1 {
            if timed_out {
                log::warn!("No {} received", what);
            } else {
                log::error!("Command channel error: {}", e);
            }
        }

        let max = self.config.timing.max_consecutive_errors;
        if self.error_count > max {
            let count = self.error_count;
            log::error!("{} consecutive command channel errors, disconnecting", count);
            self.disconnect();
            return Error::TooManyErrors(count);
        }

        if timed_out {
            Error::NoResponse(what)
        } else {
            Error::Io(e)
        }
    }

    // ========================================================================
    // Scene access
    // ========================================================================

    /// Locked view of the scene
    ///
    /// Holding the guard blocks the stream receiver; drop it quickly.
    pub fn scene(&self) -> MutexGuard<'_, Scene> {
        self.shared.lock()
    }

    /// Copy of the current scene
    pub fn snapshot(&self) -> Scene {
        self.shared.lock().clone()
    }

    /// Register a listener; it immediately receives `StructureChanged`
    pub fn add_listener(&self, listener: Arc<dyn SceneListener>) -> bool {
        self.shared.add_listener(listener)
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SceneListener>) -> bool {
        self.shared.remove_listener(listener)
    }

    /// Channel of scene events for polling consumers
    pub fn subscribe(&self) -> Receiver<SceneEvent> {
        self.shared.subscribe()
    }
}

impl Default for NatNetClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Drop for NatNetClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
