//! Packet dispatch: datagram in, scene mutation and typed response out.

use super::constants::*;
use super::frame::{FrameOutcome, Sentinels, apply_frame};
use super::model::decode_model_definition;
use super::reader::{PayloadReader, split_header};
use super::version::Version;
use crate::error::Result;
use crate::scene::Scene;
use parking_lot::Mutex;
use std::fmt;

/// Server identity from the ping response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerInfo {
    pub name: String,
    pub server_version: Version,
    /// Protocol version; gates optional fields in every later packet
    pub natnet_version: Version,
}

impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.server_version)
    }
}

/// Decoded server packet
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ping(ServerInfo),
    /// Scene structure replaced
    ModelDefinition { actors: usize, devices: usize },
    Frame(FrameOutcome),
    /// Answer to a free-form request
    Text(String),
    /// Server log message
    Message(String),
    UnrecognizedRequest,
    Unknown(u16),
}

impl Response {
    /// Wire id of the packet this response came from
    pub fn packet_id(&self) -> u16 {
        match self {
            Response::Ping(_) => NAT_PINGRESPONSE,
            Response::ModelDefinition { .. } => NAT_MODELDEF,
            Response::Frame(_) => NAT_FRAMEOFDATA,
            Response::Text(_) => NAT_RESPONSE,
            Response::Message(_) => NAT_MESSAGESTRING,
            Response::UnrecognizedRequest => NAT_UNRECOGNIZED_REQUEST,
            Response::Unknown(id) => *id,
        }
    }
}

/// Stateful decoder for one connection
///
/// Holds the negotiated protocol version and the sentinel entities that
/// absorb data without a place in the scene. Each thread that decodes
/// packets owns its own copy.
#[derive(Debug, Clone)]
pub struct Codec {
    version: Version,
    sentinels: Sentinels,
}

impl Codec {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            sentinels: Sentinels::default(),
        }
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Decode one datagram and apply it to `scene`
    ///
    /// Model definitions replace the scene's actors and devices, frames update
    /// them in place. The scene lock is only taken for the mutation itself.
    /// A ping response switches this codec to the server's protocol version.
    pub fn decode(&mut self, datagram: &[u8], scene: &Mutex<Scene>) -> Result<Response> {
        self.decode_with(datagram, scene, |_, _| {})
    }

    /// Like [`decode`](Self::decode), calling `applied` with the result while
    /// the scene lock taken for a model definition or frame is still held
    pub fn decode_with<F>(
        &mut self,
        datagram: &[u8],
        scene: &Mutex<Scene>,
        applied: F,
    ) -> Result<Response>
    where
        F: FnOnce(&Response, &Scene),
    {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("RX {} bytes: {}", datagram.len(), hex_dump(datagram, 64));
        }

        let (id, payload) = split_header(datagram)?;
        let mut r = PayloadReader::new(payload);

        let response = match id {
            NAT_PINGRESPONSE => {
                let info = ServerInfo {
                    name: r.read_fixed_string(MAX_NAMELENGTH)?,
                    server_version: Version::from_bytes(r.read_version()?),
                    natnet_version: Version::from_bytes(r.read_version()?),
                };
                self.version = info.natnet_version;
                Response::Ping(info)
            }
            NAT_MODELDEF => {
                // Parsed before locking; only the swap happens under the lock
                let def = decode_model_definition(&mut r, self.version)?;
                let response = Response::ModelDefinition {
                    actors: def.actors.len(),
                    devices: def.devices.len(),
                };
                let mut scene = scene.lock();
                scene.actors = def.actors;
                scene.devices = def.devices;
                applied(&response, &*scene);
                response
            }
            NAT_FRAMEOFDATA => {
                let mut scene = scene.lock();
                let outcome = apply_frame(&mut r, self.version, &mut scene, &mut self.sentinels)?;
                let response = Response::Frame(outcome);
                applied(&response, &*scene);
                response
            }
            NAT_RESPONSE => Response::Text(r.read_string()?),
            NAT_MESSAGESTRING => {
                let message = r.read_string()?;
                log::info!("Server message: {}", message);
                Response::Message(message)
            }
            NAT_UNRECOGNIZED_REQUEST => {
                log::warn!("Server did not recognize the last request");
                Response::UnrecognizedRequest
            }
            other => {
                log::warn!("Unknown packet id {} ({} byte payload)", other, payload.len());
                Response::Unknown(other)
            }
        };
        Ok(response)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Version::from_bytes(CLIENT_NATNET_VERSION))
    }
}

/// Hex dump of the first `limit` bytes
fn hex_dump(data: &[u8], limit: usize) -> String {
    let mut out: String = data
        .iter()
        .take(limit)
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if data.len() > limit {
        out.push_str(" ...");
    }
    out
}
