//! Loopback NatNet server for integration tests.
//!
//! Answers pings, model definition and frame requests on an ephemeral
//! command port, and can push frames to a client's data socket.

#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const NAT_PING: u16 = 0;
pub const NAT_PINGRESPONSE: u16 = 1;
pub const NAT_REQUEST: u16 = 2;
pub const NAT_RESPONSE: u16 = 3;
pub const NAT_REQUEST_MODELDEF: u16 = 4;
pub const NAT_MODELDEF: u16 = 5;
pub const NAT_REQUEST_FRAMEOFDATA: u16 = 6;
pub const NAT_FRAMEOFDATA: u16 = 7;
pub const NAT_UNRECOGNIZED_REQUEST: u16 = 100;

/// Little-endian packet writer
#[derive(Default)]
pub struct Packet {
    data: Vec<u8>,
}

impl Packet {
    pub fn i32(mut self, v: i32) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(mut self, v: f32) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f64(mut self, v: f64) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn string(mut self, s: &str) -> Self {
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self
    }

    pub fn bytes(mut self, b: &[u8]) -> Self {
        self.data.extend_from_slice(b);
        self
    }

    pub fn finish(self, id: u16) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.data.len());
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}

pub fn ping_response(name: &str) -> Vec<u8> {
    let mut field = [0u8; 256];
    field[..name.len()].copy_from_slice(name.as_bytes());
    Packet::default()
        .bytes(&field)
        .bytes(&[3, 1, 0, 0]) // server version
        .bytes(&[2, 9, 0, 0]) // NatNet version
        .finish(NAT_PINGRESPONSE)
}

/// Markerset "Body" with one marker, rigid body "Body" (id 1)
pub fn model_definition() -> Vec<u8> {
    Packet::default()
        .i32(2)
        .i32(0) // markerset
        .string("Body")
        .i32(1)
        .string("Body_M1")
        .i32(1) // rigid body
        .string("Body")
        .i32(1)
        .i32(-1)
        .f32(0.0)
        .f32(0.0)
        .f32(0.0)
        .finish(NAT_MODELDEF)
}

/// NatNet 2.9 frame moving "Body" to (x, 1, 2)
pub fn frame(frame_number: i32, x: f32) -> Vec<u8> {
    Packet::default()
        .i32(frame_number)
        .i32(1) // markersets
        .string("Body")
        .i32(1)
        .f32(x)
        .f32(1.0)
        .f32(2.0)
        .i32(0) // unidentified markers
        .i32(1) // rigid bodies
        .i32(1)
        .f32(x)
        .f32(1.0)
        .f32(2.0)
        .f32(0.0)
        .f32(0.0)
        .f32(0.0)
        .f32(1.0)
        .i32(0) // markers
        .f32(0.0) // mean error
        .u16(0x01) // tracked
        .i32(0) // skeletons
        .i32(0) // labelled markers
        .i32(0) // force plates
        .f32(0.004) // latency
        .i32(0) // timecode
        .i32(0) // subframe
        .f64(f64::from(frame_number) / 120.0)
        .finish(NAT_FRAMEOFDATA)
}

/// Fake server answering on the command channel
pub struct FakeServer {
    addr: SocketAddr,
    socket: UdpSocket,
    running: Arc<AtomicBool>,
    frame_counter: Arc<AtomicI32>,
    handle: Option<JoinHandle<()>>,
}

impl FakeServer {
    pub fn start() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        let addr = socket.local_addr().unwrap();

        let running = Arc::new(AtomicBool::new(true));
        let frame_counter = Arc::new(AtomicI32::new(0));

        let thread_socket = socket.try_clone().unwrap();
        let thread_running = Arc::clone(&running);
        let thread_counter = Arc::clone(&frame_counter);
        let handle = thread::spawn(move || {
            serve(thread_socket, thread_running, thread_counter);
        });

        Self {
            addr,
            socket,
            running,
            frame_counter,
            handle: Some(handle),
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Push a frame to a client's data socket
    pub fn push_frame(&self, to: SocketAddr, frame_number: i32, x: f32) {
        self.socket.send_to(&frame(frame_number, x), to).unwrap();
    }

    pub fn frames_served(&self) -> i32 {
        self.frame_counter.load(Ordering::SeqCst)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(socket: UdpSocket, running: Arc<AtomicBool>, frame_counter: Arc<AtomicI32>) {
    let mut buf = [0u8; 2048];
    while running.load(Ordering::SeqCst) {
        let Ok((len, from)) = socket.recv_from(&mut buf) else {
            continue;
        };
        if len < 4 {
            continue;
        }

        let id = u16::from_le_bytes([buf[0], buf[1]]);
        let reply = match id {
            NAT_PING => ping_response("FakeMotive"),
            NAT_REQUEST_MODELDEF => model_definition(),
            NAT_REQUEST_FRAMEOFDATA => {
                let n = frame_counter.fetch_add(1, Ordering::SeqCst) + 1;
                frame(n, n as f32 * 0.1)
            }
            NAT_REQUEST => {
                let end = buf[4..len]
                    .iter()
                    .position(|&b| b == 0)
                    .map_or(len, |p| p + 4);
                match &buf[4..end] {
                    b"getDataStreamAddress" => {
                        Packet::default().string("127.0.0.1").finish(NAT_RESPONSE)
                    }
                    b"getFramerate" => Packet::default().string("120").finish(NAT_RESPONSE),
                    _ => Packet::default().finish(NAT_UNRECOGNIZED_REQUEST),
                }
            }
            _ => continue,
        };
        let _ = socket.send_to(&reply, from);
    }
}

/// Port that was free a moment ago
pub fn free_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}
