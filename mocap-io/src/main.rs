//! mocap-io console
//!
//! Connects to the first reachable NatNet server and prints the scene once
//! per second until Ctrl-C.
//!
//! ```text
//! mocap-io [--config <file>] [host ...]
//! ```

use mocap_io::client::NatNetClient;
use mocap_io::config::ClientConfig;
use mocap_io::error::{Error, Result};
use mocap_io::scene::Scene;
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";

/// Command line arguments
struct Args {
    config_path: Option<String>,
    hosts: Vec<String>,
}

/// Parse command line arguments.
///
/// Supports:
/// - `mocap-io --config <path>` / `mocap-io -c <path>`
/// - any number of positional server hosts, tried in order
fn parse_args() -> Args {
    let mut config_path = None;
    let mut hosts = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            config_path = args.next();
        } else if !arg.starts_with('-') {
            hosts.push(arg);
        }
    }

    if hosts.is_empty() {
        hosts.push(DEFAULT_HOST.to_string());
    }
    Args { config_path, hosts }
}

fn print_scene(scene: &Scene) {
    println!(
        "Frame {} (latency {} ms, {} actor(s), {} device(s))",
        scene.frame_number,
        scene.latency_ms,
        scene.actors.len(),
        scene.devices.len()
    );
    for actor in &scene.actors {
        println!("  Actor {} '{}'", actor.id, actor.name);
        for marker in &actor.markers {
            let state = if marker.tracked { "" } else { " (lost)" };
            println!("    {} {}{}", marker.name, marker.position, state);
        }
        for bone in &actor.bones {
            let parent = actor.parent_of(bone).map_or("---", |p| p.name.as_str());
            println!(
                "    Bone {} '{}': pos {} rot {} parent {}",
                bone.id, bone.name, bone.position, bone.rotation, parent
            );
        }
    }
    for device in &scene.devices {
        println!("  Device {} '{}'", device.id, device.name);
        for channel in &device.channels {
            println!("    {} = {}", channel.name, channel.value);
        }
    }
}

fn main() -> Result<()> {
    let args = parse_args();

    let config = match &args.config_path {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    match &args.config_path {
        Some(path) => log::info!("Using config: {}", path),
        None => log::info!("Using default configuration"),
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let mut client = NatNetClient::new(config);
    for host in &args.hosts {
        log::info!("Attempting to connect to MoCap server at {}", host);
        match client.connect(host) {
            Ok(()) => break,
            Err(e) => log::warn!("{}: {}", host, e),
        }
    }

    if !client.is_connected() {
        log::error!("No MoCap server found");
        return Err(Error::NotConnected);
    }
    println!("Connected to {}", client.server_name());

    while running.load(Ordering::Relaxed) && client.is_connected() {
        if let Err(e) = client.update() {
            log::warn!("Update failed: {}", e);
        }
        print_scene(&client.scene());
        thread::sleep(Duration::from_secs(1));
    }

    client.disconnect();
    log::info!("mocap-io stopped");
    Ok(())
}
