//! Transport layer
//!
//! Owns one serial connection per device key and performs the raw
//! write/read half of every exchange. Responses are framed by silence: the
//! instruments send no length or terminator, so the read loop collects
//! bytes until nothing new has arrived for the idle timeout, bounded by the
//! caller's total response timeout.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::channel::{DeviceChannel, SerialChannel};
use super::serial::open_port;
use super::{TransportError, DEFAULT_BAUD_RATE};

/// How long to let residue trickle in after clearing the input buffer
const DRAIN_SETTLE: Duration = Duration::from_millis(20);

/// Poll interval of the response collect loop
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Parity setting for a serial connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityMode {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// Options for opening a device connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Port identifier, e.g. "/dev/ttyUSB0" or "COM3"
    pub port: String,
    /// Baud rate, e.g. 9600 or 115200
    pub baud_rate: u32,
    /// Data bits: 7 or 8
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Stop bits: 1 or 2
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Parity mode
    #[serde(default)]
    pub parity: ParityMode,
    /// Per-read timeout handed to the serial driver, in milliseconds
    #[serde(default = "default_port_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_port_timeout_ms() -> u64 {
    1000
}

impl ConnectOptions {
    /// Options for the common 8N1 configuration
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: ParityMode::None,
            timeout_ms: default_port_timeout_ms(),
        }
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::new("", DEFAULT_BAUD_RATE)
    }
}

struct OpenLink {
    port_name: String,
    channel: Box<dyn DeviceChannel>,
}

impl OpenLink {
    /// Discard stale input left over from earlier timed-out exchanges.
    fn drain_stale(&mut self) -> Result<(), TransportError> {
        self.channel.clear_input_buffer().map_err(io_error)?;
        thread::sleep(DRAIN_SETTLE);

        let mut scratch = [0u8; 256];
        let mut discarded = 0usize;
        while self.channel.bytes_to_read().map_err(io_error)? > 0 {
            match self.channel.read(&mut scratch) {
                Ok(0) => break,
                Ok(n) => discarded += n,
                Err(ref e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock =>
                {
                    break
                }
                Err(e) => return Err(io_error(e)),
            }
        }
        if discarded > 0 {
            debug!(port = %self.port_name, discarded, "discarded stale input bytes");
        }
        Ok(())
    }
}

fn io_error(e: io::Error) -> TransportError {
    TransportError::Io(e.to_string())
}

/// Per-device serial connection manager
#[derive(Default)]
pub struct Transport {
    links: Mutex<HashMap<String, Arc<Mutex<OpenLink>>>>,
}

impl Transport {
    /// Create an empty transport with no connections
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a serial connection for a device key.
    ///
    /// Any existing connection for the same key is closed first; close
    /// errors are ignored, matching the replace-on-reconnect contract.
    pub fn connect(&self, device: &str, options: &ConnectOptions) -> Result<(), TransportError> {
        let port = open_port(options)?;
        self.attach_channel(device, &options.port, Box::new(SerialChannel::new(port)));
        Ok(())
    }

    /// Attach an already-open channel for a device key. Used for links that
    /// are not plain serial ports and for exercising the transport in tests.
    pub fn attach_channel(&self, device: &str, port_name: &str, channel: Box<dyn DeviceChannel>) {
        let link = Arc::new(Mutex::new(OpenLink {
            port_name: port_name.to_string(),
            channel,
        }));
        let replaced = self.lock_links().insert(device.to_string(), link);
        if replaced.is_some() {
            warn!(device, port = port_name, "replaced existing connection");
        } else {
            debug!(device, port = port_name, "connected");
        }
    }

    /// Close and remove a device connection. Unknown devices report
    /// [`TransportError::NotConnected`] rather than panicking.
    pub fn disconnect(&self, device: &str) -> Result<(), TransportError> {
        match self.lock_links().remove(device) {
            Some(_) => {
                debug!(device, "disconnected");
                Ok(())
            }
            None => Err(TransportError::NotConnected(device.to_string())),
        }
    }

    /// Whether a device currently has an open connection
    pub fn is_connected(&self, device: &str) -> bool {
        self.lock_links().contains_key(device)
    }

    /// Port identifier of a connected device
    pub fn port_name(&self, device: &str) -> Option<String> {
        let link = self.lock_links().get(device).cloned()?;
        let name = lock_link(&link).port_name.clone();
        Some(name)
    }

    /// Keys of every connected device, sorted
    pub fn connected_devices(&self) -> Vec<String> {
        let mut devices: Vec<String> = self.lock_links().keys().cloned().collect();
        devices.sort();
        devices
    }

    /// Connection status for each of the given device keys
    pub fn connection_status(&self, devices: &[&str]) -> BTreeMap<String, bool> {
        let links = self.lock_links();
        devices
            .iter()
            .map(|device| (device.to_string(), links.contains_key(*device)))
            .collect()
    }

    /// Open connections for a batch of devices, returning the per-device
    /// result without aborting on the first failure.
    pub fn connect_all(
        &self,
        configs: &[(String, ConnectOptions)],
    ) -> BTreeMap<String, Result<(), TransportError>> {
        configs
            .iter()
            .map(|(device, options)| (device.clone(), self.connect(device, options)))
            .collect()
    }

    /// Close every connection, returning the per-device result.
    pub fn disconnect_all(&self) -> BTreeMap<String, Result<(), TransportError>> {
        self.connected_devices()
            .into_iter()
            .map(|device| {
                let result = self.disconnect(&device);
                (device, result)
            })
            .collect()
    }

    /// Perform one exchange: drain stale input, write the command bytes,
    /// and (when `wait_response` is set) collect the reply.
    ///
    /// An empty result after waiting means the device stayed silent for the
    /// whole `response_timeout`; callers treat that as a timeout, not a
    /// transport fault. The device entry stays locked for the full
    /// exchange, so concurrent sends to one device serialize while other
    /// devices proceed in parallel.
    pub fn exchange(
        &self,
        device: &str,
        bytes: &[u8],
        wait_response: bool,
        response_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let link = self
            .lock_links()
            .get(device)
            .cloned()
            .ok_or_else(|| TransportError::NotConnected(device.to_string()))?;
        let mut link = lock_link(&link);

        link.drain_stale()?;

        link.channel.write_all(bytes).map_err(io_error)?;
        link.channel.flush().map_err(io_error)?;
        debug!(device, tx = %hex::encode_upper(bytes), "command written");

        if !wait_response {
            return Ok(Vec::new());
        }

        let response = collect_response(link.channel.as_mut(), response_timeout, idle_timeout)?;
        debug!(device, rx = %hex::encode_upper(&response), "response collected");
        Ok(response)
    }

    fn lock_links(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<OpenLink>>>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_link(link: &Arc<Mutex<OpenLink>>) -> MutexGuard<'_, OpenLink> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Collect response bytes until the device goes quiet.
///
/// Each iteration reads everything currently available. Once at least one
/// byte has arrived, a pause longer than `idle_timeout` ends the frame; if
/// nothing ever arrives the loop runs out the full `response_timeout` and
/// returns empty.
fn collect_response(
    channel: &mut dyn DeviceChannel,
    response_timeout: Duration,
    idle_timeout: Duration,
) -> Result<Vec<u8>, TransportError> {
    let start = Instant::now();
    let mut last_data = start;
    let mut response = Vec::new();
    let mut buf = [0u8; 512];

    while start.elapsed() < response_timeout {
        let available = channel.bytes_to_read().map_err(io_error)? as usize;

        if available > 0 {
            let to_read = available.min(buf.len());
            match channel.read(&mut buf[..to_read]) {
                Ok(0) => break,
                Ok(n) => {
                    response.extend_from_slice(&buf[..n]);
                    last_data = Instant::now();
                }
                Err(ref e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(io_error(e)),
            }
        } else if !response.is_empty() && last_data.elapsed() > idle_timeout {
            break;
        } else {
            thread::sleep(POLL_INTERVAL);
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    /// Scripted channel: bytes written are recorded, and response chunks
    /// become readable at fixed delays after the first write.
    struct ScriptedChannel {
        written: Arc<Mutex<Vec<u8>>>,
        stale: VecDeque<u8>,
        script: Vec<(Duration, Vec<u8>)>,
        pending: VecDeque<u8>,
        wrote_at: Option<Instant>,
        released: usize,
    }

    impl ScriptedChannel {
        fn new(script: Vec<(Duration, Vec<u8>)>) -> (Self, Arc<Mutex<Vec<u8>>>) {
            let written = Arc::new(Mutex::new(Vec::new()));
            let channel = Self {
                written: Arc::clone(&written),
                stale: VecDeque::new(),
                script,
                pending: VecDeque::new(),
                wrote_at: None,
                released: 0,
            };
            (channel, written)
        }

        fn with_stale(mut self, stale: &[u8]) -> Self {
            self.stale = stale.iter().copied().collect();
            self
        }

        fn release_due(&mut self) {
            if let Some(wrote_at) = self.wrote_at {
                let elapsed = wrote_at.elapsed();
                while self.released < self.script.len() && self.script[self.released].0 <= elapsed {
                    let chunk = self.script[self.released].1.clone();
                    self.pending.extend(chunk);
                    self.released += 1;
                }
            }
        }
    }

    impl Read for ScriptedChannel {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.release_due();
            let mut n = 0;
            while n < buf.len() {
                match self.stale.pop_front().or_else(|| self.pending.pop_front()) {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl Write for ScriptedChannel {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written
                .lock()
                .unwrap()
                .extend_from_slice(buf);
            if self.wrote_at.is_none() {
                self.wrote_at = Some(Instant::now());
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl DeviceChannel for ScriptedChannel {
        fn bytes_to_read(&mut self) -> io::Result<u32> {
            self.release_due();
            Ok((self.stale.len() + self.pending.len()) as u32)
        }

        fn clear_input_buffer(&mut self) -> io::Result<()> {
            self.stale.clear();
            self.pending.clear();
            Ok(())
        }
    }

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn exchange_writes_command_bytes() {
        let transport = Transport::new();
        let (channel, written) = ScriptedChannel::new(vec![]);
        transport.attach_channel("stage", "mock0", Box::new(channel));

        let response = transport
            .exchange("stage", &[0x41, 0x42], false, millis(100), millis(20))
            .expect("exchange succeeds");

        assert_eq!(response, Vec::<u8>::new());
        assert_eq!(*written.lock().unwrap(), vec![0x41, 0x42]);
    }

    #[test]
    fn exchange_unknown_device_is_not_connected() {
        let transport = Transport::new();
        let err = transport
            .exchange("ghost", &[0x00], true, millis(50), millis(10))
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected(_)));
    }

    #[test]
    fn idle_timeout_ends_frame_after_second_chunk() {
        let transport = Transport::new();
        let (channel, _) = ScriptedChannel::new(vec![
            (millis(0), vec![0x01, 0x02]),
            (millis(50), vec![0x03]),
        ]);
        transport.attach_channel("delay_module", "mock0", Box::new(channel));

        let start = Instant::now();
        let response = transport
            .exchange("delay_module", &[0x5A], true, millis(2000), millis(100))
            .expect("exchange succeeds");
        let elapsed = start.elapsed();

        assert_eq!(response, vec![0x01, 0x02, 0x03]);
        // Second chunk at ~50 ms plus the 100 ms idle window; far below the
        // 2 s total bound.
        assert!(elapsed < millis(1000), "took {elapsed:?}");
    }

    #[test]
    fn silent_device_returns_empty_after_timeout() {
        let transport = Transport::new();
        let (channel, _) = ScriptedChannel::new(vec![]);
        transport.attach_channel("stage", "mock0", Box::new(channel));

        let response = transport
            .exchange("stage", b"HOME\r\n", true, millis(80), millis(30))
            .expect("exchange succeeds");
        assert!(response.is_empty());
    }

    #[test]
    fn stale_input_is_drained_before_write() {
        let transport = Transport::new();
        let (channel, _) =
            ScriptedChannel::new(vec![(millis(0), vec![0xAA, 0xBB])]);
        let channel = channel.with_stale(&[0xDE, 0xAD]);
        transport.attach_channel("light_source", "mock0", Box::new(channel));

        let response = transport
            .exchange("light_source", &[0x01], true, millis(500), millis(50))
            .expect("exchange succeeds");

        // Only the scripted reply comes back; the stale bytes are gone.
        assert_eq!(response, vec![0xAA, 0xBB]);
    }

    #[test]
    fn disconnect_unknown_device_is_soft_failure() {
        let transport = Transport::new();
        let err = transport.disconnect("ghost").unwrap_err();
        assert!(matches!(err, TransportError::NotConnected(_)));
    }

    #[test]
    fn connect_replaces_existing_link() {
        let transport = Transport::new();
        let (first, first_written) = ScriptedChannel::new(vec![]);
        let (second, second_written) = ScriptedChannel::new(vec![]);
        transport.attach_channel("stage", "mock0", Box::new(first));
        transport.attach_channel("stage", "mock1", Box::new(second));

        assert_eq!(transport.port_name("stage").as_deref(), Some("mock1"));

        transport
            .exchange("stage", &[0x99], false, millis(50), millis(10))
            .expect("exchange succeeds");
        assert!(first_written.lock().unwrap().is_empty());
        assert_eq!(*second_written.lock().unwrap(), vec![0x99]);
    }

    #[test]
    fn connect_all_reports_per_device_results() {
        let transport = Transport::new();
        let mut bad = ConnectOptions::new("/dev/ttyUSB9", 9600);
        bad.data_bits = 5;
        let configs = vec![("laser".to_string(), bad)];

        let results = transport.connect_all(&configs);
        assert!(matches!(
            results["laser"],
            Err(TransportError::BadOption { .. })
        ));
        assert!(!transport.is_connected("laser"));
    }

    #[test]
    fn status_queries_reflect_connections() {
        let transport = Transport::new();
        let (channel, _) = ScriptedChannel::new(vec![]);
        transport.attach_channel("stage", "mock0", Box::new(channel));

        assert!(transport.is_connected("stage"));
        assert!(!transport.is_connected("light_source"));
        assert_eq!(transport.connected_devices(), vec!["stage".to_string()]);

        let status = transport.connection_status(&["stage", "light_source"]);
        assert_eq!(status["stage"], true);
        assert_eq!(status["light_source"], false);

        let results = transport.disconnect_all();
        assert!(results["stage"].is_ok());
        assert!(!transport.is_connected("stage"));
    }
}
