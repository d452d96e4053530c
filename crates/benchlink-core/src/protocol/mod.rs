//! Serial Protocol Communication
//!
//! Translates named logical commands into device-specific byte sequences,
//! writes them over per-device serial connections, and validates the
//! acknowledgements the instruments send back.

pub mod channel;
pub mod decoder;
pub mod encoder;
mod engine;
mod error;
pub mod serial;
mod transport;

pub use channel::{DeviceChannel, SerialChannel};
pub use decoder::{DecodeResult, DecodedValue};
pub use encoder::{ParamValue, Params};
pub use engine::{ProtocolEngine, SendOutcome};
pub use error::{EncodeError, ProtocolError, TransportError};
pub use transport::{ConnectOptions, ParityMode, Transport};

/// Default baud rate for instrument links
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default total response timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Default idle timeout in milliseconds. The instruments have no frame
/// length or terminator, so a pause in the byte stream is the only
/// end-of-frame signal.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 100;
