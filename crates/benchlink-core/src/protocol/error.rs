//! Protocol errors

use thiserror::Error;

use crate::catalog::CatalogError;

/// Errors that can occur while turning a template into command bytes
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error("parameter '{name}' has the wrong type: expected {expected}")]
    WrongType {
        /// Parameter name as written in the template
        name: String,
        /// Human-readable description of the accepted kind
        expected: &'static str,
    },

    #[error("parameter '{name}' out of range: {message}")]
    OutOfRange {
        /// Parameter name as written in the template
        name: String,
        /// What the valid range is
        message: String,
    },

    #[error("template render failed: {0}")]
    Render(String),

    #[error("invalid hex template body '{body}': {message}")]
    InvalidHex {
        /// Rendered template body that failed to parse
        body: String,
        /// Underlying hex parse error
        message: String,
    },

    #[error("no dynamic encoder registered for '{device}/{command}'")]
    UnknownDynamic {
        /// Device key
        device: String,
        /// Command name
        command: String,
    },
}

/// Errors that can occur at the serial transport layer
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("device '{0}' is not connected")]
    NotConnected(String),

    #[error("failed to open serial port '{port}': {message}")]
    OpenFailed {
        /// Port identifier, e.g. "/dev/ttyUSB0" or "COM3"
        port: String,
        /// Underlying serial error
        message: String,
    },

    #[error("unsupported {field} value: {value}")]
    BadOption {
        /// Which connect option was rejected
        field: &'static str,
        /// The offending value
        value: String,
    },

    #[error("serial I/O error: {0}")]
    Io(String),
}

/// Any failure of a single send/receive exchange.
///
/// The protocol engine never lets these cross the public boundary as
/// `Err`; they are folded into the structured [`SendOutcome`] so the
/// caller always receives a result it can inspect.
///
/// [`SendOutcome`]: super::SendOutcome
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("unknown command '{command}' for device '{device}'")]
    UnknownCommand {
        /// Device key
        device: String,
        /// Command name
        command: String,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("command encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
