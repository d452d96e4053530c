//! # Benchlink Core Library
//!
//! Core functionality for the benchlink laboratory instrument controller.

#![warn(missing_docs)]

//!
//! This library provides:
//! - A JSON command catalog mapping device keys to named command templates
//! - A template-driven command encoder (text, hex, raw, and per-device
//!   binary encoders)
//! - Serial transport with idle-timeout response framing
//! - Per-device response validation (echo checks, fixed acknowledgements,
//!   structured ASCII frames)
//!
//! ## Supported instruments
//!
//! - Blackbody light sources
//! - Programmable delay modules
//! - Motorized stages (and any device reachable through a text or hex
//!   command template)
//!
//! ## Example
//!
//! ```rust,ignore
//! use benchlink_core::prelude::*;
//! use std::sync::Arc;
//!
//! let transport = Arc::new(Transport::new());
//! transport.connect("delay_module", &ConnectOptions::new("/dev/ttyUSB0", 9600))?;
//!
//! let engine = ProtocolEngine::new(
//!     CommandCatalog::new("configs/commands.json"),
//!     transport,
//!     CodecRegistry::with_builtin_devices(),
//!     SerialSettings::default(),
//! );
//!
//! let outcome = engine.send("delay_module", "set_delay", &params, true, None);
//! println!("{}: {}", outcome.success, outcome.message);
//! ```

pub mod catalog;
pub mod config;
pub mod devices;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{CommandCatalog, CommandTemplate, TemplateKind};
    pub use crate::config::SerialSettings;
    pub use crate::devices::{CodecRegistry, DynamicEncoder, ResponseValidator};
    pub use crate::protocol::{
        ConnectOptions, DecodeResult, DecodedValue, ParamValue, ProtocolEngine, ProtocolError,
        SendOutcome, Transport, TransportError,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
