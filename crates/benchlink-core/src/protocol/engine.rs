//! Protocol engine
//!
//! Ties the catalog, encoder, transport, and validators together into the
//! single `send` operation the hosting application calls. Every failure
//! mode is folded into the returned [`SendOutcome`]; nothing on this
//! boundary panics or raises.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::catalog::{CatalogError, CommandCatalog};
use crate::config::SerialSettings;
use crate::devices::CodecRegistry;

use super::decoder::DecodeResult;
use super::encoder::{self, Params};
use super::error::ProtocolError;
use super::transport::Transport;

/// Result of one send/receive exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendOutcome {
    /// Overall success of the exchange, including validation
    pub success: bool,
    /// Human-readable status or failure description
    pub message: String,
    /// Raw response bytes; empty when no response was awaited or the
    /// device stayed silent
    pub response: Vec<u8>,
    /// Validator outcome, present only for (device, command) pairs with a
    /// registered validator
    pub decode: Option<DecodeResult>,
    /// Wall-clock time the exchange took, in milliseconds
    pub elapsed_ms: u64,
}

impl SendOutcome {
    fn failure(message: String, started: Instant) -> Self {
        Self {
            success: false,
            message,
            response: Vec::new(),
            decode: None,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// The command protocol engine
pub struct ProtocolEngine {
    catalog: CommandCatalog,
    transport: Arc<Transport>,
    codecs: CodecRegistry,
    settings: SerialSettings,
}

impl ProtocolEngine {
    /// Build an engine from its collaborators. Settings are injected here;
    /// the engine holds no hidden global state.
    pub fn new(
        catalog: CommandCatalog,
        transport: Arc<Transport>,
        codecs: CodecRegistry,
        settings: SerialSettings,
    ) -> Self {
        Self {
            catalog,
            transport,
            codecs,
            settings,
        }
    }

    /// Shared transport, for connection management by the host application
    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// The command catalog backing this engine
    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    /// Every known command name per device
    pub fn list_commands(&self) -> Result<BTreeMap<String, Vec<String>>, CatalogError> {
        self.catalog.list_commands()
    }

    /// Send a named command to a device.
    ///
    /// Looks up the template, encodes it with `params`, writes the bytes,
    /// and optionally waits for and validates the response. `timeout`
    /// bounds the total response wait; `None` uses the configured default.
    /// In debug mode the response wait is skipped regardless of
    /// `wait_response` and no validator runs.
    pub fn send(
        &self,
        device: &str,
        command: &str,
        params: &Params,
        wait_response: bool,
        timeout: Option<Duration>,
    ) -> SendOutcome {
        let started = Instant::now();

        let bytes = match self.compile(device, command, params) {
            Err(e) => return SendOutcome::failure(e.to_string(), started),
            Ok(bytes) => bytes,
        };

        let wait = wait_response && !self.settings.debug_mode;
        let response_timeout = timeout.unwrap_or_else(|| self.settings.default_timeout());
        let idle_timeout = self.settings.idle_timeout();

        debug!(device, command, wait, "sending command");

        let response = match self
            .transport
            .exchange(device, &bytes, wait, response_timeout, idle_timeout)
            .map_err(ProtocolError::from)
        {
            Err(e) => return SendOutcome::failure(e.to_string(), started),
            Ok(response) => response,
        };

        let mut success = true;
        let mut message = String::from("command sent");
        if self.settings.debug_mode {
            message.push_str(" (debug mode: response wait skipped)");
        }

        let mut decode = None;
        if wait {
            if let Some(validator) = self.codecs.validator(device, command) {
                let result = validator.validate(&bytes, &response);
                if !result.success {
                    success = false;
                    message = result
                        .error
                        .clone()
                        .unwrap_or_else(|| String::from("response validation failed"));
                }
                decode = Some(result);
            }
        }

        SendOutcome {
            success,
            message,
            response,
            decode,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Look up the template and encode it, without touching the transport.
    fn compile(
        &self,
        device: &str,
        command: &str,
        params: &Params,
    ) -> Result<Vec<u8>, ProtocolError> {
        let template = self.catalog.lookup(device, command)?.ok_or_else(|| {
            ProtocolError::UnknownCommand {
                device: device.to_string(),
                command: command.to_string(),
            }
        })?;
        Ok(encoder::encode(&template, params, &self.codecs)?)
    }
}
