//! Per-device codecs
//!
//! Some instruments speak binary frames that no text or hex template can
//! express, and some acknowledge commands in ways that deserve checking.
//! Both concerns are registered here as explicit (device, command) entries
//! so dispatch is a map lookup over closed enums rather than runtime name
//! resolution.

pub mod delay;
pub mod light_source;

use std::collections::HashMap;

use crate::protocol::encoder::Params;
use crate::protocol::{DecodeResult, EncodeError};

/// Device key of the blackbody light source
pub const LIGHT_SOURCE: &str = "light_source";

/// Device key of the programmable delay module
pub const DELAY_MODULE: &str = "delay_module";

/// Registered binary encoder for a Dynamic template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicEncoder {
    /// Delay-module "set delay time" frame (`5A AB hi lo ck`)
    DelaySetTime,
}

impl DynamicEncoder {
    /// Encode the command frame from named parameters.
    pub fn encode(&self, params: &Params) -> Result<Vec<u8>, EncodeError> {
        match self {
            DynamicEncoder::DelaySetTime => delay::encode_set_delay(params),
        }
    }
}

/// Registered validator for a (device, command) response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseValidator {
    /// Device mirrors the command bytes back verbatim
    Echo,
    /// Device answers with a constant acknowledgement frame
    FixedAck(&'static [u8; 5]),
    /// Structured ASCII temperature frame from the blackbody source
    BlackbodyTemperature,
}

impl ResponseValidator {
    /// Validate a raw response against the bytes that were sent.
    pub fn validate(&self, sent: &[u8], response: &[u8]) -> DecodeResult {
        match self {
            ResponseValidator::Echo => {
                if response == sent {
                    DecodeResult::ok()
                } else {
                    DecodeResult::fail(format!(
                        "echo mismatch: sent {}, received {}",
                        hex::encode_upper(sent),
                        hex::encode_upper(response)
                    ))
                }
            }
            ResponseValidator::FixedAck(expected) => {
                if response == &expected[..] {
                    DecodeResult::ok()
                } else {
                    DecodeResult::fail(format!(
                        "unexpected acknowledgement: expected {}, received {}",
                        hex::encode_upper(&expected[..]),
                        hex::encode_upper(response)
                    ))
                }
            }
            ResponseValidator::BlackbodyTemperature => light_source::decode_temperature(response),
        }
    }
}

type CodecKey = (String, String);

/// Registry of dynamic encoders and response validators, keyed by
/// (device, command)
#[derive(Default)]
pub struct CodecRegistry {
    encoders: HashMap<CodecKey, DynamicEncoder>,
    validators: HashMap<CodecKey, ResponseValidator>,
}

impl CodecRegistry {
    /// Empty registry: every command encodes through its template and no
    /// response is validated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the codecs of the instruments on the bench:
    /// the light source and the delay module. All other devices pass
    /// through unvalidated.
    pub fn with_builtin_devices() -> Self {
        let mut registry = Self::new();

        registry.register_encoder(DELAY_MODULE, "set_delay", DynamicEncoder::DelaySetTime);

        registry.register_validator(LIGHT_SOURCE, "set_power", ResponseValidator::Echo);
        registry.register_validator(
            LIGHT_SOURCE,
            "read_temperature",
            ResponseValidator::BlackbodyTemperature,
        );

        registry.register_validator(
            DELAY_MODULE,
            "open_channel",
            ResponseValidator::FixedAck(&delay::ACK_OPEN),
        );
        registry.register_validator(
            DELAY_MODULE,
            "close_channel",
            ResponseValidator::FixedAck(&delay::ACK_CLOSE),
        );
        registry.register_validator(
            DELAY_MODULE,
            "increment_delay",
            ResponseValidator::FixedAck(&delay::ACK_INCREMENT),
        );
        registry.register_validator(
            DELAY_MODULE,
            "set_delay",
            ResponseValidator::FixedAck(&delay::ACK_SET_DELAY),
        );

        registry
    }

    /// Register a dynamic encoder for a (device, command) pair.
    pub fn register_encoder(&mut self, device: &str, command: &str, encoder: DynamicEncoder) {
        self.encoders
            .insert((device.to_string(), command.to_string()), encoder);
    }

    /// Register a response validator for a (device, command) pair.
    pub fn register_validator(&mut self, device: &str, command: &str, validator: ResponseValidator) {
        self.validators
            .insert((device.to_string(), command.to_string()), validator);
    }

    /// Encoder registered for a pair, if any
    pub fn encoder(&self, device: &str, command: &str) -> Option<&DynamicEncoder> {
        self.encoders
            .get(&(device.to_string(), command.to_string()))
    }

    /// Validator registered for a pair, if any
    pub fn validator(&self, device: &str, command: &str) -> Option<&ResponseValidator> {
        self.validators
            .get(&(device.to_string(), command.to_string()))
    }
}
