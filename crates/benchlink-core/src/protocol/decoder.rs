//! Response decoding
//!
//! Structured outcome of validating one response frame. Only (device,
//! command) pairs with a registered validator ever produce a
//! [`DecodeResult`]; everything else passes through unvalidated.

use serde::{Deserialize, Serialize};

/// Decoder-specific payload extracted from a valid response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecodedValue {
    /// Blackbody temperature reading from the light source
    BlackbodyTemperature {
        /// Setpoint in degrees Celsius
        setpoint_c: f64,
        /// Measured temperature in degrees Celsius
        measured_c: f64,
    },
}

/// Outcome of running a response validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeResult {
    /// Whether the response passed validation
    pub success: bool,
    /// Human-readable failure description
    pub error: Option<String>,
    /// Structured payload, when the validator extracts one
    pub value: Option<DecodedValue>,
}

impl DecodeResult {
    /// Successful validation with no extracted payload
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            value: None,
        }
    }

    /// Successful validation carrying a decoded payload
    pub fn ok_with(value: DecodedValue) -> Self {
        Self {
            success: true,
            error: None,
            value: Some(value),
        }
    }

    /// Failed validation
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            value: None,
        }
    }
}
