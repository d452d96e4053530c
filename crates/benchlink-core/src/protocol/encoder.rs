//! Command Encoder
//!
//! Turns a [`CommandTemplate`] plus caller-supplied named parameters into
//! the byte sequence that goes on the wire. Dispatch is exhaustive over
//! [`TemplateKind`]; every call produces a fresh buffer and never mutates
//! the template.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strfmt::{strfmt, DisplayStr, FmtError, Formatter};

use crate::catalog::{CommandTemplate, TemplateKind};
use crate::devices::CodecRegistry;

use super::EncodeError;

/// One caller-supplied parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer parameter
    Int(i64),
    /// Floating-point parameter
    Float(f64),
    /// Boolean parameter
    Bool(bool),
    /// Text parameter
    Text(String),
}

impl DisplayStr for ParamValue {
    fn display_str(&self, f: &mut Formatter) -> strfmt::Result<()> {
        match self {
            ParamValue::Int(v) => f.i64(*v),
            ParamValue::Float(v) => f.f64(*v),
            ParamValue::Bool(v) => f.str(if *v { "true" } else { "false" }),
            ParamValue::Text(s) => f.str(s),
        }
    }
}

impl ParamValue {
    /// Integer view of the value, if it is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Named parameters for one send call
pub type Params = HashMap<String, ParamValue>;

/// Encode a template into command bytes.
pub fn encode(
    template: &CommandTemplate,
    params: &Params,
    codecs: &CodecRegistry,
) -> Result<Vec<u8>, EncodeError> {
    match template.kind {
        TemplateKind::TextFormat => {
            let rendered = render(&template.body, params)?;
            Ok(rendered.into_bytes())
        }
        TemplateKind::HexFormat => {
            let rendered = render(&template.body, params)?;
            hex::decode(&rendered).map_err(|e| EncodeError::InvalidHex {
                body: rendered,
                message: e.to_string(),
            })
        }
        TemplateKind::RawText => Ok(template.body.clone().into_bytes()),
        TemplateKind::Dynamic => match codecs.encoder(&template.device, &template.name) {
            Some(encoder) => encoder.encode(params),
            None => Err(EncodeError::UnknownDynamic {
                device: template.device.clone(),
                command: template.name.clone(),
            }),
        },
    }
}

/// Render `{name}` placeholders against the parameter map.
fn render(body: &str, params: &Params) -> Result<String, EncodeError> {
    strfmt(body, params).map_err(|e| match e {
        FmtError::KeyError(message) => EncodeError::MissingParameter(message),
        other => EncodeError::Render(other.to_string()),
    })
}
