//! Command templates
//!
//! A template describes how one named command for one device turns into
//! bytes. The catalog file stores templates as plain strings whose first
//! character selects the kind; parsing happens once, at load time, so the
//! rest of the engine dispatches on a closed enum instead of sniffing
//! prefixes.

use serde::{Deserialize, Serialize};

/// How a template body is turned into bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateKind {
    /// `f` prefix: body is a text template with `{name}` placeholders,
    /// rendered then encoded as UTF-8
    TextFormat,

    /// `h` prefix: body is rendered like a text template, then parsed as a
    /// hexadecimal digit string into raw bytes
    HexFormat,

    /// No prefix: body is encoded as UTF-8 verbatim
    RawText,

    /// Literal `"dynamic"`: the (device, command) pair selects a registered
    /// binary encoder instead of a template body
    Dynamic,
}

/// One loaded command template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    /// Device key the template belongs to
    pub device: String,
    /// Command name
    pub name: String,
    /// Template kind
    pub kind: TemplateKind,
    /// Template body with the prefix marker stripped; empty for Dynamic
    pub body: String,
}

impl CommandTemplate {
    /// Parse a stored template string into its kind and body.
    pub fn parse(device: &str, name: &str, raw: &str) -> Self {
        let (kind, body) = if raw == "dynamic" {
            (TemplateKind::Dynamic, String::new())
        } else if let Some(body) = raw.strip_prefix('f') {
            (TemplateKind::TextFormat, body.to_string())
        } else if let Some(body) = raw.strip_prefix('h') {
            (TemplateKind::HexFormat, body.to_string())
        } else {
            (TemplateKind::RawText, raw.to_string())
        };

        Self {
            device: device.to_string(),
            name: name.to_string(),
            kind,
            body,
        }
    }
}
