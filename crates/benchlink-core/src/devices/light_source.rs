//! Blackbody light source
//!
//! Power-setting commands are validated by echo (the source mirrors the
//! command bytes back); the temperature query answers with a fixed-width
//! ASCII frame decoded here.

use regex::Regex;

use crate::protocol::{DecodeResult, DecodedValue};

/// Decode the temperature response frame.
///
/// The frame is exactly 15 ASCII characters: `*`, six digits of setpoint,
/// a sign character (`H` above zero, `L` below), six digits of measured
/// temperature, and `#`. Both six-digit fields are thousandths of a degree
/// Celsius; the sign applies to the measured value.
pub(crate) fn decode_temperature(response: &[u8]) -> DecodeResult {
    let text = match std::str::from_utf8(response) {
        Ok(text) => text,
        Err(_) => {
            return DecodeResult::fail(format!(
                "temperature frame is not ASCII: {}",
                hex::encode_upper(response)
            ))
        }
    };

    let frame_re = Regex::new(r"^\*(\d{6})([HL])(\d{6})#$").unwrap();
    let caps = match frame_re.captures(text) {
        Some(caps) => caps,
        None => {
            return DecodeResult::fail(format!(
                "malformed temperature frame: {}",
                hex::encode_upper(response)
            ))
        }
    };

    let setpoint_raw: u32 = caps[1].parse().unwrap_or(0);
    let measured_raw: u32 = caps[3].parse().unwrap_or(0);
    let sign = if &caps[2] == "L" { -1.0 } else { 1.0 };

    DecodeResult::ok_with(DecodedValue::BlackbodyTemperature {
        setpoint_c: f64::from(setpoint_raw) / 1000.0,
        measured_c: sign * f64::from(measured_raw) / 1000.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_positive_reading() {
        let result = decode_temperature(b"*050000H050123#");
        assert!(result.success);
        assert_eq!(
            result.value,
            Some(DecodedValue::BlackbodyTemperature {
                setpoint_c: 50.0,
                measured_c: 50.123,
            })
        );
    }

    #[test]
    fn sign_l_negates_measured_value() {
        let result = decode_temperature(b"*010000L005250#");
        assert!(result.success);
        assert_eq!(
            result.value,
            Some(DecodedValue::BlackbodyTemperature {
                setpoint_c: 10.0,
                measured_c: -5.25,
            })
        );
    }

    #[test]
    fn missing_terminator_fails_with_raw_hex() {
        let result = decode_temperature(b"*050000H050123");
        assert!(!result.success);
        let message = result.error.expect("failure message");
        assert!(message.contains(&hex::encode_upper(b"*050000H050123")));
    }

    #[test]
    fn wrong_sign_character_fails() {
        let result = decode_temperature(b"*050000X050123#");
        assert!(!result.success);
    }

    #[test]
    fn wrong_length_fails() {
        assert!(!decode_temperature(b"*0500H050123#").success);
        assert!(!decode_temperature(b"").success);
    }

    #[test]
    fn non_ascii_frame_fails() {
        let result = decode_temperature(&[0xFF, 0xFE, 0x2A]);
        assert!(!result.success);
        assert!(result.error.expect("failure message").contains("FFFE2A"));
    }
}
