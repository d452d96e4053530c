//! Programmable delay module
//!
//! The module speaks 5-byte binary frames: a `5A AB` header, two payload
//! bytes, and a one-byte checksum of `AB + payload` modulo 256. Commands
//! are acknowledged with fixed frames following the same discipline.

use byteorder::{BigEndian, ByteOrder};

use crate::protocol::encoder::Params;
use crate::protocol::EncodeError;

/// Frame start marker
pub const FRAME_MARKER: u8 = 0x5A;

/// Module address byte, also the checksum seed
pub const FRAME_ADDRESS: u8 = 0xAB;

/// Smallest accepted delay, in microseconds
pub const SET_DELAY_MIN_US: i64 = 1;

/// Largest accepted delay, in microseconds
pub const SET_DELAY_MAX_US: i64 = 200;

/// Timer tick length in nanoseconds
const TICK_NS: i64 = 20;

/// Acknowledgement for `open_channel`
pub const ACK_OPEN: [u8; 5] = ack(0x01, 0x01);

/// Acknowledgement for `close_channel`
pub const ACK_CLOSE: [u8; 5] = ack(0x01, 0x00);

/// Acknowledgement for `increment_delay`
pub const ACK_INCREMENT: [u8; 5] = ack(0x02, 0x01);

/// Acknowledgement for `set_delay`
pub const ACK_SET_DELAY: [u8; 5] = ack(0x00, 0x00);

const fn checksum(b2: u8, b3: u8) -> u8 {
    (FRAME_ADDRESS as u16 + b2 as u16 + b3 as u16) as u8
}

const fn ack(b2: u8, b3: u8) -> [u8; 5] {
    [FRAME_MARKER, FRAME_ADDRESS, b2, b3, checksum(b2, b3)]
}

/// Encode the "set delay time" frame.
///
/// The `micros` parameter is converted to nanoseconds and divided by the
/// 20 ns tick into a 16-bit value whose high/low bytes fill the payload.
pub(crate) fn encode_set_delay(params: &Params) -> Result<Vec<u8>, EncodeError> {
    let micros = params
        .get("micros")
        .ok_or_else(|| EncodeError::MissingParameter("micros".to_string()))?
        .as_i64()
        .ok_or(EncodeError::WrongType {
            name: "micros".to_string(),
            expected: "integer microseconds",
        })?;

    if !(SET_DELAY_MIN_US..=SET_DELAY_MAX_US).contains(&micros) {
        return Err(EncodeError::OutOfRange {
            name: "micros".to_string(),
            message: format!(
                "{micros} not in {SET_DELAY_MIN_US}..={SET_DELAY_MAX_US} microseconds"
            ),
        });
    }

    let ticks = (micros * 1000 / TICK_NS) as u16;
    let mut payload = [0u8; 2];
    BigEndian::write_u16(&mut payload, ticks);

    Ok(vec![
        FRAME_MARKER,
        FRAME_ADDRESS,
        payload[0],
        payload[1],
        checksum(payload[0], payload[1]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ParamValue;
    use pretty_assertions::assert_eq;

    fn micros(value: i64) -> Params {
        [("micros".to_string(), ParamValue::Int(value))]
            .into_iter()
            .collect()
    }

    #[test]
    fn encodes_100_microseconds() {
        // 100 us -> 100_000 ns -> 5000 ticks -> 0x1388,
        // checksum 0xAB + 0x13 + 0x88 = 0x146 -> 0x46
        let frame = encode_set_delay(&micros(100)).expect("in range");
        assert_eq!(frame, vec![0x5A, 0xAB, 0x13, 0x88, 0x46]);
    }

    #[test]
    fn encodes_range_endpoints() {
        // 1 us -> 50 ticks
        assert_eq!(
            encode_set_delay(&micros(1)).expect("in range"),
            vec![0x5A, 0xAB, 0x00, 0x32, checksum(0x00, 0x32)]
        );
        // 200 us -> 10_000 ticks -> 0x2710
        assert_eq!(
            encode_set_delay(&micros(200)).expect("in range"),
            vec![0x5A, 0xAB, 0x27, 0x10, checksum(0x27, 0x10)]
        );
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            encode_set_delay(&micros(0)),
            Err(EncodeError::OutOfRange { .. })
        ));
        assert!(matches!(
            encode_set_delay(&micros(201)),
            Err(EncodeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_missing_or_mistyped_parameter() {
        assert!(matches!(
            encode_set_delay(&Params::new()),
            Err(EncodeError::MissingParameter(_))
        ));

        let text: Params = [(
            "micros".to_string(),
            ParamValue::Text("fast".to_string()),
        )]
        .into_iter()
        .collect();
        assert!(matches!(
            encode_set_delay(&text),
            Err(EncodeError::WrongType { .. })
        ));
    }

    #[test]
    fn acknowledgements_carry_valid_checksums() {
        for ack in [ACK_OPEN, ACK_CLOSE, ACK_INCREMENT, ACK_SET_DELAY] {
            assert_eq!(ack[0], FRAME_MARKER);
            assert_eq!(ack[1], FRAME_ADDRESS);
            assert_eq!(ack[4], checksum(ack[2], ack[3]));
        }
    }
}
