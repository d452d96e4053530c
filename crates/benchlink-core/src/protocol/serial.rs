//! Serial port handling
//!
//! Provides low-level serial port access for instrument communication.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::time::Duration;

use super::transport::{ConnectOptions, ParityMode};
use super::TransportError;

/// Open a serial port with the given connect options
pub fn open_port(options: &ConnectOptions) -> Result<Box<dyn SerialPort>, TransportError> {
    let data_bits = match options.data_bits {
        7 => DataBits::Seven,
        8 => DataBits::Eight,
        other => {
            return Err(TransportError::BadOption {
                field: "data_bits",
                value: other.to_string(),
            })
        }
    };

    let stop_bits = match options.stop_bits {
        1 => StopBits::One,
        2 => StopBits::Two,
        other => {
            return Err(TransportError::BadOption {
                field: "stop_bits",
                value: other.to_string(),
            })
        }
    };

    let parity = match options.parity {
        ParityMode::None => Parity::None,
        ParityMode::Even => Parity::Even,
        ParityMode::Odd => Parity::Odd,
    };

    serialport::new(&options.port, options.baud_rate)
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(options.timeout_ms))
        .open()
        .map_err(|e| TransportError::OpenFailed {
            port: options.port.clone(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_data_bits() {
        let mut options = ConnectOptions::new("/dev/null", 9600);
        options.data_bits = 5;
        let err = open_port(&options).unwrap_err();
        assert!(matches!(
            err,
            TransportError::BadOption {
                field: "data_bits",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unsupported_stop_bits() {
        let mut options = ConnectOptions::new("/dev/null", 9600);
        options.stop_bits = 3;
        let err = open_port(&options).unwrap_err();
        assert!(matches!(
            err,
            TransportError::BadOption {
                field: "stop_bits",
                ..
            }
        ));
    }
}
