//! Talks to a simulated sensor living in memory.
//!
//! Run with:
//!   cargo run --example sensor-loopback
//!
//! The simulated sensor answers `0xD0` (device information) with its product
//! name, `0x03` (read measured values) with two big-endian floats, and
//! reports error code 0x02 for anything else.

use bytes::BytesMut;
use shdlc::frame::{
    decode_frame, encode_response, ArgumentWriter, FrameReader, Request, RequestStream,
};
use shdlc::transport::{Loopback, ReadChannel, Result as TransportResult, WriteChannel};

const DEVICE_INFO: u8 = 0xD0;
const READ_VALUES: u8 = 0x03;
const UNKNOWN_COMMAND: u8 = 0x02;

#[derive(Default)]
struct SimulatedSensor {
    received: BytesMut,
    outgoing: Loopback,
}

impl SimulatedSensor {
    fn answer(&mut self, request: &Request) -> Result<(), Box<dyn std::error::Error>> {
        let (state, data) = match request.command {
            DEVICE_INFO => (0x00, b"SPS30\0".to_vec()),
            READ_VALUES => {
                let mut values = Vec::new();
                values.extend_from_slice(&21.5f32.to_be_bytes());
                values.extend_from_slice(&45.25f32.to_be_bytes());
                (0x00, values)
            }
            _ => (UNKNOWN_COMMAND, Vec::new()),
        };
        let mut wire = BytesMut::new();
        encode_response(request.address, request.command, state, &data, &mut wire)?;
        self.outgoing.push(&wire);
        Ok(())
    }
}

impl WriteChannel for SimulatedSensor {
    fn write(&mut self, buf: &[u8]) -> TransportResult<usize> {
        self.received.extend_from_slice(buf);
        if let Ok(Some(content)) = decode_frame(&mut self.received) {
            if let Ok(request) = Request::from_content(&content) {
                if let Err(err) = self.answer(&request) {
                    eprintln!("sensor could not answer: {err}");
                }
            }
        }
        Ok(buf.len())
    }
}

impl ReadChannel for SimulatedSensor {
    fn read(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        self.outgoing.read(buf)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut link = FrameReader::new(SimulatedSensor::default());

    let mut info = RequestStream::begin(DEVICE_INFO, 0x00, 1);
    info.add_u8(0x01)?;
    let response = link.transceive(&info, 32, 100)?;
    let name = String::from_utf8_lossy(&response.payload);
    println!("product name: {}", name.trim_end_matches('\0'));

    let read = RequestStream::begin(READ_VALUES, 0x00, 0);
    let response = link.transceive(&read, 8, 100)?;
    let mut values = response.arguments();
    println!("temperature: {:.2}", values.get_float()?);
    println!("humidity: {:.2}", values.get_float()?);

    let unknown = RequestStream::begin(0x7E, 0x00, 0);
    match link.transceive(&unknown, 0, 100) {
        Ok(_) => println!("unexpected success"),
        Err(err) => println!(
            "command 0x7E rejected: {err} (sensor code {:?})",
            err.sensor_error_code()
        ),
    }

    Ok(())
}
