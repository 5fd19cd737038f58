use std::convert::TryFrom;
use std::env;

use hpma115_serial::frame::{reader::FrameReader, Command, MAX_PAYLOAD_LENGTH};
use hpma115_serial::mock::{MockClock, MockTransport};
use hpma115_serial::Measurement;

// enough for a full response with some leading noise
const MAX_INPUT_LENGTH: usize = 64;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        return Err("Provide 1 argument: hex encoded response, e.g. 400210644a".into());
    }

    let hex = args.pop().expect("No hex argument");
    let hex = hex.trim().trim_start_matches("0x").replace(' ', "");

    if hex.len() > 2 * MAX_INPUT_LENGTH {
        return Err(format!("at most {} bytes can be decoded", MAX_INPUT_LENGTH).into());
    }

    let mut bytes = [0u8; MAX_INPUT_LENGTH];
    let len = base16::decode_slice(hex.as_bytes(), &mut bytes[..])
        .map_err(|e| format!("could not decode hex: {:?}", e))?;

    let mut transport = MockTransport::<MAX_INPUT_LENGTH>::new();
    transport.push_rx(&bytes[..len])?;
    let mut clock = MockClock::default();

    let frame =
        FrameReader::default().read_frame(&mut transport, &mut clock, MAX_PAYLOAD_LENGTH)?;
    let command = Command::try_from(frame.command())?;
    println!(
        "frame: len={} command={} ({:#04x}) payload={:02x?} checksum={:#04x}",
        frame.length(),
        command,
        frame.command(),
        frame.payload(),
        frame.checksum()
    );

    let payload = frame.validate(command)?;
    match command {
        Command::ReadMeasurement => println!("{}", Measurement::try_from(payload)?),
        Command::ReadAdjustmentCoefficient if payload.len() == 1 => {
            println!("adjustment coefficient: {}", payload[0])
        }
        _ => println!("valid response, no known payload layout"),
    }
    Ok(())
}
