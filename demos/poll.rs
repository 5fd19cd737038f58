use std::{env, thread, time::Duration};

use hpma115_serial::transport::{SerialTransport, StdClock};
use hpma115_serial::Hpma115c0;

const PORT_NAME: &'static str = "/dev/ttyUSB0";

fn main() {
    let port_name = env::args().nth(1).unwrap_or_else(|| PORT_NAME.to_string());

    let transport = match SerialTransport::open(&port_name) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("Failed to open \"{}\". Error: {}", port_name, e);
            ::std::process::exit(1);
        }
    };

    let mut sensor = Hpma115c0::new(transport, StdClock::new());
    if let Err(e) = sensor.init() {
        eprintln!("Failed to initialize sensor: {}", e);
        ::std::process::exit(1);
    }

    match sensor.read_adjustment_coefficient() {
        Ok(coefficient) => println!("adjustment coefficient = {}", coefficient),
        Err(e) => eprintln!("Error while reading adjustment coefficient = {}", e),
    }

    loop {
        match sensor.read_particle_measurement() {
            Ok(measurement) => println!("{}", measurement),
            Err(e) => eprintln!("Error while reading measurement = {}", e),
        }
        thread::sleep(Duration::from_secs(1));
    }
}
