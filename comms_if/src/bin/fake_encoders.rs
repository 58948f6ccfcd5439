//! Fake encoder boards
//!
//! Stands in for the three encoder boards on a real bus: prints every motor command it sees and
//! reports alternating joint angles so the controller's feedback path can be exercised without a
//! robot attached.

use structopt::StructOpt;

#[cfg(target_os = "linux")]
use comms_if::can::{codec, socket::SocketCanTransport, CanId, CanLink, IdProfile, RawFrame};
#[cfg(target_os = "linux")]
use std::{thread, time::Duration};

#[derive(Debug, StructOpt)]
#[structopt(name = "fake_encoders")]
struct Args {
    /// SocketCAN interface to use
    #[structopt(short, long, default_value = "can0")]
    iface: String,

    /// Use 11 bit arbitration IDs instead of 29 bit ones
    #[structopt(long)]
    standard_ids: bool,

    /// Encoder IDs to report from, in axis order
    #[structopt(long, default_value = "1,2,3", use_delimiter = true)]
    encoder_ids: Vec<u32>,

    /// The two angles (rad) to alternate between
    #[structopt(long, default_value = "0.78,1.2", use_delimiter = true)]
    angles_rad: Vec<f64>,

    /// Seconds between reports
    #[structopt(long, default_value = "2")]
    period_s: f64,
}

#[cfg(target_os = "linux")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::from_args();

    let profile = if args.standard_ids {
        IdProfile::Standard
    } else {
        IdProfile::Extended
    };

    let encoder_ids = args
        .encoder_ids
        .iter()
        .map(|id| CanId::new(*id, profile))
        .collect::<Result<Vec<_>, _>>()?;

    if args.angles_rad.is_empty() {
        return Err("At least one angle must be given".into());
    }

    let transport = SocketCanTransport::open(&args.iface)?;

    // Print whatever the controller sends us
    let link = CanLink::open(transport, |frame: RawFrame| {
        match codec::decode_command(&frame.data) {
            Some(cmd) => println!("{} : {:02x?} = {:?}", frame.id, frame.data, cmd),
            None => println!(
                "{} : {:02x?} = {} (raw double)",
                frame.id,
                frame.data,
                codec::decode_feedback(&frame.data)
            ),
        }
    })?;

    println!("Reporting encoders {:?} on {}", encoder_ids, args.iface);

    for angle in args.angles_rad.iter().cycle() {
        thread::sleep(Duration::from_secs_f64(args.period_s));

        let payload = codec::encode_feedback(*angle);
        println!("{:02x?} ({})", payload, angle);

        for id in encoder_ids.iter() {
            match link.send(*id, payload) {
                Ok(()) => println!("Message sent to {}", id),
                Err(e) => println!("Message NOT sent to {}: {}", id, e),
            }
        }

        if link.is_closed() {
            return Err("CAN link closed".into());
        }
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() {
    let _ = Args::from_args();
    eprintln!("fake_encoders requires SocketCAN and only runs on Linux");
}
