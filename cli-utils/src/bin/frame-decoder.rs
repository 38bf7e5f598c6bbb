//! Decode uplink frames captured from the network back into readings.
//!
//! Reads one frame per line (the payload as UTF-8 text, the way the node
//! sends it) and prints the decoded header and readings.

use std::{
    fs,
    io::{self, BufRead},
    path::PathBuf,
    process,
};

use clap::Parser;
use fieldnode_common::payload::decode_delimited;

/// Decode pipe-delimited uplink frames, one per line, from a file or stdin.
#[derive(Parser)]
struct Opts {
    /// File with one frame per line. Reads stdin when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let opts: Opts = Opts::parse();

    let lines: Vec<String> = match &opts.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => text.lines().map(str::to_owned).collect(),
            Err(e) => {
                eprintln!("Could not read {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => io::stdin()
            .lock()
            .lines()
            .collect::<Result<_, _>>()
            .unwrap_or_else(|e| {
                eprintln!("Could not read stdin: {}", e);
                process::exit(1);
            }),
    };

    let mut failures = 0;
    for (lineno, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match decode_delimited(line) {
            Ok(frame) => {
                println!(
                    "{}/{} battery={:.3}V timestamp={}",
                    frame.station_id, frame.device_id, frame.battery_volts, frame.timestamp
                );
                for reading in &frame.readings {
                    let values: Vec<String> =
                        reading.values.iter().map(|v| format!("{}", v)).collect();
                    println!(
                        "  {} (type {}): {}",
                        reading.sensor_id,
                        reading.type_code,
                        values.join(", ")
                    );
                }
            }
            Err(e) => {
                log::warn!("line {}: {}", lineno + 1, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        eprintln!("{} undecodable lines", failures);
        process::exit(1);
    }
}
