use std::thread;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::Subcommand;
use log::{debug, info};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use vedirect_core::{Frame, FrameReader, ReaderSource};

use crate::CliError;

const DEFAULT_BAUD_RATE: u32 = 19_200;
const DEFAULT_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_MAX_IDLE_READS: u32 = 10;
const IDLE_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Subcommand, Debug)]
pub enum SerialCommands {
    /// Read frames from a serial port and print one JSON object per line.
    #[command(
        after_help = "Examples:\n  vedirect serial monitor /dev/ttyUSB0\n  vedirect serial monitor COM3 --count 5"
    )]
    Monitor {
        /// Serial port the device is connected to
        #[arg(default_value = "/dev/ttyUSB0")]
        port: String,

        /// Line speed (VE.Direct text mode runs at 19200 baud)
        #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
        baud: u32,

        /// Read timeout in milliseconds before a quiet link is polled again
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
        timeout_ms: u64,

        /// Stop after this many frames
        #[arg(long)]
        count: Option<u64>,

        /// Give up after this many read attempts in a row deliver no bytes
        #[arg(long, default_value_t = DEFAULT_MAX_IDLE_READS)]
        max_idle_reads: u32,
    },
}

#[derive(Serialize)]
struct FrameLine<'a> {
    received_at: String,
    fields: &'a Frame,
}

pub fn run(command: SerialCommands) -> Result<(), CliError> {
    match command {
        SerialCommands::Monitor {
            port,
            baud,
            timeout_ms,
            count,
            max_idle_reads,
        } => monitor(&port, baud, timeout_ms, count, max_idle_reads),
    }
}

/// Counts consecutive read attempts that consumed no bytes.
///
/// A timed-out port and an unplugged one that keeps returning zero-length
/// reads both show up here as an offset that stops moving.
struct IdleReads {
    last_offset: u64,
    idle: u32,
    limit: u32,
}

impl IdleReads {
    fn new(limit: u32) -> Self {
        Self {
            last_offset: 0,
            idle: 0,
            limit,
        }
    }

    /// Records the reader offset after an attempt; true once the limit is hit.
    fn observe(&mut self, offset: u64) -> bool {
        if offset != self.last_offset {
            self.last_offset = offset;
            self.idle = 0;
            return false;
        }
        self.idle += 1;
        self.idle >= self.limit
    }
}

fn monitor(
    port_name: &str,
    baud: u32,
    timeout_ms: u64,
    count: Option<u64>,
    max_idle_reads: u32,
) -> Result<(), CliError> {
    info!("opening {} at {} baud", port_name, baud);
    let port = serialport::new(port_name, baud)
        .timeout(Duration::from_millis(timeout_ms))
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .open()
        .map_err(|err| {
            CliError::new(
                format!("failed to open serial port {}: {}", port_name, err),
                Some("check the port name and that no other process holds it".to_string()),
            )
        })?;

    let mut reader = FrameReader::new(ReaderSource::new(port));
    let mut printed = 0u64;
    let max_idle_reads = max_idle_reads.max(1);
    let mut idle = IdleReads::new(max_idle_reads);
    while count.is_none_or(|limit| printed < limit) {
        let frame = reader
            .next_frame()
            .with_context(|| format!("failed reading from {}", port_name))?;
        let Some(frame) = frame else {
            debug!(
                "no frame within {} ms (checksum failures so far: {})",
                timeout_ms,
                reader.decoder().stats().checksum_failures
            );
            if idle.observe(reader.offset()) {
                return Err(CliError::new(
                    format!(
                        "serial port {} delivered no data in {} consecutive reads",
                        port_name, max_idle_reads
                    ),
                    Some("check that the device is connected and powered".to_string()),
                ));
            }
            thread::sleep(IDLE_BACKOFF);
            continue;
        };
        idle.observe(reader.offset());

        let line = FrameLine {
            received_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .map_err(|err| anyhow!("timestamp formatting failed: {}", err))?,
            fields: &frame.fields,
        };
        let json = serde_json::to_string(&line).context("JSON serialization failed")?;
        println!("{}", json);
        printed += 1;
    }
    Ok(())
}
