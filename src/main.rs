// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

// Serial uploader for PlayStation executables
mod checksum;
mod progress;
mod prompt;
mod protocol;
mod sender;
mod serial;
mod source;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use progress::TransferProgress;
use sender::{TransferError, TransferOptions, TransferSummary};
use serial::RealSerialPort;

#[derive(Parser)]
#[command(name = "psxlink")]
#[command(about = "Upload a binary to a PlayStation over a serial link", long_about = None)]
struct Cli {
    /// Binary to upload (prompted for when omitted)
    file: Option<PathBuf>,

    /// Serial port to use, e.g. /dev/ttyUSB0 or COM3 (prompted for when omitted)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value_t = protocol::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Seconds to wait for each acknowledgment
    #[arg(
        long,
        default_value_t = protocol::ACK_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        value_name = "SECS"
    )]
    timeout: u64,

    /// Pause after sending the size header
    #[arg(long, default_value_t = protocol::HEADER_SETTLE_DELAY.as_millis() as u64, value_name = "MS")]
    header_delay: u64,

    /// Pause after each acknowledged chunk
    #[arg(long, default_value_t = protocol::CHUNK_SETTLE_DELAY.as_millis() as u64, value_name = "MS")]
    chunk_delay: u64,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn options(&self) -> TransferOptions {
        TransferOptions {
            ack_timeout: Duration::from_secs(self.timeout),
            header_delay: Duration::from_millis(self.header_delay),
            chunk_delay: Duration::from_millis(self.chunk_delay),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("PSX Binary Transfer Tool");
    println!("==================================");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();

    let file = match &cli.file {
        Some(file) => file.clone(),
        None => match prompt::prompt_file_path(&mut stdin.lock(), &mut stdout.lock()) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let port_name = match &cli.port {
        Some(port) => port.clone(),
        None => match prompt::prompt_port(&mut stdin.lock(), &mut stdout.lock(), &serial::available_port_names()) {
            Ok(port) => port,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    match send_file(&file, &port_name, cli.baud, cli.options()) {
        Ok(summary) => {
            println!(
                "Transfer completed successfully ({} bytes in {} chunks)",
                summary.total_size, summary.chunk_count
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Transfer failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn send_file(file: &Path, port_name: &str, baud: u32, options: TransferOptions) -> Result<TransferSummary, TransferError> {
    let data = source::read_source(file)?;
    let crc: String = checksum::checksum(&data).iter().map(|b| format!("{:02X}", b)).collect();
    println!("\nTransferring {} to PSX console via {}...", file.display(), port_name);
    println!("File size: {} bytes (CRC32 {})", data.len(), crc);

    let mut port = RealSerialPort::open(port_name, baud, options.ack_timeout)?;
    tracing::debug!(port = %port_name, baud, "serial port open");

    let mut progress = TransferProgress::new(data.len() as u64);
    let result = sender::run_session(&data, &mut port, &mut progress, options);

    match &result {
        Ok(_) => progress.finish(),
        Err(_) => progress.abandon(),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_match_transfer_defaults() {
        let cli = Cli::try_parse_from(["psxlink"]).unwrap();
        assert_eq!(cli.options(), TransferOptions::default());
        assert_eq!(cli.baud, protocol::DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "psxlink", "game.exe", "-p", "COM3", "--timeout", "2",
            "--header-delay", "0", "--chunk-delay", "1",
        ])
        .unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("game.exe")));
        assert_eq!(cli.port.as_deref(), Some("COM3"));
        assert_eq!(
            cli.options(),
            TransferOptions {
                ack_timeout: Duration::from_secs(2),
                header_delay: Duration::ZERO,
                chunk_delay: Duration::from_millis(1),
            }
        );
    }

    #[test]
    fn test_cli_rejects_zero_timeout() {
        assert!(Cli::try_parse_from(["psxlink", "--timeout", "0"]).is_err());
    }
}
