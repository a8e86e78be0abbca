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

//! Interactive fallbacks for arguments left off the command line

use std::io::{BufRead, Write};
use std::path::PathBuf;

fn read_answer<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> std::io::Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "no more input",
        ));
    }
    Ok(line.trim().to_string())
}

/// Ask until the user names a file that exists
pub fn prompt_file_path<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> std::io::Result<PathBuf> {
    loop {
        let answer = read_answer(input, output, "Enter full path to the compiled binary file: ")?;
        let path = PathBuf::from(&answer);
        if !answer.is_empty() && path.is_file() {
            return Ok(path);
        }
        writeln!(output, "Error: File not found. Enter a valid file path.")?;
    }
}

/// `COM3`-style names on Windows, device paths such as `/dev/ttyUSB0` elsewhere
pub fn is_plausible_port(name: &str) -> bool {
    let lower = name.to_lowercase();
    let is_com = lower.len() > 3
        && lower.starts_with("com")
        && lower[3..].chars().all(|c| c.is_ascii_digit());
    is_com || name.starts_with('/')
}

/// Ask until the user gives something that looks like a serial port
pub fn prompt_port<R: BufRead, W: Write>(input: &mut R, output: &mut W, known: &[String]) -> std::io::Result<String> {
    if !known.is_empty() {
        writeln!(output, "Available ports: {}", known.join(", "))?;
    }

    loop {
        let answer = read_answer(input, output, "Enter serial port for the USB-Serial adapter (e.g., COM3 or /dev/ttyUSB0): ")?;
        if is_plausible_port(&answer) {
            return Ok(answer);
        }
        writeln!(output, "Error: Invalid port. Enter a valid port (e.g., COM3 or /dev/ttyUSB0).")?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_is_plausible_port() {
        assert!(is_plausible_port("COM3"));
        assert!(is_plausible_port("com12"));
        assert!(is_plausible_port("/dev/ttyUSB0"));
        assert!(!is_plausible_port(""));
        assert!(!is_plausible_port("COM"));
        assert!(!is_plausible_port("COMX"));
        assert!(!is_plausible_port("ttyUSB0"));
    }

    #[test]
    fn test_prompt_port_retries_until_valid() {
        let mut input = Cursor::new(b"usb\n\n  COM4  \n".to_vec());
        let mut output = Vec::new();

        let port = prompt_port(&mut input, &mut output, &["COM4".to_string()]).unwrap();

        assert_eq!(port, "COM4");
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("Available ports: COM4\n"));
        assert_eq!(text.matches("Error: Invalid port").count(), 2);
    }

    #[test]
    fn test_prompt_file_path_retries_until_existing() {
        let test_file = std::env::temp_dir().join("psxlink_prompt_test.exe");
        std::fs::write(&test_file, b"x").unwrap();

        let script = format!("/no/such/file.exe\n{}\n", test_file.display());
        let mut input = Cursor::new(script.into_bytes());
        let mut output = Vec::new();

        let path = prompt_file_path(&mut input, &mut output).unwrap();

        assert_eq!(path, test_file);
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Error: File not found").count(), 1);

        std::fs::remove_file(&test_file).ok();
    }

    #[test]
    fn test_prompt_stops_at_end_of_input() {
        let mut input = Cursor::new(b"nonsense\n".to_vec());
        let mut output = Vec::new();

        let err = prompt_port(&mut input, &mut output, &[]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
