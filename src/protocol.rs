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

//! Upload protocol constants and framing helpers

use std::ops::Range;
use std::time::Duration;

/// Acknowledge - receiver accepted the size header, a chunk, or the whole upload
pub const ACK: u8 = 0x06;

/// Negative acknowledge - what the loader usually sends when it rejects a unit.
/// Any byte other than ACK is treated the same way.
pub const NAK: u8 = 0x15;

/// Maximum payload bytes per chunk
pub const CHUNK_SIZE: usize = 1024;

/// Length of the big-endian size header
pub const HEADER_LEN: usize = 4;

/// How long to wait for each acknowledgment byte
pub const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after the header so the loader can start reading
pub const HEADER_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Pause after each acknowledged chunk
pub const CHUNK_SETTLE_DELAY: Duration = Duration::from_millis(10);

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

pub fn encode_header(size: u32) -> [u8; HEADER_LEN] {
    size.to_be_bytes()
}

/// Byte range of the chunk that starts at `offset` in a payload of `total` bytes.
pub fn chunk_range(offset: usize, total: usize) -> Range<usize> {
    let end = offset.saturating_add(CHUNK_SIZE).min(total);
    offset.min(end)..end
}

/// Human-readable form of a reply byte for log output
pub fn describe_byte(byte: u8) -> String {
    match byte {
        ACK => "ACK".to_string(),
        NAK => "NAK".to_string(),
        b => format!("0x{:02X}", b),
    }
}
