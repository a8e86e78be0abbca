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

use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use crate::serial::SerialPort;
use crate::protocol::*;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum TransferError {
    /// The serial link failed while opening, reading or writing
    #[error("serial communication error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("file size not acknowledged by console")]
    HeaderNotAcknowledged,

    #[error("chunk at offset {offset} not acknowledged by console")]
    ChunkNotAcknowledged { offset: usize },

    #[error("final acknowledgment not received from the console")]
    FinalNotAcknowledged,

    #[error("cannot read {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The size header is 32 bits wide
    #[error("file is {size} bytes, larger than the 4-byte size header can describe")]
    PayloadTooLarge { size: usize },
}

impl From<serialport::Error> for TransferError {
    fn from(err: serialport::Error) -> Self {
        TransferError::Transport(err.into())
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Tunables for one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub ack_timeout: Duration,
    pub header_delay: Duration,
    pub chunk_delay: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        TransferOptions {
            ack_timeout: ACK_TIMEOUT,
            header_delay: HEADER_SETTLE_DELAY,
            chunk_delay: CHUNK_SETTLE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSummary {
    pub total_size: usize,
    pub chunk_count: usize,
}

/// Notified after every acknowledged chunk
pub trait ProgressObserver {
    fn on_progress(&mut self, bytes_sent: u64, total_size: u64);
}

impl<F: FnMut(u64, u64)> ProgressObserver for F {
    fn on_progress(&mut self, bytes_sent: u64, total_size: u64) {
        self(bytes_sent, total_size)
    }
}

// ============================================================================
// States
// ============================================================================

pub struct SendHeader;
pub struct AwaitHeaderAck;
pub struct SendChunk;
pub struct AwaitChunkAck;
pub struct AwaitFinalAck;

// ============================================================================
// FSM Structure
// ============================================================================

pub struct SenderFsm<'a, State> {
    state: PhantomData<State>,
    serial: &'a mut dyn SerialPort,
    observer: &'a mut dyn ProgressObserver,
    data: &'a [u8],
    bytes_sent: usize,
    chunk_count: usize,
    options: TransferOptions,
}

// ============================================================================
// Trait
// ============================================================================

pub trait SenderState<'a> {
    fn step(self: Box<Self>) -> Result<Step<'a>, TransferError>;
}

pub enum Step<'a> {
    Next(Box<dyn SenderState<'a> + 'a>),
    Done(TransferSummary),
}

// ============================================================================
// Helpers shared by every state
// ============================================================================

impl<'a, S> SenderFsm<'a, S> {
    fn transition<T>(self) -> Step<'a>
    where
        T: 'a,
        SenderFsm<'a, T>: SenderState<'a>,
    {
        Step::Next(Box::new(SenderFsm::<'a, T> {
            state: PhantomData,
            serial: self.serial,
            observer: self.observer,
            data: self.data,
            bytes_sent: self.bytes_sent,
            chunk_count: self.chunk_count,
            options: self.options,
        }))
    }

    fn io_error(&self, e: std::io::Error) -> TransferError {
        let type_name = std::any::type_name::<S>();
        let state_name = type_name.split("::").last().unwrap_or(type_name);
        TransferError::Transport(std::io::Error::new(
            e.kind(),
            format!("{} (in state: {})", e, state_name)
        ))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransferError> {
        match self.serial.write_all(bytes) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Wait for one reply byte. `None` means nothing arrived before the timeout.
    fn read_reply(&mut self) -> Result<Option<u8>, TransferError> {
        let mut buf = [0u8; 1];
        match self.serial.read_timeout(&mut buf, self.options.ack_timeout) {
            Ok(1) => Ok(Some(buf[0])),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn acknowledged(&mut self, unit: &str) -> Result<bool, TransferError> {
        match self.read_reply()? {
            Some(ACK) => {
                debug!("Received: ACK for {}", unit);
                Ok(true)
            }
            Some(other) => {
                warn!("Expected ACK for {}, received {}", unit, describe_byte(other));
                Ok(false)
            }
            None => {
                warn!("Timed out waiting for ACK for {}", unit);
                Ok(false)
            }
        }
    }

    fn pause(delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

// ============================================================================
// State Implementations
// ============================================================================

impl<'a> SenderState<'a> for SenderFsm<'a, SendHeader> {
    fn step(self: Box<Self>) -> Result<Step<'a>, TransferError> {
        let mut fsm = *self;
        let size = u32::try_from(fsm.data.len())
            .map_err(|_| TransferError::PayloadTooLarge { size: fsm.data.len() })?;

        fsm.write(&encode_header(size))?;
        debug!("Sent: size header ({} bytes)", size);
        Self::pause(fsm.options.header_delay);

        Ok(fsm.transition::<AwaitHeaderAck>())
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, AwaitHeaderAck> {
    fn step(self: Box<Self>) -> Result<Step<'a>, TransferError> {
        let mut fsm = *self;
        if !fsm.acknowledged("size header")? {
            return Err(TransferError::HeaderNotAcknowledged);
        }

        if fsm.data.is_empty() {
            Ok(fsm.transition::<AwaitFinalAck>())
        } else {
            Ok(fsm.transition::<SendChunk>())
        }
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, SendChunk> {
    fn step(self: Box<Self>) -> Result<Step<'a>, TransferError> {
        let mut fsm = *self;
        let data = fsm.data;
        let range = chunk_range(fsm.bytes_sent, data.len());
        fsm.write(&data[range.clone()])?;
        debug!("Sent: chunk {} ({} bytes at offset {})", fsm.chunk_count, range.len(), range.start);

        Ok(fsm.transition::<AwaitChunkAck>())
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, AwaitChunkAck> {
    fn step(self: Box<Self>) -> Result<Step<'a>, TransferError> {
        let mut fsm = *self;
        let range = chunk_range(fsm.bytes_sent, fsm.data.len());
        if !fsm.acknowledged(&format!("chunk at offset {}", range.start))? {
            return Err(TransferError::ChunkNotAcknowledged { offset: range.start });
        }

        fsm.bytes_sent = range.end;
        fsm.chunk_count += 1;
        fsm.observer.on_progress(fsm.bytes_sent as u64, fsm.data.len() as u64);
        Self::pause(fsm.options.chunk_delay);

        if fsm.bytes_sent >= fsm.data.len() {
            Ok(fsm.transition::<AwaitFinalAck>())
        } else {
            Ok(fsm.transition::<SendChunk>())
        }
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, AwaitFinalAck> {
    fn step(self: Box<Self>) -> Result<Step<'a>, TransferError> {
        let mut fsm = *self;
        if !fsm.acknowledged("upload")? {
            return Err(TransferError::FinalNotAcknowledged);
        }

        Ok(Step::Done(TransferSummary {
            total_size: fsm.data.len(),
            chunk_count: fsm.chunk_count,
        }))
    }
}

// ============================================================================
// Constructor & Runner
// ============================================================================

impl<'a> SenderFsm<'a, SendHeader> {
    pub fn new(
        serial: &'a mut dyn SerialPort,
        observer: &'a mut dyn ProgressObserver,
        data: &'a [u8],
        options: TransferOptions,
    ) -> Box<dyn SenderState<'a> + 'a> {
        Box::new(SenderFsm {
            state: PhantomData::<SendHeader>,
            serial,
            observer,
            data,
            bytes_sent: 0,
            chunk_count: 0,
            options,
        })
    }
}

/// Upload `data` in one session. Any missing or wrong acknowledgment aborts
/// the whole upload; the caller has to start over from byte 0.
pub fn transfer(
    data: &[u8],
    serial: &mut dyn SerialPort,
    observer: &mut dyn ProgressObserver,
    options: TransferOptions,
) -> Result<TransferSummary, TransferError> {
    let mut state = SenderFsm::new(serial, observer, data, options);

    loop {
        match state.step()? {
            Step::Next(next) => state = next,
            Step::Done(summary) => return Ok(summary),
        }
    }
}

/// Run `transfer` and close the port afterwards, whatever the outcome.
pub fn run_session(
    data: &[u8],
    serial: &mut dyn SerialPort,
    observer: &mut dyn ProgressObserver,
    options: TransferOptions,
) -> Result<TransferSummary, TransferError> {
    let result = transfer(data, &mut *serial, observer, options);
    let closed = serial.close();

    match (result, closed) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(_), Err(e)) => Err(TransferError::Transport(e)),
        (Err(e), _) => Err(e),
    }
}

// ============================================================================
// Tests
// ============================================================================
