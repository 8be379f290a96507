//! Request frame construction and the memory-information reply layout.

use crate::constants::{
    FRAME_HEADER, LONG_REQUEST_SIZE, MEMORY_INFO_SIZE, SHORT_REQUEST_SIZE,
};
use crate::crc::crc16;
use crate::error::JcieError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Command codes carried in byte 4 of every request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
    Read = 0x01,
    /// Defined by the device but never issued by this crate.
    Write = 0x02,
}

/// The 17-byte memory-information reply.
///
/// Only the two index fields matter: they bound the range of stored records
/// and are copied verbatim into the long request that follows.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct MemoryInfo {
    header: [u8; 2],
    length: U16,
    command: u8,
    address: U16,
    end_index: U32,
    start_index: U32,
    trailer: [u8; 2],
}

impl MemoryInfo {
    /// Index of the newest stored record.
    pub fn end_index(&self) -> u32 {
        self.end_index.get()
    }

    /// Index of the oldest stored record.
    pub fn start_index(&self) -> u32 {
        self.start_index.get()
    }

    /// Number of records the bulk transfer will carry.
    ///
    /// The device reports an inclusive index range, so an equal start and
    /// end still holds one record. A reply where the end precedes the start
    /// is malformed and rejected before any allocation happens.
    pub fn record_count(&self) -> Result<u32, JcieError> {
        let start = self.start_index();
        let end = self.end_index();
        match end.checked_sub(start) {
            Some(span) => Ok(span + 1),
            None => Err(JcieError::IndexRange { start, end }),
        }
    }
}

impl TryFrom<&[u8]> for MemoryInfo {
    type Error = JcieError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        MemoryInfo::read_from_bytes(bytes).map_err(|_| JcieError::InsufficientData {
            expected: MEMORY_INFO_SIZE,
            actual: bytes.len(),
        })
    }
}

/// Build the fixed 9-byte short request.
///
/// `payload_len` is the device's "payload + CRC" length field, not the frame
/// size. The CRC-16 over the first seven bytes lands little-endian in the
/// last two.
pub fn build_short_frame(payload_len: u16, command: Command, address: u16) -> [u8; SHORT_REQUEST_SIZE] {
    let mut frame = [0u8; SHORT_REQUEST_SIZE];
    frame[0..2].copy_from_slice(&FRAME_HEADER);
    frame[2..4].copy_from_slice(&payload_len.to_le_bytes());
    frame[4] = command.into();
    frame[5..7].copy_from_slice(&address.to_le_bytes());
    let crc = crc16(&frame[..SHORT_REQUEST_SIZE - 2]);
    frame[7..9].copy_from_slice(&crc.to_le_bytes());
    frame
}

/// Build the 17-byte long request for the bulk memory read.
///
/// The start and end indexes are taken from the preceding memory-information
/// reply: start at bytes 7..11, end at bytes 11..15, both little-endian.
pub fn build_long_frame(
    payload_len: u16,
    command: Command,
    address: u16,
    info: &MemoryInfo,
) -> [u8; LONG_REQUEST_SIZE] {
    let mut frame = [0u8; LONG_REQUEST_SIZE];
    frame[0..2].copy_from_slice(&FRAME_HEADER);
    frame[2..4].copy_from_slice(&payload_len.to_le_bytes());
    frame[4] = command.into();
    frame[5..7].copy_from_slice(&address.to_le_bytes());
    frame[7..11].copy_from_slice(&info.start_index().to_le_bytes());
    frame[11..15].copy_from_slice(&info.end_index().to_le_bytes());
    let crc = crc16(&frame[..LONG_REQUEST_SIZE - 2]);
    frame[15..17].copy_from_slice(&crc.to_le_bytes());
    frame
}
