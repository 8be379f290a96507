// Protocol constants for the Omron 2JCIE-BU01 serial protocol

use std::time::Duration;

/// Frame header magic, always "RB" (0x52 0x42)
pub const FRAME_HEADER: [u8; 2] = [0x52, 0x42];

/// Size of a short request frame (header + length + command + address + CRC)
pub const SHORT_REQUEST_SIZE: usize = 9;

/// Size of a long request frame (short form + 8 bytes of memory indexes)
pub const LONG_REQUEST_SIZE: usize = 17;

/// Size of the latest-data reply (8-byte status header + reading + CRC)
pub const LATEST_REPLY_SIZE: usize = 30;

/// Size of the memory-information reply
pub const MEMORY_INFO_SIZE: usize = 17;

/// Size of one memory-data record (19-byte header + reading + CRC)
pub const MEMORY_RECORD_SIZE: usize = 41;

/// Size of the sensor reading payload embedded in replies
pub const READING_SIZE: usize = 20;

/// Offset of the reading inside the latest-data reply
pub const LATEST_READING_OFFSET: usize = 8;

/// Offset of the reading inside one memory-data record
pub const RECORD_READING_OFFSET: usize = 19;

/// Payload+CRC length field for the latest-data request
pub const LATEST_LEN: u16 = 0x0005;

/// Payload+CRC length field for the memory-information request
pub const INFO_LEN: u16 = 0x0005;

/// Payload+CRC length field for the memory-data request
pub const MEMORY_LEN: u16 = 0x000D;

/// Register address of the latest sensing data
pub const LATEST_ADDR: u16 = 0x5022;

/// Register address of the memory information block
pub const INFO_ADDR: u16 = 0x5004;

/// Register address of the memory data (short form)
pub const MEMORY_ADDR: u16 = 0x500F;

/// Attempts of send-then-wait before an exchange gives up
pub const MAX_RETRY: u32 = 10;

/// How long one attempt waits for the device to become readable
pub const READ_READY_TIMEOUT: Duration = Duration::from_secs(1);

/// Records emitted to a console sink before a memory dump stops early
pub const CONSOLE_RECORD_LIMIT: usize = 100;

/// Serial line rate of the USB-CDC endpoint
pub const SERIAL_BAUD_RATE: u32 = 115_200;
