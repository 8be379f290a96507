//! The two supported query transactions, end to end.

use crate::constants::{
    INFO_ADDR, INFO_LEN, LATEST_ADDR, LATEST_LEN, LATEST_READING_OFFSET, LATEST_REPLY_SIZE,
    MEMORY_ADDR, MEMORY_INFO_SIZE, MEMORY_LEN, MEMORY_RECORD_SIZE, RECORD_READING_OFFSET,
    SERIAL_BAUD_RATE,
};
use crate::crc::trailer_check;
use crate::error::JcieError;
use crate::frame::{Command, MemoryInfo, build_long_frame, build_short_frame};
use crate::output::ReadingSink;
use crate::reading::SensorReading;
use crate::transport::{CancelToken, SerialWire, Wire, exchange};
use serialport::{ClearBuffer, DataBits, Parity, StopBits};
use std::time::Duration;
use tracing::info;

/// An open 2JCIE-BU01 device.
///
/// Owns the transport handle and the cancellation token for the duration of
/// one run; one request is in flight at a time.
pub struct JcieBu01<T: Wire> {
    wire: T,
    cancel: CancelToken,
}

impl JcieBu01<SerialWire> {
    /// Open and configure the sensor's USB-CDC serial endpoint
    /// (115200 baud, 8N1) with a flushed input queue.
    pub fn open(path: &str, cancel: CancelToken) -> Result<Self, JcieError> {
        info!("Opening 2JCIE-BU01 on {path}");
        let port = serialport::new(path, SERIAL_BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(Duration::from_secs(1))
            .open()?;
        port.clear(ClearBuffer::Input)?;
        Ok(Self::with_wire(SerialWire::new(port), cancel))
    }
}

impl<T: Wire> JcieBu01<T> {
    /// Wrap an already-open transport. Used directly by tests.
    pub fn with_wire(wire: T, cancel: CancelToken) -> Self {
        Self { wire, cancel }
    }

    /// Query the latest sensing data and emit it as one record.
    pub fn fetch_latest(&mut self, sink: &mut dyn ReadingSink) -> Result<(), JcieError> {
        let request = build_short_frame(LATEST_LEN, Command::Read, LATEST_ADDR);
        let reply = exchange(&mut self.wire, &self.cancel, &request, LATEST_REPLY_SIZE)?;
        check_crc(&reply, || "latest-data reply".to_string())?;

        let reading = SensorReading::decode(&reply, LATEST_READING_OFFSET)?;
        sink.emit_header().map_err(|e| JcieError::io("record output", e))?;
        sink.emit_reading(&reading)
            .map_err(|e| JcieError::io("record output", e))?;
        Ok(())
    }

    /// Dump the device memory: fetch the stored index range, read every
    /// record in one bulk transfer, then validate and emit each one.
    pub fn fetch_memory(&mut self, sink: &mut dyn ReadingSink) -> Result<(), JcieError> {
        let request = build_short_frame(INFO_LEN, Command::Read, INFO_ADDR);
        let reply = exchange(&mut self.wire, &self.cancel, &request, MEMORY_INFO_SIZE)?;
        // The metadata reply carries no validated trailer; only the
        // latest-data and per-record frames are CRC-checked.
        let info = MemoryInfo::try_from(reply.as_ref())?;

        let record_count = info.record_count()? as usize;
        info!(
            record_count,
            start = info.start_index(),
            end = info.end_index(),
            "memory range reported by device"
        );
        let bulk_len = record_count
            .checked_mul(MEMORY_RECORD_SIZE)
            .ok_or_else(|| JcieError::Protocol("memory transfer size overflows".to_string()))?;

        let request = build_long_frame(MEMORY_LEN, Command::Read, MEMORY_ADDR, &info);
        let bulk = exchange(&mut self.wire, &self.cancel, &request, bulk_len)?;

        sink.emit_header().map_err(|e| JcieError::io("record output", e))?;
        let limit = sink.record_limit();
        for index in 0..record_count {
            let record = bulk.slice(index * MEMORY_RECORD_SIZE..(index + 1) * MEMORY_RECORD_SIZE);
            check_crc(&record, || format!("memory record {index}"))?;
            let reading = SensorReading::decode(&record, RECORD_READING_OFFSET)?;
            sink.emit_reading(&reading)
                .map_err(|e| JcieError::io("record output", e))?;
            if limit.is_some_and(|limit| index + 1 >= limit) {
                info!(emitted = index + 1, record_count, "record output stopped at sink limit");
                break;
            }
        }
        Ok(())
    }
}

/// Validate a frame's CRC-16 trailer, naming the frame on mismatch.
fn check_crc(frame: &[u8], name: impl FnOnce() -> String) -> Result<(), JcieError> {
    match trailer_check(frame) {
        Some((computed, received)) if computed == received => Ok(()),
        Some((computed, received)) => Err(JcieError::Checksum {
            frame: name(),
            computed,
            received,
        }),
        None => Err(JcieError::InsufficientData {
            expected: 2,
            actual: frame.len(),
        }),
    }
}
