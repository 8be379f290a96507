//! One write-then-read transaction over a byte-stream device, with a
//! bounded retry on readiness timeouts.

use crate::constants::{MAX_RETRY, READ_READY_TIMEOUT};
use crate::error::JcieError;
use bytes::Bytes;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cooperative cancellation shared between the caller and the retry loops.
///
/// An interrupted read or write is retried while the token is clear and
/// treated as fatal once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Byte-stream handle the exchange runs against.
///
/// Mirrors what the serial port offers: possibly-partial writes and reads,
/// plus a bounded wait for data to arrive. Implemented by [`SerialWire`]
/// for real hardware and by in-memory stubs in tests.
pub trait Wire {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// Wait up to `timeout` for the device to become readable.
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool>;
}

/// Perform one request/response transaction.
///
/// Up to [`MAX_RETRY`] attempts of send-the-request then wait-for-readiness;
/// a readiness timeout re-sends the whole request, anything else is fatal.
/// Once the device is readable, exactly `reply_len` bytes are read. The
/// reply content is not validated here.
pub fn exchange(
    wire: &mut dyn Wire,
    cancel: &CancelToken,
    request: &[u8],
    reply_len: usize,
) -> Result<Bytes, JcieError> {
    let mut ready = false;
    for attempt in 1..=MAX_RETRY {
        write_all(wire, cancel, request)?;
        match wire.poll_readable(READ_READY_TIMEOUT) {
            Ok(true) => {
                ready = true;
                break;
            }
            Ok(false) => {
                warn!(attempt, "device not readable within timeout, re-sending request");
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted && cancel.is_cancelled() => {
                return Err(JcieError::Cancelled);
            }
            Err(err) => return Err(JcieError::io("readiness wait", err)),
        }
    }
    if !ready {
        return Err(JcieError::RetriesExhausted { attempts: MAX_RETRY });
    }

    let mut reply = vec![0u8; reply_len];
    read_exact(wire, cancel, &mut reply)?;
    debug!(len = reply_len, "exchange complete");
    Ok(Bytes::from(reply))
}

/// Write the whole request, restarting from byte 0 after an interruption.
fn write_all(wire: &mut dyn Wire, cancel: &CancelToken, buf: &[u8]) -> Result<(), JcieError> {
    let mut written = 0;
    while written < buf.len() {
        match wire.write(&buf[written..]) {
            Ok(0) => {
                return Err(JcieError::io(
                    "request write",
                    io::Error::new(io::ErrorKind::WriteZero, "device accepted no bytes"),
                ));
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                if cancel.is_cancelled() {
                    return Err(JcieError::Cancelled);
                }
                // re-send the frame from the start so the device never
                // sees a torn request
                written = 0;
            }
            Err(err) => return Err(JcieError::io("request write", err)),
        }
    }
    Ok(())
}

/// Fill `buf` completely, tolerating interruptions while not cancelled.
fn read_exact(wire: &mut dyn Wire, cancel: &CancelToken, buf: &mut [u8]) -> Result<(), JcieError> {
    let mut filled = 0;
    while filled < buf.len() {
        match wire.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(JcieError::io(
                    "reply read",
                    io::Error::new(io::ErrorKind::UnexpectedEof, "device closed mid-reply"),
                ));
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                if cancel.is_cancelled() {
                    return Err(JcieError::Cancelled);
                }
            }
            Err(err) => return Err(JcieError::io("reply read", err)),
        }
    }
    Ok(())
}

/// How often [`SerialWire::poll_readable`] samples the input queue.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// [`Wire`] over a blocking serial port.
pub struct SerialWire {
    port: Box<dyn SerialPort>,
}

impl SerialWire {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Wire for SerialWire {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let queued = self.port.bytes_to_read().map_err(io::Error::from)?;
            if queued > 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
