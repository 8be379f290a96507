use crate::constants::{CONSOLE_RECORD_LIMIT, MAX_RETRY, MEMORY_RECORD_SIZE};
use crate::device::JcieBu01;
use crate::error::JcieError;
use crate::output::ReadingSink;
use crate::reading::{SensorReading, SensorReadingRaw};
use crate::transport::{CancelToken, Wire, exchange};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;
use zerocopy::IntoBytes;

/// Latest-data reply: 8 header bytes, the reading below, CRC trailer.
const LATEST_REPLY: &str = "52421a0001225000290988153601f24e0f00ab1178008002641bba0838a5";

/// Memory-information reply with end index 5 and start index 2.
const MEMORY_INFO_REPLY: &str = "52420a000104500500000002000000b067";

/// One 41-byte memory record holding the same reading as LATEST_REPLY.
const MEMORY_RECORD: &str =
    "52422500010f50070000000000000000000000290988153601f24e0f00ab1178008002641bba08585e";

/// The reading encoded in the replies above.
fn expected_reading() -> SensorReading {
    SensorReading {
        temperature_c: 23.45,
        humidity_pct: 55.12,
        ambient_light: 310,
        pressure_hpa: 1003.250,
        noise_db: 45.23,
        etvoc_ppb: 120,
        eco2_ppm: 640,
        discomfort_index: 70.12,
        heat_stroke_c: 22.34,
    }
}

fn assert_reading_close(actual: &SensorReading, expected: &SensorReading) {
    assert!((actual.temperature_c - expected.temperature_c).abs() < 0.005);
    assert!((actual.humidity_pct - expected.humidity_pct).abs() < 0.005);
    assert_eq!(actual.ambient_light, expected.ambient_light);
    assert!((actual.pressure_hpa - expected.pressure_hpa).abs() < 0.0005);
    assert!((actual.noise_db - expected.noise_db).abs() < 0.005);
    assert_eq!(actual.etvoc_ppb, expected.etvoc_ppb);
    assert_eq!(actual.eco2_ppm, expected.eco2_ppm);
    assert!((actual.discomfort_index - expected.discomfort_index).abs() < 0.005);
    assert!((actual.heat_stroke_c - expected.heat_stroke_c).abs() < 0.005);
}

/// In-memory transport: records every request, serves queued reply bytes.
///
/// The write log lives behind an `Rc` so tests can still inspect it after
/// the wire has moved into a device.
#[derive(Default)]
struct MockWire {
    pending: VecDeque<u8>,
    writes: Rc<RefCell<Vec<Vec<u8>>>>,
    interrupt_next_write: bool,
}

impl MockWire {
    fn with_replies(replies: &[&[u8]]) -> Self {
        let mut wire = MockWire::default();
        for reply in replies {
            wire.pending.extend(reply.iter().copied());
        }
        wire
    }

    fn write_log(&self) -> Rc<RefCell<Vec<Vec<u8>>>> {
        Rc::clone(&self.writes)
    }
}

impl Wire for MockWire {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.interrupt_next_write {
            self.interrupt_next_write = false;
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        self.writes.borrow_mut().push(buf.to_vec());
        Ok(buf.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.pending.len());
        for slot in buf[..n].iter_mut() {
            *slot = self.pending.pop_front().unwrap();
        }
        Ok(n)
    }

    fn poll_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(!self.pending.is_empty())
    }
}

/// Sink that collects what the orchestrator emits.
#[derive(Default)]
struct CollectSink {
    headers: usize,
    readings: Vec<SensorReading>,
    limit: Option<usize>,
}

impl ReadingSink for CollectSink {
    fn emit_header(&mut self) -> io::Result<()> {
        self.headers += 1;
        Ok(())
    }

    fn emit_reading(&mut self, reading: &SensorReading) -> io::Result<()> {
        self.readings.push(*reading);
        Ok(())
    }

    fn record_limit(&self) -> Option<usize> {
        self.limit
    }
}

#[test]
fn reading_round_trip() {
    let raw = SensorReadingRaw::from(expected_reading());
    let bytes = raw.as_bytes();
    assert_eq!(bytes.len(), 20);
    let decoded = SensorReading::decode(bytes, 0).unwrap();
    assert_reading_close(&decoded, &expected_reading());
}

#[test]
fn fetch_latest_emits_one_reading() {
    let reply = hex::decode(LATEST_REPLY).unwrap();
    let mut device = JcieBu01::with_wire(
        MockWire::with_replies(&[&reply]),
        CancelToken::new(),
    );
    let mut sink = CollectSink::default();
    device.fetch_latest(&mut sink).unwrap();

    assert_eq!(sink.headers, 1);
    assert_eq!(sink.readings.len(), 1);
    assert_reading_close(&sink.readings[0], &expected_reading());
}

#[test]
fn fetch_latest_sends_expected_request() {
    let reply = hex::decode(LATEST_REPLY).unwrap();
    let wire = MockWire::with_replies(&[&reply]);
    let log = wire.write_log();
    let mut device = JcieBu01::with_wire(wire, CancelToken::new());
    let mut sink = CollectSink::default();
    device.fetch_latest(&mut sink).unwrap();

    let writes = log.borrow();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0], hex::decode("52420500012250e2bb").unwrap());
}

#[test]
fn fetch_latest_rejects_corrupt_reply() {
    let mut reply = hex::decode(LATEST_REPLY).unwrap();
    *reply.last_mut().unwrap() ^= 0xFF;
    let mut device = JcieBu01::with_wire(
        MockWire::with_replies(&[&reply]),
        CancelToken::new(),
    );
    let mut sink = CollectSink::default();
    let err = device.fetch_latest(&mut sink).unwrap_err();
    assert!(matches!(err, JcieError::Checksum { .. }));
    assert_eq!(sink.readings.len(), 0);
}

#[test]
fn fetch_memory_reads_all_records() {
    let info = hex::decode(MEMORY_INFO_REPLY).unwrap();
    let record = hex::decode(MEMORY_RECORD).unwrap();
    // end=5, start=2 -> 4 records, 164 bulk bytes
    let bulk: Vec<u8> = record.iter().copied().cycle().take(4 * MEMORY_RECORD_SIZE).collect();
    let mut device = JcieBu01::with_wire(
        MockWire::with_replies(&[&info, &bulk]),
        CancelToken::new(),
    );
    let mut sink = CollectSink::default();
    device.fetch_memory(&mut sink).unwrap();

    assert_eq!(sink.headers, 1);
    assert_eq!(sink.readings.len(), 4);
    for reading in &sink.readings {
        assert_reading_close(reading, &expected_reading());
    }
}

#[test]
fn fetch_memory_sends_info_then_long_request() {
    let info = hex::decode(MEMORY_INFO_REPLY).unwrap();
    let record = hex::decode(MEMORY_RECORD).unwrap();
    let bulk: Vec<u8> = record.iter().copied().cycle().take(4 * MEMORY_RECORD_SIZE).collect();
    let wire = MockWire::with_replies(&[&info, &bulk]);
    let log = wire.write_log();
    let mut device = JcieBu01::with_wire(wire, CancelToken::new());
    let mut sink = CollectSink::default();
    device.fetch_memory(&mut sink).unwrap();

    let writes = log.borrow();
    assert_eq!(writes.len(), 2);
    // short info request for address 0x5004
    assert_eq!(writes[0], hex::decode("52420500010450f8db").unwrap());
    // long request echoing start=2 then end=5 from the info reply
    assert_eq!(
        writes[1],
        hex::decode("52420d00010f5002000000050000008a57").unwrap()
    );
}

#[test]
fn fetch_memory_fails_on_first_corrupt_record() {
    let info = hex::decode(MEMORY_INFO_REPLY).unwrap();
    let record = hex::decode(MEMORY_RECORD).unwrap();
    let mut bulk: Vec<u8> = record.iter().copied().cycle().take(4 * MEMORY_RECORD_SIZE).collect();
    // corrupt the trailer of record 2
    bulk[3 * MEMORY_RECORD_SIZE - 1] ^= 0xFF;
    let mut device = JcieBu01::with_wire(
        MockWire::with_replies(&[&info, &bulk]),
        CancelToken::new(),
    );
    let mut sink = CollectSink::default();
    let err = device.fetch_memory(&mut sink).unwrap_err();
    assert!(matches!(err, JcieError::Checksum { .. }));
    // records before the corrupt one were already emitted
    assert_eq!(sink.readings.len(), 2);
}

#[test]
fn fetch_memory_honors_console_record_limit() {
    // end=149, start=0 -> 150 stored records
    let mut info = vec![0u8; 17];
    info[7..11].copy_from_slice(&149u32.to_le_bytes());
    info[11..15].copy_from_slice(&0u32.to_le_bytes());
    let record = hex::decode(MEMORY_RECORD).unwrap();
    let bulk: Vec<u8> = record
        .iter()
        .copied()
        .cycle()
        .take(150 * MEMORY_RECORD_SIZE)
        .collect();
    let mut device = JcieBu01::with_wire(
        MockWire::with_replies(&[&info, &bulk]),
        CancelToken::new(),
    );
    let mut sink = CollectSink {
        limit: Some(CONSOLE_RECORD_LIMIT),
        ..CollectSink::default()
    };
    device.fetch_memory(&mut sink).unwrap();
    assert_eq!(sink.readings.len(), CONSOLE_RECORD_LIMIT);
}

#[test]
fn exchange_gives_up_after_retry_budget() {
    // never readable: every attempt re-sends the request, then times out
    let mut wire = MockWire::default();
    let cancel = CancelToken::new();
    let err = exchange(&mut wire, &cancel, &[0x52, 0x42], 4).unwrap_err();
    assert!(matches!(err, JcieError::RetriesExhausted { attempts } if attempts == MAX_RETRY));
    assert_eq!(wire.writes.borrow().len(), MAX_RETRY as usize);
}

#[test]
fn exchange_resends_full_request_after_interruption() {
    let mut wire = MockWire::with_replies(&[&[0xAA, 0xBB, 0xCC, 0xDD]]);
    wire.interrupt_next_write = true;
    let cancel = CancelToken::new();
    let reply = exchange(&mut wire, &cancel, &[0x52, 0x42], 4).unwrap();
    assert_eq!(reply.as_ref(), &[0xAA, 0xBB, 0xCC, 0xDD]);
    // the interrupted attempt never reached the mock, the re-send did
    assert_eq!(*wire.writes.borrow(), vec![vec![0x52, 0x42]]);
}

#[test]
fn exchange_fails_fast_when_cancelled_mid_write() {
    let mut wire = MockWire::default();
    wire.interrupt_next_write = true;
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = exchange(&mut wire, &cancel, &[0x52, 0x42], 4).unwrap_err();
    assert!(matches!(err, JcieError::Cancelled));
    assert!(wire.writes.borrow().is_empty());
}
