//! CSV emission for decoded readings.

use crate::constants::CONSOLE_RECORD_LIMIT;
use crate::reading::SensorReading;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Column headings, in the wire order of the reading payload.
pub const CSV_HEADER: &str = "Temperature, Relative humidity, Ambient light, Barometric pressure, Sound noise, eTVOC, eCO2, Discomfort index, Heat stroke";

/// Consumer of decoded readings.
///
/// `fetch_latest` and `fetch_memory` call `emit_header` once and then
/// `emit_reading` once per decoded record. A sink may cap how many records
/// a memory dump feeds it via `record_limit`.
pub trait ReadingSink {
    fn emit_header(&mut self) -> io::Result<()>;
    fn emit_reading(&mut self, reading: &SensorReading) -> io::Result<()>;

    /// Records a memory dump may emit before stopping early. `None` means
    /// unlimited.
    fn record_limit(&self) -> Option<usize> {
        None
    }
}

/// Writes readings as CSV rows.
pub struct CsvSink<W: Write> {
    writer: W,
    record_limit: Option<usize>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            record_limit: None,
        }
    }

    pub fn with_record_limit(writer: W, limit: usize) -> Self {
        Self {
            writer,
            record_limit: Some(limit),
        }
    }
}

impl CsvSink<io::Stdout> {
    /// Console output, capped at [`CONSOLE_RECORD_LIMIT`] records per dump.
    pub fn console() -> Self {
        Self::with_record_limit(io::stdout(), CONSOLE_RECORD_LIMIT)
    }
}

impl CsvSink<BufWriter<File>> {
    /// Uncapped output into a freshly created file.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> ReadingSink for CsvSink<W> {
    fn emit_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "{CSV_HEADER}")
    }

    fn emit_reading(&mut self, reading: &SensorReading) -> io::Result<()> {
        writeln!(
            self.writer,
            "{:5.2},{:5.2},{},{:8.3},{:5.2},{},{},{:5.2},{:5.2}",
            reading.temperature_c,
            reading.humidity_pct,
            reading.ambient_light,
            reading.pressure_hpa,
            reading.noise_db,
            reading.etvoc_ppb,
            reading.eco2_ppm,
            reading.discomfort_index,
            reading.heat_stroke_c,
        )
    }

    fn record_limit(&self) -> Option<usize> {
        self.record_limit
    }
}
