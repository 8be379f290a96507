use anyhow::Result;
use clap::{Parser, ValueEnum};
use jcie_bu01_lib::JcieBu01;
use jcie_bu01_lib::output::{CsvSink, ReadingSink};
use jcie_bu01_lib::transport::CancelToken;
use std::path::PathBuf;
use tracing::info;

/// Acquire environmental sensor data from an Omron 2JCIE-BU01 over USB.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Serial device path of the sensor (e.g. /dev/ttyUSB0)
    device: String,

    /// Which transaction to run
    #[arg(value_enum)]
    mode: Mode,

    /// CSV output path; standard output (capped at 100 records) when omitted
    csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// One latest reading
    Latest,
    /// Every record stored in device memory
    Memory,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cancel = CancelToken::new();
    let mut device = JcieBu01::open(&cli.device, cancel)?;

    let mut sink: Box<dyn ReadingSink> = match &cli.csv_path {
        Some(path) => Box::new(CsvSink::create(path)?),
        None => Box::new(CsvSink::console()),
    };

    match cli.mode {
        Mode::Latest => {
            info!("Mode: get latest data");
            device.fetch_latest(sink.as_mut())?;
        }
        Mode::Memory => {
            info!("Mode: get memory data");
            device.fetch_memory(sink.as_mut())?;
        }
    }

    info!("all data acquired");
    Ok(())
}
