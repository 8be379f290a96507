use std::io;
use thiserror::Error;

/// The primary error type for the `jcie-bu01-lib` library.
#[derive(Error, Debug)]
pub enum JcieError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("device never became readable after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("CRC mismatch in {frame}: computed {computed:#06x}, received {received:#06x}")]
    Checksum {
        frame: String,
        computed: u16,
        received: u16,
    },

    #[error("reply too short: expected at least {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("invalid memory index range: end {end:#010x} precedes start {start:#010x}")]
    IndexRange { start: u32, end: u32 },

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl JcieError {
    pub(crate) fn io(stage: &'static str, source: io::Error) -> Self {
        JcieError::Io { stage, source }
    }
}
