use crate::constants::READING_SIZE;
use crate::error::JcieError;
use std::fmt;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The 20-byte reading payload as it appears on the wire.
///
/// Shared by the latest-data reply (offset 8) and every memory-data record
/// (offset 19). All fields little-endian.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct SensorReadingRaw {
    pub temperature_centi: U16, // 0.01 °C
    pub humidity_centi: U16,    // 0.01 %RH
    pub light_raw: U16,         // lx
    pub pressure_milli: U32,    // 0.001 hPa
    pub noise_centi: U16,       // 0.01 dB
    pub etvoc_raw: U16,         // ppb
    pub eco2_raw: U16,          // ppm
    pub discomfort_centi: U16,  // 0.01
    pub heat_stroke_centi: U16, // 0.01 °C
}

/// One decoded environmental reading in engineering units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    pub temperature_c: f32,   // Temperature in °C
    pub humidity_pct: f32,    // Relative humidity in %
    pub ambient_light: i32,   // Ambient light in lx
    pub pressure_hpa: f64,    // Barometric pressure in hPa
    pub noise_db: f32,        // Sound noise in dB
    pub etvoc_ppb: i32,       // Estimated total VOC in ppb
    pub eco2_ppm: i32,        // Estimated CO2 in ppm
    pub discomfort_index: f32,
    pub heat_stroke_c: f32,   // Heat-stroke risk factor in °C
}

impl From<SensorReadingRaw> for SensorReading {
    fn from(raw: SensorReadingRaw) -> Self {
        SensorReading {
            temperature_c: f32::from(raw.temperature_centi.get()) / 100.0,
            humidity_pct: f32::from(raw.humidity_centi.get()) / 100.0,
            ambient_light: i32::from(raw.light_raw.get()),
            pressure_hpa: f64::from(raw.pressure_milli.get()) / 1000.0,
            noise_db: f32::from(raw.noise_centi.get()) / 100.0,
            etvoc_ppb: i32::from(raw.etvoc_raw.get()),
            eco2_ppm: i32::from(raw.eco2_raw.get()),
            discomfort_index: f32::from(raw.discomfort_centi.get()) / 100.0,
            heat_stroke_c: f32::from(raw.heat_stroke_centi.get()) / 100.0,
        }
    }
}

impl From<SensorReading> for SensorReadingRaw {
    fn from(reading: SensorReading) -> Self {
        // round, not truncate: the engineering values are quotients of
        // integers and float representation may land just below them
        SensorReadingRaw {
            temperature_centi: U16::new((reading.temperature_c * 100.0).round() as u16),
            humidity_centi: U16::new((reading.humidity_pct * 100.0).round() as u16),
            light_raw: U16::new(reading.ambient_light as u16),
            pressure_milli: U32::new((reading.pressure_hpa * 1000.0).round() as u32),
            noise_centi: U16::new((reading.noise_db * 100.0).round() as u16),
            etvoc_raw: U16::new(reading.etvoc_ppb as u16),
            eco2_raw: U16::new(reading.eco2_ppm as u16),
            discomfort_centi: U16::new((reading.discomfort_index * 100.0).round() as u16),
            heat_stroke_centi: U16::new((reading.heat_stroke_c * 100.0).round() as u16),
        }
    }
}

impl SensorReading {
    /// Decode a reading starting at `offset` within a reply payload.
    ///
    /// The reply-length contracts of the two transactions guarantee the
    /// 20 bytes are present; a shorter buffer is still rejected rather
    /// than sliced out of bounds.
    pub fn decode(payload: &[u8], offset: usize) -> Result<Self, JcieError> {
        let end = offset
            .checked_add(READING_SIZE)
            .filter(|&end| end <= payload.len())
            .ok_or(JcieError::InsufficientData {
                expected: offset.saturating_add(READING_SIZE),
                actual: payload.len(),
            })?;
        let raw = SensorReadingRaw::ref_from_bytes(&payload[offset..end])
            .map_err(|_| JcieError::InsufficientData {
                expected: READING_SIZE,
                actual: end - offset,
            })?;
        Ok(SensorReading::from(*raw))
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} °C, {:.2} %RH, {} lx, {:.3} hPa, {:.2} dB, eTVOC {} ppb, eCO2 {} ppm",
            self.temperature_c,
            self.humidity_pct,
            self.ambient_light,
            self.pressure_hpa,
            self.noise_db,
            self.etvoc_ppb,
            self.eco2_ppm,
        )
    }
}
