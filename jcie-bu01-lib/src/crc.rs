//! CRC-16 used by the 2JCIE-BU01 frame trailer (Modbus polynomial, no table).

/// Bit-reflected polynomial
const CRC16_POLY: u16 = 0xA001;

/// Initial register value
const CRC16_INIT: u16 = 0xFFFF;

/// Compute the CRC-16 of `bytes`.
///
/// Deterministic and side-effect free; matches the checksum the device
/// appends to every validated frame.
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;
    for &byte in bytes {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Split a frame into its body and the little-endian CRC trailer,
/// returning the computed and received values.
///
/// Returns `None` when the frame is too short to carry a trailer.
pub fn trailer_check(frame: &[u8]) -> Option<(u16, u16)> {
    if frame.len() < 2 {
        return None;
    }
    let (body, trailer) = frame.split_at(frame.len() - 2);
    let received = u16::from_le_bytes([trailer[0], trailer[1]]);
    Some((crc16(body), received))
}

/// True iff the trailing two bytes of `frame` hold the CRC-16 of the rest.
pub fn verify_trailer(frame: &[u8]) -> bool {
    matches!(trailer_check(frame), Some((computed, received)) if computed == received)
}
