pub mod constants;
pub mod crc;
pub mod device;
pub mod error;
pub mod frame;
pub mod output;
pub mod reading;
pub mod transport;

#[cfg(test)]
mod tests;

// Re-export the main types for easy access
pub use device::JcieBu01;
pub use error::JcieError;
pub use reading::SensorReading;
