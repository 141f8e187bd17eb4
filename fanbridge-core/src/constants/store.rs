//! Persisted Layout Constants

/// Seed of every record checksum.
///
/// Erased EEPROM reads back as `0xFF` everywhere and zeroed RAM as `0x00`;
/// neither pattern produces a matching checksum with a non-zero seed, so a
/// blank part is never mistaken for calibration data.
pub const CHECKSUM_MAGIC: u8 = 0xD1;

/// Size of one persisted `f32` (little-endian IEEE 754).
pub const FLOAT_SIZE: usize = 4;

/// Size of the checksum trailer of every record.
pub const CHECKSUM_SIZE: usize = 1;

/// EEPROM size of the reference MCU.
pub const EEPROM_SIZE: usize = 1024;

/// Value of an erased EEPROM cell.
pub const ERASED_BYTE: u8 = 0xFF;
