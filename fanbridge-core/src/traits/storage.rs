//! Byte-Addressed Persistent Memory
//!
//! A `ByteStore` offers no integrity guarantee. Corruption, erased cells and
//! torn writes are all detected one level up by
//! [`ConfigStore`](crate::store::ConfigStore) checksums.

use crate::errors::{StoreError, StoreResult};

/// EEPROM-like persistent memory
pub trait ByteStore {
    /// Total addressable bytes
    fn capacity(&self) -> usize;

    /// Fill `buf` with the bytes starting at `address`
    fn read_block(&mut self, address: usize, buf: &mut [u8]) -> StoreResult<()>;

    /// Write `data` starting at `address`
    fn write_block(&mut self, address: usize, data: &[u8]) -> StoreResult<()>;

    /// Write a single byte
    fn write_byte(&mut self, address: usize, value: u8) -> StoreResult<()> {
        self.write_block(address, &[value])
    }

    /// Make every write so far durable
    ///
    /// Called once at the end of each record save. Stores that write through
    /// (EEPROM, RAM) keep the default no-op.
    fn commit(&mut self) -> StoreResult<()> {
        Ok(())
    }

    /// Fail with [`StoreError::OutOfBounds`] unless `len` bytes at `address`
    /// fit in the store
    fn check_bounds(&self, address: usize, len: usize) -> StoreResult<()> {
        let capacity = self.capacity();
        match address.checked_add(len) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(StoreError::OutOfBounds { address, len, capacity }),
        }
    }
}
