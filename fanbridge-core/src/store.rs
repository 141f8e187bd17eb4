//! Checksummed Persistent Configuration
//!
//! Calibration data lives in byte-addressed persistent memory (EEPROM on the
//! reference board) as independent records, each followed by one checksum
//! byte:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐ 0
//! │ temp weights F1: S x f32 LE       │ csum     │
//! │ temp weights F2: S x f32 LE       │ csum     │
//! │ ...                                          │
//! ├──────────────────────────────────────────────┤ filter_start
//! │ filter weights: pwm f32, temp f32 │ csum     │
//! ├──────────────────────────────────────────────┤ map_start
//! │ map F1 T0: P x u8                 │ csum     │
//! │ map F1 T1: P x u8                 │ csum     │
//! │ ...                                          │
//! │ map F2 T0: P x u8                 │ csum     │
//! │ ...                                          │
//! └──────────────────────────────────────────────┘ end
//! ```
//!
//! For the reference configuration (F=2, S=4, T=8, P=21) that is
//! 34 + 9 + 352 = 395 bytes.
//!
//! ## Checksum
//!
//! `csum = (0xD1 + Σ data) mod 256`. The non-zero seed makes erased (`0xFF`)
//! and zeroed memory fail validation.
//!
//! ## Guarantees
//!
//! - A load decodes into locals and validates them; the caller's state is
//!   only touched after the whole record checked out.
//! - A save writes the data, then the checksum, then commits the backend
//!   once. A record torn by a reset between the two fails its next load.
//! - Nothing is ever repaired.

use crate::constants::store::{CHECKSUM_MAGIC, CHECKSUM_SIZE, ERASED_BYTE, FLOAT_SIZE};
use crate::errors::{StoreError, StoreResult};
use crate::filter::FilterWeights;
use crate::temperature::validate_weights;
use crate::traits::ByteStore;

/// Additive checksum seeded with [`CHECKSUM_MAGIC`]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(CHECKSUM_MAGIC, |sum, &b| sum.wrapping_add(b))
}

/// One logical record of the persisted layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    /// Temperature weights of one fan
    TempWeights {
        /// Fan index
        fan: usize,
    },
    /// The filter-weight pair
    FilterWeights,
    /// One mapping row
    MappingRow {
        /// Fan index
        fan: usize,
        /// Temperature bucket index
        temp: usize,
    },
}

/// Byte offsets of every record, derived from the table dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLayout {
    fans: usize,
    sensors: usize,
    temp_buckets: usize,
    pwm_buckets: usize,
}

impl StoreLayout {
    /// Layout for `fans` x `sensors` weights and `fans` x `temp_buckets` rows
    /// of `pwm_buckets` bytes
    pub const fn new(fans: usize, sensors: usize, temp_buckets: usize, pwm_buckets: usize) -> Self {
        Self { fans, sensors, temp_buckets, pwm_buckets }
    }

    /// Bytes of one weight row including its checksum
    pub const fn weights_row_size(&self) -> usize {
        self.sensors * FLOAT_SIZE + CHECKSUM_SIZE
    }

    /// Bytes of the filter record including its checksum
    pub const fn filter_size(&self) -> usize {
        2 * FLOAT_SIZE + CHECKSUM_SIZE
    }

    /// Bytes of one mapping row including its checksum
    pub const fn map_row_size(&self) -> usize {
        self.pwm_buckets + CHECKSUM_SIZE
    }

    /// Start of the filter record
    pub const fn filter_start(&self) -> usize {
        self.fans * self.weights_row_size()
    }

    /// Start of the mapping rows
    pub const fn map_start(&self) -> usize {
        self.filter_start() + self.filter_size()
    }

    /// One past the last byte used
    pub const fn end(&self) -> usize {
        self.map_start() + self.fans * self.temp_buckets * self.map_row_size()
    }

    /// Start address and total size (data + checksum) of `region`
    pub fn span(&self, region: Region) -> StoreResult<(usize, usize)> {
        match region {
            Region::TempWeights { fan } if fan < self.fans => {
                Ok((fan * self.weights_row_size(), self.weights_row_size()))
            }
            Region::FilterWeights => Ok((self.filter_start(), self.filter_size())),
            Region::MappingRow { fan, temp } if fan < self.fans && temp < self.temp_buckets => {
                let row = fan * self.temp_buckets + temp;
                Ok((self.map_start() + row * self.map_row_size(), self.map_row_size()))
            }
            Region::TempWeights { fan } | Region::MappingRow { fan, .. } => {
                Err(StoreError::NoSuchRecord { index: fan })
            }
        }
    }
}

/// Typed records on top of a [`ByteStore`]
#[derive(Debug)]
pub struct ConfigStore<B, const F: usize, const S: usize, const T: usize, const P: usize> {
    backend: B,
    layout: StoreLayout,
}

impl<B: ByteStore, const F: usize, const S: usize, const T: usize, const P: usize> ConfigStore<B, F, S, T, P> {
    /// Wrap `backend`; it must be large enough for the whole layout
    pub fn new(backend: B) -> StoreResult<Self> {
        let layout = StoreLayout::new(F, S, T, P);
        backend.check_bounds(0, layout.end())?;
        Ok(Self { backend, layout })
    }

    /// Record offsets
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Backing store
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Backing store, mutably (tests corrupt records through it)
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Give the backing store back
    pub fn into_inner(self) -> B {
        self.backend
    }

    /// Load and validate the weight row of `fan`
    pub fn load_temp_weights(&mut self, fan: usize) -> StoreResult<[f32; S]> {
        let (address, _) = self.layout.span(Region::TempWeights { fan })?;
        let mut weights = [0.0f32; S];
        self.read_floats(address, &mut weights)?;
        validate_weights(&weights).map_err(|_| StoreError::InvalidPayload {
            address,
            reason: "temperature weights",
        })?;
        Ok(weights)
    }

    /// Persist the weight row of `fan`
    pub fn save_temp_weights(&mut self, fan: usize, weights: &[f32; S]) -> StoreResult<()> {
        let (address, _) = self.layout.span(Region::TempWeights { fan })?;
        self.write_floats(address, weights)
    }

    /// Load and validate the filter-weight pair
    pub fn load_filter_weights(&mut self) -> StoreResult<FilterWeights> {
        let (address, _) = self.layout.span(Region::FilterWeights)?;
        let mut pair = [0.0f32; 2];
        self.read_floats(address, &mut pair)?;
        FilterWeights::new(pair[0], pair[1])
            .map_err(|_| StoreError::InvalidPayload { address, reason: "filter weights" })
    }

    /// Persist the filter-weight pair, pwm weight first
    pub fn save_filter_weights(&mut self, weights: &FilterWeights) -> StoreResult<()> {
        let (address, _) = self.layout.span(Region::FilterWeights)?;
        self.write_floats(address, &[weights.pwm(), weights.temp()])
    }

    /// Load and validate mapping row (`fan`, `temp`)
    pub fn load_mapping_row(&mut self, fan: usize, temp: usize) -> StoreResult<[u8; P]> {
        let (address, _) = self.layout.span(Region::MappingRow { fan, temp })?;
        let mut row = [0u8; P];
        self.backend.read_block(address, &mut row)?;
        self.verify(address, checksum(&row), P)?;
        if row.iter().any(|&v| v > 100) {
            return Err(StoreError::InvalidPayload { address, reason: "mapping value above 100" });
        }
        Ok(row)
    }

    /// Persist mapping row (`fan`, `temp`)
    pub fn save_mapping_row(&mut self, fan: usize, temp: usize, row: &[u8; P]) -> StoreResult<()> {
        let (address, _) = self.layout.span(Region::MappingRow { fan, temp })?;
        self.backend.write_block(address, row)?;
        self.backend.write_byte(address + P, checksum(row))?;
        self.backend.commit()
    }

    /// Check only the checksum of `region`, without decoding it
    pub fn verify_region(&mut self, region: Region) -> StoreResult<()> {
        let (address, size) = self.layout.span(region)?;
        let mut sum = CHECKSUM_MAGIC;
        let mut byte = [0u8; 1];
        for offset in 0..size - CHECKSUM_SIZE {
            self.backend.read_block(address + offset, &mut byte)?;
            sum = sum.wrapping_add(byte[0]);
        }
        self.verify(address, sum, size - CHECKSUM_SIZE)
    }

    fn read_floats(&mut self, address: usize, out: &mut [f32]) -> StoreResult<()> {
        let mut sum = CHECKSUM_MAGIC;
        let mut bytes = [0u8; FLOAT_SIZE];
        for (i, value) in out.iter_mut().enumerate() {
            self.backend.read_block(address + i * FLOAT_SIZE, &mut bytes)?;
            sum = bytes.iter().fold(sum, |s, &b| s.wrapping_add(b));
            *value = f32::from_le_bytes(bytes);
        }
        self.verify(address, sum, out.len() * FLOAT_SIZE)
    }

    fn write_floats(&mut self, address: usize, values: &[f32]) -> StoreResult<()> {
        let mut sum = CHECKSUM_MAGIC;
        for (i, value) in values.iter().enumerate() {
            let bytes = value.to_le_bytes();
            sum = bytes.iter().fold(sum, |s, &b| s.wrapping_add(b));
            self.backend.write_block(address + i * FLOAT_SIZE, &bytes)?;
        }
        self.backend.write_byte(address + values.len() * FLOAT_SIZE, sum)?;
        self.backend.commit()
    }

    fn verify(&mut self, address: usize, computed: u8, data_len: usize) -> StoreResult<()> {
        let mut stored = [0u8; 1];
        self.backend.read_block(address + data_len, &mut stored)?;
        if stored[0] != computed {
            log_debug!("checksum mismatch at {}: {} != {}", address, stored[0], computed);
            return Err(StoreError::ChecksumMismatch { address, stored: stored[0], computed });
        }
        Ok(())
    }
}

/// In-memory byte store, erased to `0xFF` like a fresh EEPROM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamStore<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> RamStore<N> {
    /// Erased store
    pub const fn new() -> Self {
        Self { bytes: [ERASED_BYTE; N] }
    }

    /// Raw contents
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Raw contents, mutably
    pub fn as_bytes_mut(&mut self) -> &mut [u8; N] {
        &mut self.bytes
    }
}

impl<const N: usize> Default for RamStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteStore for RamStore<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn read_block(&mut self, address: usize, buf: &mut [u8]) -> StoreResult<()> {
        self.check_bounds(address, buf.len())?;
        buf.copy_from_slice(&self.bytes[address..address + buf.len()]);
        Ok(())
    }

    fn write_block(&mut self, address: usize, data: &[u8]) -> StoreResult<()> {
        self.check_bounds(address, data.len())?;
        self.bytes[address..address + data.len()].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(feature = "std")]
pub use file::FileStore;

#[cfg(feature = "std")]
mod file {
    use std::fs;
    use std::path::{Path, PathBuf};

    use crate::constants::store::ERASED_BYTE;
    use crate::errors::{StoreError, StoreResult};
    use crate::traits::ByteStore;

    /// EEPROM image kept in a file, for host-side simulation
    ///
    /// The image is read once on open. Writes stay in memory until
    /// [`commit`](ByteStore::commit), which rewrites the file once.
    #[derive(Debug)]
    pub struct FileStore {
        path: PathBuf,
        image: Vec<u8>,
        dirty: bool,
    }

    impl FileStore {
        /// Open `path`, or start an erased image of `capacity` bytes if it
        /// does not exist yet. A shorter file is padded with erased bytes; a
        /// longer one is refused.
        pub fn open(path: impl AsRef<Path>, capacity: usize) -> StoreResult<Self> {
            let path = path.as_ref().to_path_buf();
            let mut image = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
                Err(_) => return Err(StoreError::Backend { reason: "cannot read image file" }),
            };
            if image.len() > capacity {
                return Err(StoreError::OutOfBounds { address: 0, len: image.len(), capacity });
            }
            image.resize(capacity, ERASED_BYTE);
            Ok(Self { path, image, dirty: false })
        }

        /// Path of the image file
        pub fn path(&self) -> &Path {
            &self.path
        }

        /// True when writes are waiting for a commit
        pub fn is_dirty(&self) -> bool {
            self.dirty
        }
    }

    impl ByteStore for FileStore {
        fn capacity(&self) -> usize {
            self.image.len()
        }

        fn read_block(&mut self, address: usize, buf: &mut [u8]) -> StoreResult<()> {
            self.check_bounds(address, buf.len())?;
            buf.copy_from_slice(&self.image[address..address + buf.len()]);
            Ok(())
        }

        fn write_block(&mut self, address: usize, data: &[u8]) -> StoreResult<()> {
            self.check_bounds(address, data.len())?;
            self.image[address..address + data.len()].copy_from_slice(data);
            self.dirty = true;
            Ok(())
        }

        fn commit(&mut self) -> StoreResult<()> {
            if !self.dirty {
                return Ok(());
            }
            fs::write(&self.path, &self.image)
                .map_err(|_| StoreError::Backend { reason: "cannot write image file" })?;
            self.dirty = false;
            Ok(())
        }
    }

}
