//! Persisted mapping from image path to its annotated ROI.
//!
//! # File format
//!
//! 1. **Magic bytes**: `ROI1` (4 bytes)
//! 2. **Version**: `u32` little-endian (4 bytes), currently 1
//! 3. **Flags**: `u32` little-endian (4 bytes), reserved
//! 4. **Payload**: bincode-encoded map of path string to `[x, y, w, h]`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::roi::Roi;

pub const STORE_MAGIC: [u8; 4] = *b"ROI1";
pub const STORE_VERSION: u32 = 1;

const HEADER_LEN: usize = 12;

/// `ROI1`, version and reserved flags
fn encode_header() -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(&STORE_MAGIC);
    header[4..8].copy_from_slice(&STORE_VERSION.to_le_bytes());
    header
}

/// Read and check the header; flags are ignored
fn read_header<R: Read>(reader: &mut R) -> StoreResult<()> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => StoreError::Deserialize("truncated header".to_string()),
        _ => StoreError::Io(e),
    })?;

    let magic: [u8; 4] = [header[0], header[1], header[2], header[3]];
    if magic != STORE_MAGIC {
        return Err(StoreError::InvalidMagic(magic));
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != STORE_VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }
    Ok(())
}

/// I/O failures inside bincode stay I/O errors; a payload cut short is a
/// decoding error.
fn payload_error(error: bincode::Error, wrap: fn(String) -> StoreError) -> StoreError {
    match *error {
        bincode::ErrorKind::Io(e) if e.kind() != ErrorKind::UnexpectedEof => StoreError::Io(e),
        other => wrap(other.to_string()),
    }
}

/// Path -> ROI mapping, kept sorted by path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoiStore {
    entries: BTreeMap<String, Roi>,
}

impl RoiStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the ROI for `path`, returning the one it replaces
    pub fn insert(&mut self, path: impl Into<String>, roi: Roi) -> Option<Roi> {
        self.entries.insert(path.into(), roi)
    }

    pub fn get(&self, path: &str) -> Option<Roi> {
        self.entries.get(path).copied()
    }

    pub fn remove(&mut self, path: &str) -> Option<Roi> {
        self.entries.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Roi)> {
        self.entries.iter()
    }

    /// Add every entry of `other`, overwriting paths present in both
    pub fn merge(&mut self, other: RoiStore) {
        self.entries.extend(other.entries);
    }

    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> StoreResult<()> {
        writer.write_all(&encode_header())?;

        bincode::serialize_into(writer, &self.entries)
            .map_err(|e| payload_error(e, StoreError::Serialize))?;

        Ok(())
    }

    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }

    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> StoreResult<Self> {
        read_header(reader)?;

        let entries: BTreeMap<String, Roi> = bincode::deserialize_from(reader)
            .map_err(|e| payload_error(e, StoreError::Deserialize))?;

        Ok(Self { entries })
    }

    pub fn from_bytes(bytes: &[u8]) -> StoreResult<Self> {
        let mut reader = std::io::Cursor::new(bytes);
        Self::read_from(&mut reader)
    }
}

impl FromIterator<(String, Roi)> for RoiStore {
    fn from_iter<T: IntoIterator<Item = (String, Roi)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RoiStore {
    type Item = (&'a String, &'a Roi);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Roi>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Check the magic bytes without decoding the payload
pub fn is_roi_store_file(path: impl AsRef<Path>) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic).is_ok() && magic == STORE_MAGIC
}
