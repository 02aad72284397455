//! WOZ v2 disk images and the in-memory nibble disk.
//!
//! The [`NibbleDisk`] is the machine's native view of a floppy: one bit
//! stream per physical track plus the quarter-track map that tells the drive
//! head which stream (if any) sits under each head position. WOZ v2 files
//! carry exactly this data, so they are parsed and written losslessly; other
//! formats are converted into this representation on mount.

mod crc;
mod woz;

pub use woz::{parse_woz, serialize_woz};

use thiserror::Error;

#[cfg(feature = "serde")]
use serde_big_array::BigArray;

/// Quarter-track positions addressable by a 5.25" head (also the TMAP size),
/// and track slots for an 80-track double-sided 3.5" disk.
pub const MAX_TRACK_COUNT: usize = 160;

/// Meta-track map entry for "no formatted track here".
pub const NO_TRACK: u8 = 0xFF;

#[derive(Debug, Error)]
pub enum WozError {
    #[error("not a WOZ2 file")]
    BadMagic,
    #[error("CRC mismatch (file corrupt)")]
    CrcMismatch,
    #[error("missing required chunk {0}")]
    MissingChunk(&'static str),
    #[error("malformed chunk {0}")]
    MalformedChunk(&'static str),
    #[error("unsupported disk type {0}")]
    UnsupportedDiskType(u8),
}

/// Physical media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiskType {
    /// 5.25" 140K (quarter-track head positions).
    Disk525,
    /// 3.5" 400K/800K (80 tracks per side).
    Disk35,
}

/// A nibbilized floppy disk: the ring of encoded bits per physical track.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NibbleDisk {
    pub disk_type: DiskType,
    /// Concatenated per-track bit buffers.
    pub bits: Vec<u8>,
    /// Byte offset of each track's buffer within `bits`.
    pub track_byte_offset: Vec<u32>,
    /// Bytes reserved for each track.
    pub track_byte_count: Vec<u32>,
    /// Valid bits in each track (the ring length).
    pub track_bit_count: Vec<u32>,
    /// Head position → physical track index, `NO_TRACK` when unformatted.
    /// Quarter tracks for 5.25"; `track * 2 + side` for 3.5".
    #[cfg_attr(feature = "serde", serde(with = "BigArray"))]
    pub meta_track_map: [u8; MAX_TRACK_COUNT],
    /// Whether each physical track holds real data (false → the drive sees
    /// random bits).
    pub track_initialized: Vec<bool>,
    /// Write-protect tab state.
    pub write_protected: bool,
    /// 3.5" only: both sides formatted.
    pub double_sided: bool,
    /// Set by any head write; cleared when the host persists the disk.
    pub dirty: bool,
}

impl NibbleDisk {
    /// An empty (fully unformatted) disk of the given type.
    #[must_use]
    pub fn new(disk_type: DiskType) -> Self {
        Self {
            disk_type,
            bits: Vec::new(),
            track_byte_offset: Vec::new(),
            track_byte_count: Vec::new(),
            track_bit_count: Vec::new(),
            meta_track_map: [NO_TRACK; MAX_TRACK_COUNT],
            track_initialized: Vec::new(),
            write_protected: false,
            double_sided: disk_type == DiskType::Disk35,
            dirty: false,
        }
    }

    /// Number of physical track buffers.
    #[must_use]
    pub fn track_count(&self) -> usize {
        self.track_bit_count.len()
    }

    /// Append a track buffer, returning its physical index.
    pub fn add_track(&mut self, data: &[u8], bit_count: u32) -> u8 {
        let index = self.track_count() as u8;
        self.track_byte_offset.push(self.bits.len() as u32);
        self.track_byte_count.push(data.len() as u32);
        self.track_bit_count.push(bit_count);
        self.track_initialized.push(true);
        self.bits.extend_from_slice(data);
        index
    }

    /// The physical track under a head position, if formatted.
    #[must_use]
    pub fn track_at(&self, meta_index: usize) -> Option<u8> {
        match self.meta_track_map.get(meta_index) {
            Some(&t) if t != NO_TRACK => Some(t),
            _ => None,
        }
    }

    /// Read one bit from a track's ring.
    #[must_use]
    pub fn bit(&self, track: u8, bit_index: u32) -> bool {
        let t = track as usize;
        let bit = bit_index % self.track_bit_count[t].max(1);
        let byte = self.track_byte_offset[t] + bit / 8;
        self.bits[byte as usize] & (0x80 >> (bit % 8)) != 0
    }

    /// Write one bit into a track's ring and mark the disk dirty.
    pub fn set_bit(&mut self, track: u8, bit_index: u32, value: bool) {
        let t = track as usize;
        let bit = bit_index % self.track_bit_count[t].max(1);
        let byte = (self.track_byte_offset[t] + bit / 8) as usize;
        let mask = 0x80 >> (bit % 8);
        if value {
            self.bits[byte] |= mask;
        } else {
            self.bits[byte] &= !mask;
        }
        self.dirty = true;
    }

    /// Borrow one track's byte buffer.
    #[must_use]
    pub fn track_bytes(&self, track: u8) -> &[u8] {
        let t = track as usize;
        let start = self.track_byte_offset[t] as usize;
        &self.bits[start..start + self.track_byte_count[t] as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_disk_has_no_tracks() {
        let disk = NibbleDisk::new(DiskType::Disk525);
        assert_eq!(disk.track_count(), 0);
        assert_eq!(disk.track_at(0), None);
    }

    #[test]
    fn add_track_and_read_bits() {
        let mut disk = NibbleDisk::new(DiskType::Disk525);
        let track = disk.add_track(&[0b1010_0000], 4);
        disk.meta_track_map[0] = track;
        assert!(disk.bit(track, 0));
        assert!(!disk.bit(track, 1));
        assert!(disk.bit(track, 2));
        // Ring wraps at the bit count.
        assert!(disk.bit(track, 4));
    }

    #[test]
    fn set_bit_marks_dirty() {
        let mut disk = NibbleDisk::new(DiskType::Disk525);
        let track = disk.add_track(&[0x00], 8);
        assert!(!disk.dirty);
        disk.set_bit(track, 3, true);
        assert!(disk.dirty);
        assert!(disk.bit(track, 3));
    }
}
