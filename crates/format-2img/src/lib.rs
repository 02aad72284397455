//! 2IMG containers, raw DSK/DO/PO sector dumps, and ProDOS block images.
//!
//! Sector images are the host-side source for 5.25" disks: 35 tracks of
//! 16 × 256-byte sectors (143,360 bytes), in DOS 3.3 or ProDOS sector
//! order. Block images (.po/.hdv) back SmartPort hard disks as a flat run
//! of 512-byte blocks.

use thiserror::Error;

pub const SECTOR_SIZE: usize = 256;
pub const SECTORS_PER_TRACK: usize = 16;
pub const TRACKS_525: usize = 35;
pub const DSK_SIZE: usize = TRACKS_525 * SECTORS_PER_TRACK * SECTOR_SIZE;

pub const BLOCK_SIZE: usize = 512;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("not a 2IMG file")]
    BadMagic,
    #[error("truncated 2IMG (need {0} bytes of data)")]
    Truncated(usize),
    #[error("unsupported 2IMG image format {0}")]
    UnsupportedFormat(u32),
    #[error("invalid sector image size {0} (expected {DSK_SIZE})")]
    BadSectorImageSize(usize),
    #[error("block image size {0} is not a multiple of {BLOCK_SIZE}")]
    BadBlockImageSize(usize),
}

/// Logical sector ordering of a 5.25" dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SectorOrder {
    /// DOS 3.3 order (.dsk/.do).
    Dos,
    /// ProDOS order (.po).
    ProDos,
}

/// A raw 5.25" sector image.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorImage {
    pub order: SectorOrder,
    pub volume: u8,
    data: Vec<u8>,
}

impl SectorImage {
    pub fn from_bytes(data: Vec<u8>, order: SectorOrder) -> Result<Self, ImageError> {
        if data.len() != DSK_SIZE {
            return Err(ImageError::BadSectorImageSize(data.len()));
        }
        Ok(Self {
            order,
            volume: 254,
            data,
        })
    }

    /// One track's 16 sectors in image order.
    #[must_use]
    pub fn track(&self, track: usize) -> &[u8] {
        let start = track * SECTORS_PER_TRACK * SECTOR_SIZE;
        &self.data[start..start + SECTORS_PER_TRACK * SECTOR_SIZE]
    }

    /// One logical sector.
    #[must_use]
    pub fn sector(&self, track: usize, sector: usize) -> &[u8] {
        let start = (track * SECTORS_PER_TRACK + sector) * SECTOR_SIZE;
        &self.data[start..start + SECTOR_SIZE]
    }

    pub fn sector_mut(&mut self, track: usize, sector: usize) -> &mut [u8] {
        let start = (track * SECTORS_PER_TRACK + sector) * SECTOR_SIZE;
        &mut self.data[start..start + SECTOR_SIZE]
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A ProDOS block device image (SmartPort hard disk).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockDisk {
    data: Vec<u8>,
    pub locked: bool,
    /// Set by any block write; cleared when the host persists the image.
    pub dirty: bool,
}

impl BlockDisk {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ImageError> {
        if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
            return Err(ImageError::BadBlockImageSize(data.len()));
        }
        Ok(Self {
            data,
            locked: false,
            dirty: false,
        })
    }

    #[must_use]
    pub fn block_count(&self) -> u32 {
        (self.data.len() / BLOCK_SIZE) as u32
    }

    #[must_use]
    pub fn read_block(&self, block: u32) -> Option<&[u8]> {
        let start = block as usize * BLOCK_SIZE;
        self.data.get(start..start + BLOCK_SIZE)
    }

    pub fn write_block(&mut self, block: u32, bytes: &[u8]) -> bool {
        let start = block as usize * BLOCK_SIZE;
        if bytes.len() != BLOCK_SIZE || start + BLOCK_SIZE > self.data.len() || self.locked {
            return false;
        }
        self.data[start..start + BLOCK_SIZE].copy_from_slice(bytes);
        self.dirty = true;
        true
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// What a parsed 2IMG contains.
#[derive(Debug)]
pub enum TwoImgPayload {
    Sectors(SectorImage),
    Blocks(BlockDisk),
}

const TWOIMG_HEADER: usize = 64;

/// Parse a 2IMG container into its payload.
pub fn parse_2img(data: &[u8]) -> Result<TwoImgPayload, ImageError> {
    if data.len() < TWOIMG_HEADER || &data[0..4] != b"2IMG" {
        return Err(ImageError::BadMagic);
    }
    let u32_at = |off: usize| u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]]);
    let format = u32_at(0x0C);
    let flags = u32_at(0x10);
    let data_offset = u32_at(0x18) as usize;
    let data_len = u32_at(0x1C) as usize;
    let payload = data
        .get(data_offset..data_offset + data_len)
        .ok_or(ImageError::Truncated(data_offset + data_len))?;
    let locked = flags & 0x8000_0000 != 0;
    match format {
        0 | 1 => {
            let order = if format == 0 {
                SectorOrder::Dos
            } else {
                SectorOrder::ProDos
            };
            if payload.len() == DSK_SIZE {
                let mut image = SectorImage::from_bytes(payload.to_vec(), order)?;
                if flags & 0x0100 != 0 {
                    image.volume = (flags & 0xFF) as u8;
                }
                Ok(TwoImgPayload::Sectors(image))
            } else {
                // Larger ProDOS-order payloads are block devices.
                let mut disk = BlockDisk::from_bytes(payload.to_vec())?;
                disk.locked = locked;
                Ok(TwoImgPayload::Blocks(disk))
            }
        }
        other => Err(ImageError::UnsupportedFormat(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_2img(format: u32, payload: &[u8]) -> Vec<u8> {
        let mut file = vec![0u8; TWOIMG_HEADER];
        file[0..4].copy_from_slice(b"2IMG");
        file[4..8].copy_from_slice(b"2gs!");
        file[8..10].copy_from_slice(&(TWOIMG_HEADER as u16).to_le_bytes());
        file[10..12].copy_from_slice(&1u16.to_le_bytes());
        file[0x0C..0x10].copy_from_slice(&format.to_le_bytes());
        file[0x14..0x18].copy_from_slice(&((payload.len() / BLOCK_SIZE) as u32).to_le_bytes());
        file[0x18..0x1C].copy_from_slice(&(TWOIMG_HEADER as u32).to_le_bytes());
        file[0x1C..0x20].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        file.extend_from_slice(payload);
        file
    }

    #[test]
    fn parse_dos_order_sectors() {
        let file = make_2img(0, &vec![0xAA; DSK_SIZE]);
        match parse_2img(&file).expect("parses") {
            TwoImgPayload::Sectors(img) => {
                assert_eq!(img.order, SectorOrder::Dos);
                assert_eq!(img.sector(0, 0)[0], 0xAA);
            }
            TwoImgPayload::Blocks(_) => panic!("expected sectors"),
        }
    }

    #[test]
    fn parse_prodos_block_device() {
        let file = make_2img(1, &vec![0x55; BLOCK_SIZE * 1600]);
        match parse_2img(&file).expect("parses") {
            TwoImgPayload::Blocks(disk) => {
                assert_eq!(disk.block_count(), 1600);
            }
            TwoImgPayload::Sectors(_) => panic!("expected blocks"),
        }
    }

    #[test]
    fn reject_wrong_magic() {
        assert!(matches!(parse_2img(b"NOPE"), Err(ImageError::BadMagic)));
    }

    #[test]
    fn block_write_respects_lock_and_dirty() {
        let mut disk = BlockDisk::from_bytes(vec![0; BLOCK_SIZE * 4]).expect("valid");
        assert!(disk.write_block(2, &[0x11; BLOCK_SIZE]));
        assert!(disk.dirty);
        assert_eq!(disk.read_block(2).expect("in range")[0], 0x11);
        disk.locked = true;
        assert!(!disk.write_block(3, &[0x22; BLOCK_SIZE]));
    }

    #[test]
    fn out_of_range_block_read_is_none() {
        let disk = BlockDisk::from_bytes(vec![0; BLOCK_SIZE]).expect("valid");
        assert!(disk.read_block(1).is_none());
    }

    #[test]
    fn sector_image_size_check() {
        assert!(SectorImage::from_bytes(vec![0; 100], SectorOrder::Dos).is_err());
    }
}
