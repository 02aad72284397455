//! 3.5" zoned GCR track codec.
//!
//! The 3.5" drive spins at constant angular velocity per zone: 16-track
//! zones hold 12, 11, 10, 9, then 8 sectors of 512 bytes, giving 800 blocks
//! per side. Sectors use the 6-and-2 nibble alphabet with 3-bytes-in-4-
//! nibbles payload groups. Head positions map as `track * 2 + side`.

use format_2img::{BLOCK_SIZE, BlockDisk};
use format_woz::{DiskType, NibbleDisk};

use crate::bits::{BitReader, BitWriter};
use crate::{NIBBLE_62, decode_nibble_62};

pub const TRACKS_35: usize = 80;
const ZONE_TRACKS: usize = 16;
const SECTOR_GAP_SYNC: u32 = 10;

/// Sectors per track for a 3.5" track number.
#[must_use]
pub fn sectors_per_track_35(track: usize) -> usize {
    12 - (track / ZONE_TRACKS).min(4)
}

/// Blocks preceding cylinder `track` (both sides of all outer cylinders).
fn cylinder_base(track: usize, sides: usize) -> usize {
    (0..track).map(|t| sectors_per_track_35(t) * sides).sum()
}

fn encode_sector_35(w: &mut BitWriter, track: usize, side: usize, sector: usize, double: bool, data: &[u8]) {
    debug_assert_eq!(data.len(), BLOCK_SIZE);
    w.sync_gap(SECTOR_GAP_SYNC);
    // Address field.
    w.nibble(0xD5);
    w.nibble(0xAA);
    w.nibble(0x96);
    let header = [
        (track & 0x3F) as u8,
        sector as u8,
        ((side << 5) as u8) | ((track >> 6) as u8),
        if double { 0x22 } else { 0x02 },
    ];
    let checksum = header.iter().fold(0u8, |a, &b| a ^ b);
    for value in header.iter().copied().chain([checksum]) {
        w.nibble(NIBBLE_62[usize::from(value & 0x3F)]);
    }
    w.nibble(0xDE);
    w.nibble(0xAA);
    w.sync_gap(4);
    // Data field: sector tag nibble, then 512 bytes in 3-in-4 groups.
    w.nibble(0xD5);
    w.nibble(0xAA);
    w.nibble(0xAD);
    w.nibble(NIBBLE_62[sector & 0x3F]);
    let mut csum = 0u8;
    for chunk in data.chunks(3) {
        let b0 = chunk[0];
        let b1 = chunk.get(1).copied().unwrap_or(0);
        let b2 = chunk.get(2).copied().unwrap_or(0);
        csum ^= b0 ^ b1 ^ b2;
        // Top-bits nibble first, then the three 6-bit remainders.
        let top = ((b0 >> 6) << 4) | ((b1 >> 6) << 2) | (b2 >> 6);
        w.nibble(NIBBLE_62[usize::from(top)]);
        w.nibble(NIBBLE_62[usize::from(b0 & 0x3F)]);
        w.nibble(NIBBLE_62[usize::from(b1 & 0x3F)]);
        w.nibble(NIBBLE_62[usize::from(b2 & 0x3F)]);
    }
    w.nibble(NIBBLE_62[usize::from(csum & 0x3F)]);
    w.nibble(NIBBLE_62[usize::from(csum >> 6)]);
    w.nibble(0xDE);
    w.nibble(0xAA);
}

fn decode_sector_35(nibbles: &[u8]) -> Option<(usize, [u8; BLOCK_SIZE])> {
    let sector = decode_nibble_62(*nibbles.first()?);
    if sector == 0xFF {
        return None;
    }
    let groups = BLOCK_SIZE.div_ceil(3);
    let mut data = [0u8; BLOCK_SIZE];
    let mut csum = 0u8;
    for g in 0..groups {
        let at = 1 + g * 4;
        let top = decode_nibble_62(*nibbles.get(at)?);
        let s0 = decode_nibble_62(*nibbles.get(at + 1)?);
        let s1 = decode_nibble_62(*nibbles.get(at + 2)?);
        let s2 = decode_nibble_62(*nibbles.get(at + 3)?);
        if top == 0xFF || s0 == 0xFF || s1 == 0xFF || s2 == 0xFF {
            return None;
        }
        let bytes = [
            ((top >> 4) << 6) | s0,
            (((top >> 2) & 3) << 6) | s1,
            ((top & 3) << 6) | s2,
        ];
        for (k, &b) in bytes.iter().enumerate() {
            let index = g * 3 + k;
            if index < BLOCK_SIZE {
                data[index] = b;
                csum ^= b;
            }
        }
    }
    let at = 1 + groups * 4;
    let lo = decode_nibble_62(*nibbles.get(at)?);
    let hi = decode_nibble_62(*nibbles.get(at + 1)?);
    if lo == 0xFF || hi == 0xFF || lo != csum & 0x3F || hi != csum >> 6 {
        return None;
    }
    Some((usize::from(sector), data))
}

/// Nibbilize an 800K (double-sided) or 400K (single-sided) ProDOS block
/// image into a 3.5" nibble disk. `None` when the block count fits neither.
#[must_use]
pub fn nibbilize_35(image: &BlockDisk) -> Option<NibbleDisk> {
    let sides = match image.block_count() {
        1600 => 2,
        800 => 1,
        _ => return None,
    };
    let mut disk = NibbleDisk::new(DiskType::Disk35);
    disk.double_sided = sides == 2;
    disk.write_protected = image.locked;
    for track in 0..TRACKS_35 {
        let spt = sectors_per_track_35(track);
        let base = cylinder_base(track, sides);
        for side in 0..sides {
            let mut w = BitWriter::new();
            for sector in 0..spt {
                let block = (base + side * spt + sector) as u32;
                let data = image.read_block(block)?;
                encode_sector_35(&mut w, track, side, sector, sides == 2, data);
            }
            let (bytes, bits) = w.finish();
            let phys = disk.add_track(&bytes, bits);
            disk.meta_track_map[track * 2 + side] = phys;
        }
    }
    Some(disk)
}

/// Recover the block image from a 3.5" nibble disk; `None` when any sector
/// no longer decodes.
#[must_use]
pub fn denibbilize_35(disk: &NibbleDisk) -> Option<BlockDisk> {
    let sides = if disk.double_sided { 2 } else { 1 };
    let total_blocks = cylinder_base(TRACKS_35, sides);
    let mut blocks = vec![0u8; total_blocks * BLOCK_SIZE];
    for track in 0..TRACKS_35 {
        let spt = sectors_per_track_35(track);
        let base = cylinder_base(track, sides);
        for side in 0..sides {
            let phys = disk.track_at(track * 2 + side)?;
            let mut r = BitReader::new(
                disk.track_bytes(phys),
                disk.track_bit_count[usize::from(phys)],
            );
            let mut nibbles = Vec::new();
            while let Some(n) = r.next_nibble() {
                nibbles.push(n);
            }
            let mut i = 0;
            let mut seen = 0;
            while i + 3 <= nibbles.len() {
                if nibbles[i] == 0xD5 && nibbles[i + 1] == 0xAA && nibbles[i + 2] == 0xAD {
                    let (sector, data) = decode_sector_35(&nibbles[i + 3..])?;
                    if sector >= spt {
                        return None;
                    }
                    let block = base + side * spt + sector;
                    blocks[block * BLOCK_SIZE..(block + 1) * BLOCK_SIZE].copy_from_slice(&data);
                    seen += 1;
                    i += 3;
                } else {
                    i += 1;
                }
            }
            if seen != spt {
                return None;
            }
        }
    }
    BlockDisk::from_bytes(blocks).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_blocks(count: usize) -> BlockDisk {
        let mut data = vec![0u8; count * BLOCK_SIZE];
        for (i, b) in data.iter_mut().enumerate() {
            *b = ((i * 13) ^ (i >> 9)) as u8;
        }
        BlockDisk::from_bytes(data).expect("sized")
    }

    #[test]
    fn zone_sector_counts() {
        assert_eq!(sectors_per_track_35(0), 12);
        assert_eq!(sectors_per_track_35(15), 12);
        assert_eq!(sectors_per_track_35(16), 11);
        assert_eq!(sectors_per_track_35(79), 8);
        // 800K double-sided total.
        assert_eq!(cylinder_base(TRACKS_35, 2), 1600);
    }

    #[test]
    fn sector_35_round_trip() {
        let mut w = BitWriter::new();
        let data: Vec<u8> = (0..BLOCK_SIZE).map(|i| (i * 5) as u8).collect();
        encode_sector_35(&mut w, 17, 1, 6, true, &data);
        let (bytes, bits) = w.finish();
        let mut r = BitReader::new(&bytes, bits);
        let mut nibbles = Vec::new();
        while let Some(n) = r.next_nibble() {
            nibbles.push(n);
        }
        let at = nibbles
            .windows(3)
            .position(|w| w == [0xD5, 0xAA, 0xAD])
            .expect("data prologue");
        let (sector, decoded) = decode_sector_35(&nibbles[at + 3..]).expect("clean");
        assert_eq!(sector, 6);
        assert_eq!(&decoded[..], &data[..]);
    }

    #[test]
    fn image_round_trip_800k() {
        let image = test_blocks(1600);
        let disk = nibbilize_35(&image).expect("800K");
        assert_eq!(disk.track_count(), TRACKS_35 * 2);
        let recovered = denibbilize_35(&disk).expect("lossless");
        assert_eq!(recovered.data(), image.data());
    }

    #[test]
    fn single_sided_400k() {
        let image = test_blocks(800);
        let disk = nibbilize_35(&image).expect("400K");
        assert!(!disk.double_sided);
        assert_eq!(disk.track_count(), TRACKS_35);
        assert_eq!(disk.track_at(1), None, "side 1 unformatted");
    }
}
