//! WOZ v2 chunk parsing and serialization.
//!
//! Layout: 12-byte header (`WOZ2`, sentinel bytes, CRC-32 of the rest of the
//! file), then `INFO`/`TMAP`/`TRKS` chunks. `META` and `WRIT` chunks are
//! preserved-by-ignoring: they carry no emulation state.

use crate::crc::crc32;
use crate::{DiskType, MAX_TRACK_COUNT, NO_TRACK, NibbleDisk, WozError};

const HEADER_LEN: usize = 12;
const INFO_LEN: usize = 60;
const TRKS_ENTRIES: usize = 160;
const BLOCK: usize = 512;

fn chunk<'d>(data: &'d [u8], id: &[u8; 4]) -> Option<&'d [u8]> {
    let mut at = HEADER_LEN;
    while at + 8 <= data.len() {
        let size = u32::from_le_bytes([data[at + 4], data[at + 5], data[at + 6], data[at + 7]])
            as usize;
        let body = at + 8;
        if &data[at..at + 4] == id {
            return data.get(body..body + size);
        }
        at = body + size;
    }
    None
}

/// Parse a WOZ v2 image into a [`NibbleDisk`].
pub fn parse_woz(data: &[u8]) -> Result<NibbleDisk, WozError> {
    if data.len() < HEADER_LEN || &data[0..4] != b"WOZ2" {
        return Err(WozError::BadMagic);
    }
    let stored_crc = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
    if stored_crc != 0 && crc32(&data[HEADER_LEN..]) != stored_crc {
        return Err(WozError::CrcMismatch);
    }

    let info = chunk(data, b"INFO").ok_or(WozError::MissingChunk("INFO"))?;
    if info.len() < INFO_LEN {
        return Err(WozError::MalformedChunk("INFO"));
    }
    let disk_type = match info[1] {
        1 => DiskType::Disk525,
        2 => DiskType::Disk35,
        other => return Err(WozError::UnsupportedDiskType(other)),
    };

    let tmap = chunk(data, b"TMAP").ok_or(WozError::MissingChunk("TMAP"))?;
    if tmap.len() < MAX_TRACK_COUNT {
        return Err(WozError::MalformedChunk("TMAP"));
    }

    let trks = chunk(data, b"TRKS").ok_or(WozError::MissingChunk("TRKS"))?;
    if trks.len() < TRKS_ENTRIES * 8 {
        return Err(WozError::MalformedChunk("TRKS"));
    }

    let mut disk = NibbleDisk::new(disk_type);
    disk.write_protected = info[2] != 0;
    disk.double_sided = disk_type == DiskType::Disk35 && info[37] == 2;

    // TRKS entries are indexed by TMAP value; remap to the dense physical
    // track indices we allocate.
    let mut remap = [NO_TRACK; TRKS_ENTRIES];
    for entry in 0..TRKS_ENTRIES {
        let e = &trks[entry * 8..entry * 8 + 8];
        let start_block = u16::from_le_bytes([e[0], e[1]]) as usize;
        let block_count = u16::from_le_bytes([e[2], e[3]]) as usize;
        let bit_count = u32::from_le_bytes([e[4], e[5], e[6], e[7]]);
        if block_count == 0 || bit_count == 0 {
            continue;
        }
        let start = start_block * BLOCK;
        let end = start + block_count * BLOCK;
        let bytes = data
            .get(start..end)
            .ok_or(WozError::MalformedChunk("TRKS"))?;
        remap[entry] = disk.add_track(bytes, bit_count);
    }
    for (meta, &raw) in disk.meta_track_map.iter_mut().zip(tmap.iter()) {
        *meta = match remap.get(raw as usize) {
            Some(&mapped) => mapped,
            None => NO_TRACK,
        };
    }
    Ok(disk)
}

/// Serialize a [`NibbleDisk`] back to a WOZ v2 image.
#[must_use]
pub fn serialize_woz(disk: &NibbleDisk) -> Vec<u8> {
    let mut info = [0u8; INFO_LEN];
    info[0] = 2; // INFO version
    info[1] = match disk.disk_type {
        DiskType::Disk525 => 1,
        DiskType::Disk35 => 2,
    };
    info[2] = u8::from(disk.write_protected);
    info[5..5 + 6].copy_from_slice(b"emu2gs");
    info[37] = if disk.double_sided { 2 } else { 1 };
    info[39] = match disk.disk_type {
        DiskType::Disk525 => 32, // 4 µs bit cells in 125 ns units
        DiskType::Disk35 => 16,
    };

    // Track data begins at the first 512-byte block after the fixed chunks:
    // header + INFO + TMAP + TRKS entry table.
    let trks_body = HEADER_LEN + 8 + INFO_LEN + 8 + MAX_TRACK_COUNT + 8;
    let mut first_block = (trks_body + TRKS_ENTRIES * 8).div_ceil(BLOCK);

    let mut entries = Vec::with_capacity(TRKS_ENTRIES * 8);
    let mut bits_blob = Vec::new();
    for track in 0..disk.track_count() {
        let bytes = disk.track_bytes(track as u8);
        let block_count = bytes.len().div_ceil(BLOCK);
        entries.extend_from_slice(&(first_block as u16).to_le_bytes());
        entries.extend_from_slice(&(block_count as u16).to_le_bytes());
        entries.extend_from_slice(&disk.track_bit_count[track].to_le_bytes());
        bits_blob.extend_from_slice(bytes);
        bits_blob.resize(bits_blob.len() + (block_count * BLOCK - bytes.len()), 0);
        first_block += block_count;
    }
    entries.resize(TRKS_ENTRIES * 8, 0);

    let mut out = Vec::new();
    out.extend_from_slice(b"WOZ2");
    out.extend_from_slice(&[0xFF, 0x0A, 0x0D, 0x0A]);
    out.extend_from_slice(&[0; 4]); // CRC placeholder
    out.extend_from_slice(b"INFO");
    out.extend_from_slice(&(INFO_LEN as u32).to_le_bytes());
    out.extend_from_slice(&info);
    out.extend_from_slice(b"TMAP");
    out.extend_from_slice(&(MAX_TRACK_COUNT as u32).to_le_bytes());
    out.extend_from_slice(&disk.meta_track_map);
    out.extend_from_slice(b"TRKS");
    out.extend_from_slice(&((entries.len() + bits_blob.len()) as u32).to_le_bytes());
    debug_assert_eq!(out.len(), trks_body);
    out.extend_from_slice(&entries);
    // Pad so track data starts on its block boundary.
    out.resize(first_block_start(&out), 0);
    out.extend_from_slice(&bits_blob);

    let crc = crc32(&out[HEADER_LEN..]);
    out[8..12].copy_from_slice(&crc.to_le_bytes());
    out
}

fn first_block_start(out: &[u8]) -> usize {
    out.len().div_ceil(BLOCK) * BLOCK
}
