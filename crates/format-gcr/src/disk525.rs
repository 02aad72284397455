//! 5.25" 6-and-2 track codec.
//!
//! Track layout per sector: address field `D5 AA 96` + 4-and-4 volume/
//! track/sector/checksum + `DE AA EB`, a sync gap, then data field
//! `D5 AA AD` + 342 encoded bytes + checksum + `DE AA EB`. Sectors sit in
//! physical order 0..16; the interleave tables map address-field sector
//! numbers to image offsets.

use format_2img::{SECTOR_SIZE, SECTORS_PER_TRACK, SectorImage, SectorOrder, TRACKS_525};
use format_woz::{DiskType, NibbleDisk};

use crate::bits::{BitReader, BitWriter};
use crate::{NIBBLE_62, decode_44, decode_nibble_62, encode_44};

/// Address-field sector → DOS 3.3 image sector.
pub const DOS_INTERLEAVE: [u8; 16] = [0, 7, 14, 6, 13, 5, 12, 4, 11, 3, 10, 2, 9, 1, 8, 15];

/// Address-field sector → ProDOS image sector.
pub const PRODOS_INTERLEAVE: [u8; 16] = [0, 8, 1, 9, 2, 10, 3, 11, 4, 12, 5, 13, 6, 14, 7, 15];

const GAP1_SYNC: u32 = 40;
const GAP2_SYNC: u32 = 8;
const GAP3_SYNC: u32 = 20;

fn interleave(order: SectorOrder) -> &'static [u8; 16] {
    match order {
        SectorOrder::Dos => &DOS_INTERLEAVE,
        SectorOrder::ProDos => &PRODOS_INTERLEAVE,
    }
}

/// 6-and-2 encode one 256-byte sector into 343 nibbles (342 + checksum).
fn encode_sector_62(w: &mut BitWriter, data: &[u8]) {
    debug_assert_eq!(data.len(), SECTOR_SIZE);
    // Fold the low two bits of each byte into 86 auxiliary bytes,
    // bit-reversed within the pair.
    let rev2 = |v: u8| ((v & 1) << 1) | ((v >> 1) & 1);
    let mut aux = [0u8; 86];
    for (i, slot) in aux.iter_mut().enumerate() {
        let mut v = rev2(data[i] & 3);
        if i + 86 < SECTOR_SIZE {
            v |= rev2(data[i + 86] & 3) << 2;
        }
        if i + 172 < SECTOR_SIZE {
            v |= rev2(data[i + 172] & 3) << 4;
        }
        *slot = v;
    }
    // Auxiliary bytes go out high-index first, then the 6-bit payload,
    // all XOR-chained; the chain residue is the checksum nibble.
    let mut last = 0u8;
    for i in (0..86).rev() {
        w.nibble(NIBBLE_62[usize::from((aux[i] ^ last) & 0x3F)]);
        last = aux[i];
    }
    for &byte in data {
        w.nibble(NIBBLE_62[usize::from(((byte >> 2) ^ last) & 0x3F)]);
        last = byte >> 2;
    }
    w.nibble(NIBBLE_62[usize::from(last & 0x3F)]);
}

/// Inverse of [`encode_sector_62`]: 343 nibbles → sector bytes, `None` on an
/// invalid nibble or checksum mismatch.
fn decode_sector_62(nibbles: &[u8]) -> Option<[u8; SECTOR_SIZE]> {
    if nibbles.len() < 343 {
        return None;
    }
    let rev2 = |v: u8| ((v & 1) << 1) | ((v >> 1) & 1);
    let mut aux = [0u8; 86];
    let mut data = [0u8; SECTOR_SIZE];
    let mut last = 0u8;
    for i in (0..86).rev() {
        let six = decode_nibble_62(nibbles[85 - i]);
        if six == 0xFF {
            return None;
        }
        aux[i] = six ^ last;
        last = aux[i];
    }
    for (i, slot) in data.iter_mut().enumerate() {
        let six = decode_nibble_62(nibbles[86 + i]);
        if six == 0xFF {
            return None;
        }
        let hi = six ^ last;
        last = hi;
        *slot = hi << 2;
    }
    let check = decode_nibble_62(nibbles[342]);
    if check == 0xFF || check != last & 0x3F {
        return None;
    }
    for i in 0..86 {
        data[i] |= rev2(aux[i] & 3);
        if i + 86 < SECTOR_SIZE {
            data[i + 86] |= rev2((aux[i] >> 2) & 3);
        }
        if i + 172 < SECTOR_SIZE {
            data[i + 172] |= rev2((aux[i] >> 4) & 3);
        }
    }
    Some(data)
}

/// Encode one full track. `sectors` is the track's 16 × 256 bytes in image
/// order. Returns (bytes, bit count).
#[must_use]
pub fn encode_track_525(
    volume: u8,
    track: u8,
    sectors: &[u8],
    order: SectorOrder,
) -> (Vec<u8>, u32) {
    let map = interleave(order);
    let mut w = BitWriter::new();
    w.sync_gap(GAP1_SYNC);
    for physical in 0..SECTORS_PER_TRACK as u8 {
        // Address field.
        w.nibble(0xD5);
        w.nibble(0xAA);
        w.nibble(0x96);
        for value in [volume, track, physical, volume ^ track ^ physical] {
            let (a, b) = encode_44(value);
            w.nibble(a);
            w.nibble(b);
        }
        w.nibble(0xDE);
        w.nibble(0xAA);
        w.nibble(0xEB);
        w.sync_gap(GAP2_SYNC);
        // Data field.
        w.nibble(0xD5);
        w.nibble(0xAA);
        w.nibble(0xAD);
        let logical = usize::from(map[usize::from(physical)]);
        let start = logical * SECTOR_SIZE;
        encode_sector_62(&mut w, &sectors[start..start + SECTOR_SIZE]);
        w.nibble(0xDE);
        w.nibble(0xAA);
        w.nibble(0xEB);
        w.sync_gap(GAP3_SYNC);
    }
    w.finish()
}

/// Decode a track's bit stream back to 16 sectors in image order.
#[must_use]
pub fn decode_track_525(bytes: &[u8], bit_count: u32, order: SectorOrder) -> Option<Vec<u8>> {
    let map = interleave(order);
    let mut out = vec![0u8; SECTORS_PER_TRACK * SECTOR_SIZE];
    let mut found = [false; SECTORS_PER_TRACK];
    let mut r = BitReader::new(bytes, bit_count);
    let mut nibbles = Vec::new();
    while let Some(n) = r.next_nibble() {
        nibbles.push(n);
    }

    let mut i = 0;
    while i + 3 <= nibbles.len() {
        if nibbles[i] == 0xD5 && nibbles[i + 1] == 0xAA && nibbles[i + 2] == 0x96 {
            if i + 11 + 3 > nibbles.len() {
                break;
            }
            let track = decode_44(nibbles[i + 5], nibbles[i + 6]);
            let sector = decode_44(nibbles[i + 7], nibbles[i + 8]);
            let _ = track;
            // Scan forward for this sector's data prologue.
            let mut j = i + 11;
            while j + 3 <= nibbles.len() {
                if nibbles[j] == 0xD5 && nibbles[j + 1] == 0xAA && nibbles[j + 2] == 0xAD {
                    let body = &nibbles[j + 3..];
                    if let Some(data) = decode_sector_62(body) {
                        let idx = usize::from(sector) & 0x0F;
                        let logical = usize::from(map[idx]);
                        out[logical * SECTOR_SIZE..(logical + 1) * SECTOR_SIZE]
                            .copy_from_slice(&data);
                        found[idx] = true;
                    }
                    break;
                }
                j += 1;
            }
            i = j;
        } else {
            i += 1;
        }
    }
    if found.iter().all(|&f| f) { Some(out) } else { None }
}

/// Convert a sector image into the in-memory nibble disk: 35 tracks, each
/// readable from the adjacent quarter-track positions as on real media.
#[must_use]
pub fn nibbilize_525(image: &SectorImage) -> NibbleDisk {
    let mut disk = NibbleDisk::new(DiskType::Disk525);
    for track in 0..TRACKS_525 {
        let (bytes, bits) = encode_track_525(image.volume, track as u8, image.track(track), image.order);
        let phys = disk.add_track(&bytes, bits);
        let qtr = track * 4;
        disk.meta_track_map[qtr] = phys;
        if qtr > 0 {
            disk.meta_track_map[qtr - 1] = phys;
        }
        if qtr + 1 < disk.meta_track_map.len() {
            disk.meta_track_map[qtr + 1] = phys;
        }
    }
    disk
}

/// Recover the sector image from a nibble disk. `None` when any track no
/// longer decodes cleanly (the eject path then falls back to writing WOZ).
#[must_use]
pub fn denibbilize_525(disk: &NibbleDisk, order: SectorOrder) -> Option<SectorImage> {
    let mut data = Vec::with_capacity(TRACKS_525 * SECTORS_PER_TRACK * SECTOR_SIZE);
    for track in 0..TRACKS_525 {
        let phys = disk.track_at(track * 4)?;
        let sectors = decode_track_525(
            disk.track_bytes(phys),
            disk.track_bit_count[usize::from(phys)],
            order,
        )?;
        data.extend_from_slice(&sectors);
    }
    SectorImage::from_bytes(data, order).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image() -> SectorImage {
        let mut data = vec![0u8; TRACKS_525 * SECTORS_PER_TRACK * SECTOR_SIZE];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = ((i * 31) ^ (i >> 8)) as u8;
        }
        SectorImage::from_bytes(data, SectorOrder::Dos).expect("sized")
    }

    #[test]
    fn sector_62_round_trip() {
        let mut sector = [0u8; SECTOR_SIZE];
        for (i, b) in sector.iter_mut().enumerate() {
            *b = (i * 7) as u8;
        }
        let mut w = BitWriter::new();
        encode_sector_62(&mut w, &sector);
        let (bytes, bits) = w.finish();
        let mut r = BitReader::new(&bytes, bits);
        let mut nibbles = Vec::new();
        while let Some(n) = r.next_nibble() {
            nibbles.push(n);
        }
        assert_eq!(nibbles.len(), 343);
        let decoded = decode_sector_62(&nibbles).expect("checksum holds");
        assert_eq!(decoded, sector);
    }

    #[test]
    fn corrupt_checksum_rejected() {
        let mut w = BitWriter::new();
        encode_sector_62(&mut w, &[0x42; SECTOR_SIZE]);
        let (bytes, bits) = w.finish();
        let mut r = BitReader::new(&bytes, bits);
        let mut nibbles = Vec::new();
        while let Some(n) = r.next_nibble() {
            nibbles.push(n);
        }
        nibbles[342] = NIBBLE_62[(decode_nibble_62(nibbles[342]) ^ 1) as usize & 0x3F];
        assert!(decode_sector_62(&nibbles).is_none());
    }

    #[test]
    fn track_round_trip() {
        let image = test_image();
        let (bytes, bits) = encode_track_525(254, 3, image.track(3), SectorOrder::Dos);
        let decoded = decode_track_525(&bytes, bits, SectorOrder::Dos).expect("all sectors");
        assert_eq!(&decoded[..], image.track(3));
    }

    #[test]
    fn image_round_trip_through_nibbles() {
        let image = test_image();
        let disk = nibbilize_525(&image);
        assert_eq!(disk.track_count(), TRACKS_525);
        // Quarter-track fan-out: the head half a step off still reads.
        assert_eq!(disk.track_at(0), Some(0));
        assert_eq!(disk.track_at(1), Some(0));
        assert_eq!(disk.track_at(2), None);
        let recovered = denibbilize_525(&disk, SectorOrder::Dos).expect("lossless");
        assert_eq!(recovered.data(), image.data());
    }
}
