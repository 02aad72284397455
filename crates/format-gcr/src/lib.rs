//! Apple GCR nibble codecs.
//!
//! 5.25" disks use 6-and-2 encoding: each 256-byte sector becomes a 14-byte
//! address field (4-and-4 encoded) and a 349-byte data field, separated by
//! runs of 10-bit self-sync nibbles. 3.5" disks use the same 6-bit nibble
//! alphabet with zoned tracks (12 down to 8 sectors of 512 bytes as the head
//! moves inward).
//!
//! `nibbilize_*` converts a host sector/block image into the in-memory
//! [`NibbleDisk`]; `denibbilize_525` recovers the sector image on eject and
//! reports whether the conversion was lossless.

mod bits;
mod disk35;
mod disk525;

pub use bits::{BitReader, BitWriter};
pub use disk35::{TRACKS_35, denibbilize_35, nibbilize_35, sectors_per_track_35};
pub use disk525::{
    decode_track_525, denibbilize_525, encode_track_525, nibbilize_525, DOS_INTERLEAVE,
    PRODOS_INTERLEAVE,
};

/// The 64 valid 6-and-2 disk nibbles, indexed by 6-bit value.
#[rustfmt::skip]
pub const NIBBLE_62: [u8; 64] = [
    0x96, 0x97, 0x9A, 0x9B, 0x9D, 0x9E, 0x9F, 0xA6,
    0xA7, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF, 0xB2, 0xB3,
    0xB4, 0xB5, 0xB6, 0xB7, 0xB9, 0xBA, 0xBB, 0xBC,
    0xBD, 0xBE, 0xBF, 0xCB, 0xCD, 0xCE, 0xCF, 0xD3,
    0xD6, 0xD7, 0xD9, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE,
    0xDF, 0xE5, 0xE6, 0xE7, 0xE9, 0xEA, 0xEB, 0xEC,
    0xED, 0xEE, 0xEF, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6,
    0xF7, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];

/// Inverse of [`NIBBLE_62`]: disk nibble → 6-bit value, `0xFF` if invalid.
#[must_use]
pub fn decode_nibble_62(nibble: u8) -> u8 {
    // Built once; small enough that a linear probe would also do, but the
    // IWM read path decodes every byte on the disk.
    static INVERSE: [u8; 256] = build_inverse();
    INVERSE[nibble as usize]
}

const fn build_inverse() -> [u8; 256] {
    let mut table = [0xFFu8; 256];
    let mut i = 0;
    while i < 64 {
        table[NIBBLE_62[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// 4-and-4 encode (address fields): one byte → two nibbles.
#[must_use]
pub fn encode_44(value: u8) -> (u8, u8) {
    ((value >> 1) | 0xAA, value | 0xAA)
}

/// 4-and-4 decode.
#[must_use]
pub fn decode_44(first: u8, second: u8) -> u8 {
    ((first << 1) | 1) & second
}
