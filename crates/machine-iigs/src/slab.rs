//! Bump arena for machine-owned memory.
//!
//! All RAM, Mega II, ROM, and card page storage is carved from one arena
//! allocated at construction and sized from the configuration. Snapshots
//! record the arena size so a load can pre-size it identically.

use serde::{Deserialize, Serialize};

/// A carved region: offset + length within the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub start: usize,
    pub len: usize,
}

/// The arena.
#[derive(Debug, Serialize, Deserialize)]
pub struct Slab {
    data: Vec<u8>,
    head: usize,
}

impl Slab {
    /// Allocate the arena up front. Fails by returning `None` rather than
    /// aborting, so the machine can surface `AllocationFailed`.
    #[must_use]
    pub fn new(capacity: usize) -> Option<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity).ok()?;
        data.resize(capacity, 0);
        Some(Self { data, head: 0 })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.head
    }

    /// Carve a region. `None` when the arena is exhausted — construction
    /// sizes the arena exactly, so this is a configuration bug surfaced as
    /// an allocation failure.
    pub fn alloc(&mut self, len: usize) -> Option<Region> {
        if self.head + len > self.data.len() {
            return None;
        }
        let region = Region {
            start: self.head,
            len,
        };
        self.head += len;
        Some(region)
    }

    #[must_use]
    pub fn get(&self, region: Region) -> &[u8] {
        &self.data[region.start..region.start + region.len]
    }

    pub fn get_mut(&mut self, region: Region) -> &mut [u8] {
        &mut self.data[region.start..region.start + region.len]
    }

    /// Byte accessors used on the hot memory path.
    #[inline]
    #[must_use]
    pub fn byte(&self, region: Region, offset: usize) -> u8 {
        self.data[region.start + offset]
    }

    #[inline]
    pub fn set_byte(&mut self, region: Region, offset: usize, value: u8) {
        self.data[region.start + offset] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_carves_disjoint_regions() {
        let mut slab = Slab::new(1024).expect("small arena");
        let a = slab.alloc(256).expect("fits");
        let b = slab.alloc(256).expect("fits");
        assert_eq!(a.start, 0);
        assert_eq!(b.start, 256);
        slab.get_mut(a).fill(0xAA);
        slab.get_mut(b).fill(0xBB);
        assert_eq!(slab.byte(a, 255), 0xAA);
        assert_eq!(slab.byte(b, 0), 0xBB);
    }

    #[test]
    fn exhaustion_returns_none() {
        let mut slab = Slab::new(100).expect("small arena");
        assert!(slab.alloc(64).is_some());
        assert!(slab.alloc(64).is_none());
        assert_eq!(slab.remaining(), 36);
    }
}
