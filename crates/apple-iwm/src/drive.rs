//! Drive mechanisms: 5.25" cog stepper and 3.5" command protocol.

use format_woz::NibbleDisk;

use crate::SPIN_DOWN_CLOCKS;

/// Which mechanism sits in the bay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DriveKind {
    Disk525,
    Disk35,
}

/// Head positions: 160 quarter tracks (5.25") / 80 tracks (3.5").
const MAX_QTR_TRACK_525: u8 = 159;
const MAX_TRACK_35: u8 = 79;

/// One drive bay.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Drive {
    pub kind: DriveKind,
    pub disk: Option<NibbleDisk>,
    /// Head position: quarter tracks for 5.25", whole tracks for 3.5".
    pub qtr_track_index: u8,
    /// 3.5" side selected by the head-select line.
    pub side: u8,
    /// Bit position within the current track ring.
    pub bit_index: u32,
    /// Spindle state; motor-off runs the spin-down timer.
    spinning: bool,
    spin_down_at: Option<u64>,
    /// 3.5" step direction: +1 inward, -1 outward.
    step_inward: bool,
    /// Pseudo-random bit stream state for unformatted tracks.
    random_state: u32,
}

impl Drive {
    #[must_use]
    pub fn new(kind: DriveKind) -> Self {
        Self {
            kind,
            disk: None,
            qtr_track_index: 0,
            side: 0,
            bit_index: 0,
            spinning: false,
            spin_down_at: None,
            step_inward: true,
            random_state: 1,
        }
    }

    pub fn insert_disk(&mut self, disk: NibbleDisk) {
        self.disk = Some(disk);
        self.bit_index = 0;
    }

    pub fn eject_disk(&mut self) -> Option<NibbleDisk> {
        self.disk.take()
    }

    #[must_use]
    pub fn has_disk(&self) -> bool {
        self.disk.is_some()
    }

    #[must_use]
    pub fn is_spinning(&self) -> bool {
        self.spinning
    }

    #[must_use]
    pub fn write_protected(&self) -> bool {
        self.disk.as_ref().is_some_and(|d| d.write_protected)
    }

    pub fn spin_up(&mut self) {
        self.spinning = self.disk.is_some();
        self.spin_down_at = None;
    }

    /// Begin spin-down: the platter keeps turning for a second unless the
    /// controller's no-delay mode bit is set.
    pub fn spin_down(&mut self, ts: u64, immediate: bool) {
        if immediate {
            self.spinning = false;
            self.spin_down_at = None;
        } else if self.spinning {
            self.spin_down_at = Some(ts + SPIN_DOWN_CLOCKS);
        }
    }

    /// Retire an elapsed spin-down deadline.
    pub fn update_spindle(&mut self, ts: u64) {
        if let Some(deadline) = self.spin_down_at
            && ts >= deadline
        {
            self.spinning = false;
            self.spin_down_at = None;
        }
    }

    // --- head positioning ----------------------------------------------

    /// 5.25" stepping: the four phase coils sit at quarter-track positions
    /// 2k (mod 8); energizing a coil (or an adjacent pair, for the odd
    /// positions) drags the head up to three quarter-tracks toward it.
    pub fn step_phases(&mut self, magnets: u8) {
        let Some(target) = Self::magnet_position(magnets) else {
            return;
        };
        let pos = i16::from(self.qtr_track_index % 8);
        let mut delta = i16::from(target) - pos;
        if delta > 4 {
            delta -= 8;
        } else if delta < -4 {
            delta += 8;
        }
        if delta == 4 || delta == -4 || delta == 0 {
            // Opposite coil (or already seated): no movement.
            return;
        }
        let moved = i16::from(self.qtr_track_index) + delta;
        let clamped = moved.clamp(0, i16::from(MAX_QTR_TRACK_525));
        if clamped as u8 != self.qtr_track_index {
            self.qtr_track_index = clamped as u8;
            self.rescale_bit_position();
        }
    }

    /// Where the energized magnets pull, in quarter-tracks mod 8.
    fn magnet_position(magnets: u8) -> Option<u8> {
        match magnets & 0x0F {
            0b0001 => Some(0),
            0b0011 => Some(1),
            0b0010 => Some(2),
            0b0110 => Some(3),
            0b0100 => Some(4),
            0b1100 => Some(5),
            0b1000 => Some(6),
            0b1001 => Some(7),
            _ => None,
        }
    }

    /// 3.5" command strobe. `command` is CA2:CA1 with the head-select line
    /// folded in by the caller; `ca0` rides phase 0.
    pub fn command_35(&mut self, command: u8, ca0: bool) {
        match (command & 0x03, ca0) {
            // Set step direction.
            (0b00, false) => self.step_inward = true,
            (0b00, true) => self.step_inward = false,
            // Step one track.
            (0b01, false) => {
                let track = if self.step_inward {
                    (self.qtr_track_index + 1).min(MAX_TRACK_35)
                } else {
                    self.qtr_track_index.saturating_sub(1)
                };
                self.qtr_track_index = track;
                self.rescale_bit_position();
            }
            // Motor control.
            (0b10, false) => self.spin_up(),
            (0b10, true) => {
                self.spinning = false;
                self.spin_down_at = None;
            }
            // Eject: drops the in-place sense; the host retrieves the disk
            // through the machine's eject path.
            (0b11, true) => self.spinning = false,
            _ => {}
        }
    }

    /// 3.5" status sense for the current phase selection.
    #[must_use]
    pub fn sense_35(&self, command: u8, ca0: bool) -> bool {
        match (command & 0x03, ca0) {
            (0b00, false) => !self.step_inward,
            // "Disk in place" senses low when present.
            (0b00, true) => !self.has_disk(),
            (0b01, false) => !self.is_spinning(),
            (0b01, true) => self.write_protected(),
            (0b10, false) => self.qtr_track_index != 0, // track 0 sense, low at 0
            (0b10, true) => !self
                .disk
                .as_ref()
                .is_some_and(|d| d.double_sided),
            _ => true,
        }
    }

    // --- bit ring ------------------------------------------------------

    /// Head-position entry in the disk's meta-track map.
    fn meta_index(&self) -> usize {
        match self.kind {
            DriveKind::Disk525 => usize::from(self.qtr_track_index),
            DriveKind::Disk35 => usize::from(self.qtr_track_index) * 2 + usize::from(self.side),
        }
    }

    /// Physical track under the head, if any is formatted there.
    #[must_use]
    pub fn current_track(&self) -> Option<u8> {
        self.disk.as_ref().and_then(|d| d.track_at(self.meta_index()))
    }

    fn track_bit_len(&self) -> u32 {
        self.current_track()
            .and_then(|t| {
                self.disk
                    .as_ref()
                    .map(|d| d.track_bit_count[usize::from(t)])
            })
            .unwrap_or(51_200)
    }

    /// Keep the angular position stable across a track change.
    fn rescale_bit_position(&mut self) {
        let len = self.track_bit_len();
        if len > 0 {
            self.bit_index %= len;
        }
    }

    /// Read the bit under the head and advance one bit cell. Unformatted
    /// positions yield a pseudo-random stream seeded from the track index.
    pub fn read_bit(&mut self) -> bool {
        let len = self.track_bit_len();
        let at = self.bit_index;
        self.bit_index = (self.bit_index + 1) % len.max(1);
        match self.current_track() {
            Some(track) => self
                .disk
                .as_ref()
                .is_some_and(|d| d.bit(track, at)),
            None => self.random_bit(),
        }
    }

    /// Write the bit under the head and advance.
    pub fn write_bit(&mut self, value: bool) {
        if self.write_protected() {
            // Sense line blocks the write current.
            let len = self.track_bit_len();
            self.bit_index = (self.bit_index + 1) % len.max(1);
            return;
        }
        let len = self.track_bit_len();
        let at = self.bit_index;
        self.bit_index = (self.bit_index + 1) % len.max(1);
        if let Some(track) = self.current_track()
            && let Some(disk) = self.disk.as_mut()
        {
            disk.set_bit(track, at, value);
        }
    }

    /// Xorshift stream re-seeded per head position so uninitialized tracks
    /// read the same garbage deterministically.
    fn random_bit(&mut self) -> bool {
        if self.bit_index <= 1 {
            self.random_state = u32::from(self.qtr_track_index) * 2_654_435_761 + 1;
        }
        let mut x = self.random_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.random_state = x;
        x & 1 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use format_woz::{DiskType, NibbleDisk};

    fn formatted_disk() -> NibbleDisk {
        let mut disk = NibbleDisk::new(DiskType::Disk525);
        let t0 = disk.add_track(&[0xAA; 32], 256);
        let t1 = disk.add_track(&[0x55; 32], 256);
        disk.meta_track_map[0] = t0;
        disk.meta_track_map[1] = t0;
        disk.meta_track_map[4] = t1;
        disk
    }

    #[test]
    fn stepping_walks_quarter_tracks() {
        let mut drive = Drive::new(DriveKind::Disk525);
        drive.insert_disk(formatted_disk());
        drive.step_phases(0b0001); // seat at 0
        drive.step_phases(0b0011); // adjacent pair → quarter position
        assert_eq!(drive.qtr_track_index, 1);
        drive.step_phases(0b0010);
        assert_eq!(drive.qtr_track_index, 2);
        drive.step_phases(0b0100);
        assert_eq!(drive.qtr_track_index, 4);
    }

    #[test]
    fn stepping_clamps_at_track_zero() {
        let mut drive = Drive::new(DriveKind::Disk525);
        drive.insert_disk(formatted_disk());
        drive.step_phases(0b0001);
        // Phase 3 sits "below" position 0; the head cannot go negative.
        drive.step_phases(0b1000);
        assert_eq!(drive.qtr_track_index, 0);
    }

    #[test]
    fn opposite_coil_does_not_move_head() {
        let mut drive = Drive::new(DriveKind::Disk525);
        drive.insert_disk(formatted_disk());
        drive.step_phases(0b0001);
        drive.step_phases(0b0100); // 4 quarter-tracks away: dead spot
        assert_eq!(drive.qtr_track_index, 0);
    }

    #[test]
    fn unformatted_track_reads_deterministic_noise() {
        let mut drive = Drive::new(DriveKind::Disk525);
        drive.insert_disk(formatted_disk());
        drive.qtr_track_index = 8; // nothing mapped there
        let first: Vec<bool> = (0..64).map(|_| drive.read_bit()).collect();
        drive.bit_index = 0;
        let second: Vec<bool> = (0..64).map(|_| drive.read_bit()).collect();
        assert_eq!(first, second, "same seed, same garbage");
        assert!(first.iter().any(|&b| b) && first.iter().any(|&b| !b));
    }

    #[test]
    fn spin_down_delay() {
        let mut drive = Drive::new(DriveKind::Disk525);
        drive.insert_disk(formatted_disk());
        drive.spin_up();
        drive.spin_down(0, false);
        drive.update_spindle(SPIN_DOWN_CLOCKS - 1);
        assert!(drive.is_spinning());
        drive.update_spindle(SPIN_DOWN_CLOCKS);
        assert!(!drive.is_spinning());
    }

    #[test]
    fn write_protect_blocks_writes() {
        let mut drive = Drive::new(DriveKind::Disk525);
        let mut disk = formatted_disk();
        disk.write_protected = true;
        drive.insert_disk(disk);
        drive.step_phases(0b0001);
        drive.write_bit(false);
        assert!(!drive.disk.as_ref().expect("disk").dirty);
    }

    #[test]
    fn three_five_step_commands() {
        let mut drive = Drive::new(DriveKind::Disk35);
        drive.command_35(0b00, false); // direction inward
        drive.command_35(0b01, false); // step
        drive.command_35(0b01, false);
        assert_eq!(drive.qtr_track_index, 2);
        drive.command_35(0b00, true); // direction outward
        drive.command_35(0b01, false);
        assert_eq!(drive.qtr_track_index, 1);
        assert!(drive.sense_35(0b10, false), "not at track 0");
    }
}
