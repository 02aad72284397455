//! Banked memory: 256 page descriptors per bank, rebuilt on softswitch
//! changes.
//!
//! Bank classes: fast RAM (banks $00..N, with the Apple II softswitch
//! aliasing applied to banks $00/$01), the two Mega II banks $E0/$E1, and
//! ROM in the top banks. Every page either resolves to backing storage or
//! carries an MMIO flag; nothing dangles. Writes to shadowed pages in
//! banks $00/$01 are mirrored into $E0/$E1.

use crate::slab::{Region, Slab};

pub const BANK_COUNT: usize = 256;
pub const BANK_SIZE: usize = 0x1_0000;
const MEGA2_BANK0: u8 = 0xE0;

/// Descriptor flag bits.
pub mod page_flags {
    /// Reads dispatch to the MMIO handler.
    pub const MMIO_READ: u8 = 0x01;
    /// Writes dispatch to the MMIO handler.
    pub const MMIO_WRITE: u8 = 0x02;
    /// Accesses synchronize to the Mega II (slow) bus.
    pub const MEGA2: u8 = 0x04;
    /// Writes are dropped (ROM, write-protected LC).
    pub const WRITE_PROTECT: u8 = 0x08;
    /// Writes mirror into the corresponding Mega II bank.
    pub const SHADOW: u8 = 0x10;
    /// No backing storage: reads return $FF.
    pub const UNMAPPED: u8 = 0x20;
}

/// One page's routing.
#[derive(Debug, Clone, Copy, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct PageDescriptor {
    pub read_bank: u8,
    pub read_page: u8,
    pub write_bank: u8,
    pub write_page: u8,
    pub flags: u8,
}

/// Shadow register ($C035) inhibit bits: set = shadowing off.
pub mod shadow_bits {
    pub const TEXT1: u8 = 0x01;
    pub const HIRES1: u8 = 0x02;
    pub const HIRES2: u8 = 0x04;
    pub const SUPER_HIRES: u8 = 0x08;
    pub const AUX_HIRES: u8 = 0x10;
    pub const TEXT2: u8 = 0x20;
    /// Banks $00/$01 lose the I/O + language card overlay entirely.
    pub const IOLC: u8 = 0x40;
}

/// The softswitch state the bank map derives from.
#[derive(Debug, Clone, Copy, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SwitchState {
    pub store80: bool,
    pub page2: bool,
    pub hires: bool,
    pub ramrd: bool,
    pub ramwrt: bool,
    pub altzp: bool,
    pub intcxrom: bool,
    pub slotc3rom: bool,
    /// $C02D: bit n routes slot n's $CnXX page to the card.
    pub slotromsel: u8,
    /// $C035 inhibit bits.
    pub shadow: u8,
    // Language card.
    pub lc_bank2: bool,
    pub lc_read_ram: bool,
    pub lc_write_enable: bool,
    pub lc_prewrite: bool,
}

/// The memory subsystem.
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Memory {
    pub slab: Slab,
    ram: Region,
    mega2: Region,
    rom: Region,
    pub ram_banks: u8,
    pub rom_banks: u8,
    pub switches: SwitchState,
    #[serde(skip)]
    bank_map: Vec<[PageDescriptor; 256]>,
    map_dirty: bool,
}

impl Memory {
    /// Carve RAM, Mega II, and ROM from the slab and load the ROM image.
    /// `None` when the arena is too small (AllocationFailed upstream).
    pub fn new(mut slab: Slab, ram_banks: u8, rom_image: &[u8]) -> Option<Self> {
        let rom_banks = (rom_image.len().div_ceil(BANK_SIZE)).clamp(1, 4) as u8;
        let ram = slab.alloc(usize::from(ram_banks) * BANK_SIZE)?;
        let mega2 = slab.alloc(2 * BANK_SIZE)?;
        let rom = slab.alloc(usize::from(rom_banks) * BANK_SIZE)?;
        let dst = slab.get_mut(rom);
        let copy_len = rom_image.len().min(dst.len());
        dst[..copy_len].copy_from_slice(&rom_image[..copy_len]);
        let mut memory = Self {
            slab,
            ram,
            mega2,
            rom,
            ram_banks,
            rom_banks,
            switches: SwitchState::default(),
            bank_map: Vec::new(),
            map_dirty: false,
        };
        memory.rebuild();
        Some(memory)
    }

    /// Arena bytes a configuration needs (used to size the slab).
    #[must_use]
    pub fn arena_size(ram_banks: u8, rom_len: usize) -> usize {
        let rom_banks = rom_len.div_ceil(BANK_SIZE).clamp(1, 4);
        (usize::from(ram_banks) + 2 + rom_banks) * BANK_SIZE
    }

    /// First ROM bank number ($FC for a 256 KiB ROM).
    #[must_use]
    pub fn rom_first_bank(&self) -> u8 {
        (BANK_COUNT as u16 - u16::from(self.rom_banks)) as u8
    }

    /// Mark the map stale; callers batch rebuilds per MMIO access.
    pub fn invalidate_map(&mut self) {
        self.map_dirty = true;
    }

    /// Rebuild if any softswitch changed since the last access.
    pub fn sync_map(&mut self) {
        if self.map_dirty || self.bank_map.is_empty() {
            self.rebuild();
        }
    }

    #[must_use]
    pub fn descriptor(&self, addr: u32) -> PageDescriptor {
        let bank = (addr >> 16) as usize & 0xFF;
        let page = (addr >> 8) as usize & 0xFF;
        self.bank_map[bank][page]
    }

    /// Read through a descriptor (MMIO pages never reach this).
    #[must_use]
    pub fn read_descriptor(&self, desc: PageDescriptor, offset: u8) -> u8 {
        if desc.flags & page_flags::UNMAPPED != 0 {
            return 0xFF;
        }
        match self.backing(desc.read_bank) {
            Some((region, bank_base)) => self.slab.byte(
                region,
                bank_base + usize::from(desc.read_page) * 256 + usize::from(offset),
            ),
            None => 0xFF,
        }
    }

    /// Write through a descriptor, applying shadow mirroring. The mirror
    /// follows the write target's bank parity, so aux-routed writes
    /// (80STORE/PAGE2, RAMWRT) land in $E1.
    pub fn write_descriptor(&mut self, desc: PageDescriptor, offset: u8, value: u8) {
        if desc.flags & (page_flags::UNMAPPED | page_flags::WRITE_PROTECT) != 0 {
            return;
        }
        if let Some((region, bank_base)) = self.backing(desc.write_bank) {
            self.slab.set_byte(
                region,
                bank_base + usize::from(desc.write_page) * 256 + usize::from(offset),
                value,
            );
        }
        if desc.flags & page_flags::SHADOW != 0 {
            let shadow_bank = MEGA2_BANK0 + (desc.write_bank & 1);
            if let Some((region, bank_base)) = self.backing(shadow_bank) {
                self.slab.set_byte(
                    region,
                    bank_base + usize::from(desc.write_page) * 256 + usize::from(offset),
                    value,
                );
            }
        }
    }

    /// Storage region + in-region bank base for a physical bank.
    fn backing(&self, bank: u8) -> Option<(Region, usize)> {
        if bank < self.ram_banks {
            Some((self.ram, usize::from(bank) * BANK_SIZE))
        } else if bank == 0xE0 || bank == 0xE1 {
            Some((self.mega2, usize::from(bank - MEGA2_BANK0) * BANK_SIZE))
        } else if bank >= self.rom_first_bank() {
            Some((self.rom, usize::from(bank - self.rom_first_bank()) * BANK_SIZE))
        } else {
            None
        }
    }

    /// Debug/render view of a Mega II bank.
    #[must_use]
    pub fn mega2_bank(&self, bank: u8) -> &[u8] {
        let base = usize::from(bank & 1) * BANK_SIZE;
        &self.slab.get(self.mega2)[base..base + BANK_SIZE]
    }

    pub fn mega2_bank_mut(&mut self, bank: u8) -> &mut [u8] {
        let base = usize::from(bank & 1) * BANK_SIZE;
        &mut self.slab.get_mut(self.mega2)[base..base + BANK_SIZE]
    }

    /// Side-effect-free read at a 24-bit address (debugger/test peek).
    #[must_use]
    pub fn peek(&self, addr: u32) -> u8 {
        let desc = self.descriptor(addr);
        self.read_descriptor(desc, addr as u8)
    }

    // --- language card softswitches ------------------------------------

    /// $C080-$C08F access. Odd offsets require the classic double read to
    /// enable writes; any write access drops the pre-write latch.
    pub fn lc_access(&mut self, offset: u8, is_write: bool) {
        let offset = offset & 0x0F;
        let sw = &mut self.switches;
        sw.lc_bank2 = offset < 8;
        sw.lc_read_ram = matches!(offset & 3, 0 | 3);
        if offset & 1 != 0 {
            if is_write {
                sw.lc_prewrite = false;
            } else {
                if sw.lc_prewrite {
                    sw.lc_write_enable = true;
                }
                sw.lc_prewrite = true;
            }
        } else {
            sw.lc_prewrite = false;
            sw.lc_write_enable = false;
        }
        self.invalidate_map();
    }

    // --- bank map construction -----------------------------------------

    fn rebuild(&mut self) {
        self.map_dirty = false;
        if self.bank_map.is_empty() {
            self.bank_map = vec![[PageDescriptor::default(); 256]; BANK_COUNT];
        }
        let rom_first = self.rom_first_bank();
        for bank in 0..BANK_COUNT as u16 {
            let bank = bank as u8;
            let map = if bank < self.ram_banks {
                if bank < 2 {
                    self.build_apple2_bank(bank)
                } else {
                    Self::identity_bank(bank, 0)
                }
            } else if bank == 0xE0 || bank == 0xE1 {
                self.build_mega2_bank(bank)
            } else if bank >= rom_first {
                Self::identity_bank(bank, page_flags::WRITE_PROTECT)
            } else {
                Self::identity_bank(bank, page_flags::UNMAPPED)
            };
            self.bank_map[usize::from(bank)] = map;
        }
    }

    fn identity_bank(bank: u8, flags: u8) -> [PageDescriptor; 256] {
        let mut map = [PageDescriptor::default(); 256];
        for (page, desc) in map.iter_mut().enumerate() {
            *desc = PageDescriptor {
                read_bank: bank,
                read_page: page as u8,
                write_bank: bank,
                write_page: page as u8,
                flags,
            };
        }
        map
    }

    /// Banks $00/$01: the Apple II compatibility view. Bank 0 honors the
    /// RAMRD/RAMWRT/ALTZP/80STORE aliasing onto bank 1; both banks carry
    /// the I/O page, slot ROM, language card, and shadow mirrors.
    fn build_apple2_bank(&self, bank: u8) -> [PageDescriptor; 256] {
        let sw = self.switches;
        let mut map = Self::identity_bank(bank, 0);
        if bank == 0 {
            let aux = |on: bool| u8::from(on);
            // Zero page + stack follow ALTZP.
            for page in 0x00..=0x01u8 {
                map[usize::from(page)].read_bank = aux(sw.altzp);
                map[usize::from(page)].write_bank = aux(sw.altzp);
            }
            for page in 0x02..=0xBFu8 {
                map[usize::from(page)].read_bank = aux(sw.ramrd);
                map[usize::from(page)].write_bank = aux(sw.ramwrt);
            }
            if sw.store80 {
                // 80STORE wins over RAMRD/RAMWRT for the display pages.
                for page in 0x04..=0x07u8 {
                    map[usize::from(page)].read_bank = aux(sw.page2);
                    map[usize::from(page)].write_bank = aux(sw.page2);
                }
                if sw.hires {
                    for page in 0x20..=0x3Fu8 {
                        map[usize::from(page)].read_bank = aux(sw.page2);
                        map[usize::from(page)].write_bank = aux(sw.page2);
                    }
                }
            }
        }
        self.apply_shadow_flags(bank, &mut map);
        if sw.shadow & shadow_bits::IOLC == 0 {
            self.apply_iolc(bank, &mut map);
        }
        map
    }

    /// Mega II banks: always slow, with the I/O overlay and language card.
    fn build_mega2_bank(&self, bank: u8) -> [PageDescriptor; 256] {
        let mut map = Self::identity_bank(bank, page_flags::MEGA2);
        self.apply_iolc(bank, &mut map);
        for desc in map.iter_mut() {
            desc.flags |= page_flags::MEGA2;
        }
        map
    }

    /// The $C0-$FF overlay: MMIO page, slot/internal ROM, language card.
    fn apply_iolc(&self, bank: u8, map: &mut [PageDescriptor; 256]) {
        let sw = self.switches;
        let rom_last = (BANK_COUNT - 1) as u8;
        map[0xC0].flags |= page_flags::MMIO_READ | page_flags::MMIO_WRITE | page_flags::MEGA2;

        for page in 0xC1..=0xCFu8 {
            let desc = &mut map[usize::from(page)];
            let slot = page - 0xC0;
            let card_page = (1..=7).contains(&slot)
                && !sw.intcxrom
                && sw.slotromsel & (1 << slot) != 0
                && (slot != 3 || sw.slotc3rom);
            if card_page {
                desc.flags |= page_flags::MMIO_READ | page_flags::MMIO_WRITE | page_flags::MEGA2;
            } else {
                desc.read_bank = rom_last;
                desc.read_page = page;
                desc.flags |= page_flags::WRITE_PROTECT;
            }
        }

        for page in 0xD0..=0xFFu8 {
            let desc = &mut map[usize::from(page)];
            // LC RAM bank: $D000-$DFFF maps down to $C000 when bank 1 is
            // selected; $E000-$FFFF is common.
            let lc_page = if (0xD0..=0xDF).contains(&page) && !sw.lc_bank2 {
                page - 0x10
            } else {
                page
            };
            let ram_bank = if bank < 2 && sw.altzp { 1 } else { bank };
            if sw.lc_read_ram {
                desc.read_bank = ram_bank;
                desc.read_page = lc_page;
            } else {
                desc.read_bank = rom_last;
                desc.read_page = page;
            }
            desc.write_bank = ram_bank;
            desc.write_page = lc_page;
            if !sw.lc_write_enable {
                desc.flags |= page_flags::WRITE_PROTECT;
            }
        }
    }

    /// Mark the write-shadowed pages of banks $00/$01.
    fn apply_shadow_flags(&self, bank: u8, map: &mut [PageDescriptor; 256]) {
        let inhibit = self.switches.shadow;
        let mut mark = |range: core::ops::RangeInclusive<u8>| {
            for page in range {
                map[usize::from(page)].flags |= page_flags::SHADOW | page_flags::MEGA2;
            }
        };
        if inhibit & shadow_bits::TEXT1 == 0 {
            mark(0x04..=0x07);
        }
        if inhibit & shadow_bits::TEXT2 == 0 {
            mark(0x08..=0x0B);
        }
        if inhibit & shadow_bits::HIRES1 == 0 {
            mark(0x20..=0x3F);
        }
        if inhibit & shadow_bits::HIRES2 == 0 {
            mark(0x40..=0x5F);
        }
        // Super-hires shadows the aux bank only.
        if bank == 1 && inhibit & (shadow_bits::SUPER_HIRES | shadow_bits::AUX_HIRES) == 0 {
            mark(0x60..=0x9F);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(ram_banks: u8) -> Memory {
        let rom = vec![0xEE; 4 * BANK_SIZE];
        let slab = Slab::new(Memory::arena_size(ram_banks, rom.len())).expect("arena");
        Memory::new(slab, ram_banks, &rom).expect("carve")
    }

    fn write(mem: &mut Memory, addr: u32, value: u8) {
        let desc = mem.descriptor(addr);
        mem.write_descriptor(desc, addr as u8, value);
    }

    #[test]
    fn every_page_is_mapped_or_flagged() {
        let mem = memory(4);
        for bank in 0..=0xFFu32 {
            for page in 0..=0xFFu32 {
                let desc = mem.descriptor((bank << 16) | (page << 8));
                let routed = desc.flags
                    & (page_flags::MMIO_READ | page_flags::UNMAPPED)
                    != 0;
                if !routed {
                    assert!(
                        mem.backing(desc.read_bank).is_some(),
                        "bank {bank:02X} page {page:02X} dangles"
                    );
                }
            }
        }
    }

    #[test]
    fn fast_ram_round_trip() {
        let mut mem = memory(4);
        write(&mut mem, 0x03_1234, 0x42);
        assert_eq!(mem.peek(0x03_1234), 0x42);
    }

    #[test]
    fn rom_reads_and_write_protect() {
        let mut mem = memory(2);
        assert_eq!(mem.peek(0xFF_0000), 0xEE);
        write(&mut mem, 0xFF_0000, 0x00);
        assert_eq!(mem.peek(0xFF_0000), 0xEE);
    }

    #[test]
    fn unmapped_reads_ff() {
        let mem = memory(2);
        assert_eq!(mem.peek(0x40_0000), 0xFF);
        let desc = mem.descriptor(0x40_0000);
        assert_ne!(desc.flags & page_flags::UNMAPPED, 0);
    }

    #[test]
    fn lc_double_read_enables_writes() {
        let mut mem = memory(2);
        mem.lc_access(0x0B, false);
        mem.sync_map();
        assert!(!mem.switches.lc_write_enable, "one read is not enough");
        mem.lc_access(0x0B, false);
        mem.sync_map();
        assert!(mem.switches.lc_write_enable);
        assert!(mem.switches.lc_read_ram);
        assert!(!mem.switches.lc_bank2);
        // Bank map: $D0-$FF of bank 0 reads and writes RAM.
        let desc = mem.descriptor(0x00_D000);
        assert_eq!(desc.read_bank, 0);
        assert_eq!(desc.read_page, 0xC0, "bank 1 LC aliases $D000 to $C000");
        assert_eq!(desc.flags & page_flags::WRITE_PROTECT, 0);
        let desc = mem.descriptor(0x00_E000);
        assert_eq!(desc.read_page, 0xE0);
    }

    #[test]
    fn lc_write_access_resets_prewrite() {
        let mut mem = memory(2);
        mem.lc_access(0x0B, false);
        mem.lc_access(0x0B, true); // write access: latch drops
        mem.lc_access(0x0B, false);
        assert!(!mem.switches.lc_write_enable);
    }

    #[test]
    fn lc_default_reads_rom() {
        let mem = memory(2);
        let desc = mem.descriptor(0x00_D000);
        assert_eq!(desc.read_bank, 0xFF);
        assert_ne!(desc.flags & page_flags::WRITE_PROTECT, 0);
        assert_eq!(mem.peek(0x00_FFFC), 0xEE, "reset vector comes from ROM");
    }

    #[test]
    fn store80_page2_targets_aux_text() {
        let mut mem = memory(2);
        mem.switches.store80 = true;
        mem.switches.page2 = true;
        mem.invalidate_map();
        mem.sync_map();
        let desc = mem.descriptor(0x00_0400);
        assert_eq!(desc.write_bank, 1);
        assert_eq!(desc.read_bank, 1);
        // Shadowing still mirrors into the Mega II bank for the write bank.
        assert_ne!(desc.flags & page_flags::SHADOW, 0);
    }

    #[test]
    fn ramrd_ramwrt_split_targets() {
        let mut mem = memory(2);
        mem.switches.ramwrt = true;
        mem.invalidate_map();
        mem.sync_map();
        let desc = mem.descriptor(0x00_3000);
        assert_eq!(desc.read_bank, 0);
        assert_eq!(desc.write_bank, 1);
    }

    #[test]
    fn altzp_moves_zero_page_and_stack() {
        let mut mem = memory(2);
        mem.switches.altzp = true;
        mem.invalidate_map();
        mem.sync_map();
        assert_eq!(mem.descriptor(0x00_0080).read_bank, 1);
        assert_eq!(mem.descriptor(0x00_0180).write_bank, 1);
        assert_eq!(mem.descriptor(0x00_0280).read_bank, 0);
    }

    #[test]
    fn shadowed_text_write_mirrors_to_e0() {
        let mut mem = memory(2);
        write(&mut mem, 0x00_0400, 0xA0);
        assert_eq!(mem.peek(0xE0_0400), 0xA0);
        assert_eq!(mem.peek(0x00_0400), 0xA0);
    }

    #[test]
    fn shr_shadow_only_from_bank_one() {
        let mut mem = memory(2);
        write(&mut mem, 0x01_6000, 0x5A);
        assert_eq!(mem.peek(0xE1_6000), 0x5A);
        write(&mut mem, 0x00_6000, 0xA5);
        assert_eq!(mem.peek(0xE0_6000), 0x00, "bank 0 $6000 is not shadowed");
    }

    #[test]
    fn shadow_inhibit_bit_stops_mirroring() {
        let mut mem = memory(2);
        mem.switches.shadow = shadow_bits::TEXT1;
        mem.invalidate_map();
        mem.sync_map();
        write(&mut mem, 0x00_0400, 0x77);
        assert_eq!(mem.peek(0xE0_0400), 0x00);
    }

    #[test]
    fn mega2_banks_always_slow() {
        let mem = memory(2);
        for page in [0x00u32, 0x40, 0xC0, 0xF0] {
            let desc = mem.descriptor(0xE0_0000 | (page << 8));
            assert_ne!(desc.flags & page_flags::MEGA2, 0);
        }
    }

    #[test]
    fn io_page_flagged_mmio() {
        let mem = memory(2);
        let desc = mem.descriptor(0x00_C000);
        assert_ne!(desc.flags & page_flags::MMIO_READ, 0);
        assert_ne!(desc.flags & page_flags::MEGA2, 0);
    }

    #[test]
    fn iolc_inhibit_gives_plain_ram_over_io_space() {
        let mut mem = memory(2);
        mem.switches.shadow = shadow_bits::IOLC;
        mem.invalidate_map();
        mem.sync_map();
        let desc = mem.descriptor(0x00_C000);
        assert_eq!(desc.flags & page_flags::MMIO_READ, 0);
        let desc = mem.descriptor(0x00_D000);
        assert_eq!(desc.read_bank, 0, "plain RAM, no LC");
        // Mega II banks keep their overlay regardless.
        let desc = mem.descriptor(0xE0_C000);
        assert_ne!(desc.flags & page_flags::MMIO_READ, 0);
    }

    #[test]
    fn slot_rom_select_flips_cn_pages_to_cards() {
        let mut mem = memory(2);
        let desc = mem.descriptor(0x00_C700);
        assert_eq!(desc.read_bank, 0xFF, "internal ROM by default");
        mem.switches.slotromsel = 1 << 7;
        mem.invalidate_map();
        mem.sync_map();
        let desc = mem.descriptor(0x00_C700);
        assert_ne!(desc.flags & page_flags::MMIO_READ, 0);
    }
}
