//! 65C816 execution core.
//!
//! `step()` runs one instruction: fetch opcode, evaluate the addressing mode
//! (charging the mode's memory and penalty cycles through the bus), apply
//! the operation, then latch any pending interrupt for the next step.
//! Interrupt priority is NMI > ABORT > IRQ, with IRQ gated by the I flag.

use emu_core::{Bus, MemAccess};

use crate::InstructionTracer;
use crate::flags::{D, I, M, X};
use crate::opcodes::{AddrMode, OPCODES, Op, OpcodeDesc, Width};
use crate::registers::Registers;

const VEC_NATIVE_COP: u16 = 0xFFE4;
const VEC_NATIVE_BRK: u16 = 0xFFE6;
const VEC_NATIVE_ABORT: u16 = 0xFFE8;
const VEC_NATIVE_NMI: u16 = 0xFFEA;
const VEC_NATIVE_IRQ: u16 = 0xFFEE;
const VEC_EMU_COP: u16 = 0xFFF4;
const VEC_EMU_ABORT: u16 = 0xFFF8;
const VEC_EMU_NMI: u16 = 0xFFFA;
const VEC_EMU_RESET: u16 = 0xFFFC;
const VEC_EMU_IRQBRK: u16 = 0xFFFE;

/// CPU pin state visible to the machine.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pins {
    /// RESB input (active low; false = reset asserted).
    pub resb_in: bool,
    /// IRQB input (active low; false = interrupt requested).
    pub irqb_in: bool,
    /// NMIB input (active low, edge sensitive).
    pub nmib_in: bool,
    /// RDY output; pulled low during WAI/STP.
    pub ready_out: bool,
    /// E output: mirrors the emulation-mode flag.
    pub emulation: bool,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            resb_in: true,
            irqb_in: true,
            nmib_in: true,
            ready_out: true,
            emulation: true,
        }
    }
}

/// An effective address: 24 bits, plus whether a 16-bit operand's high byte
/// wraps within the 64 KiB bank (direct page and stack modes) instead of
/// carrying into the next bank.
#[derive(Debug, Clone, Copy)]
struct Ea {
    addr: u32,
    wrap16: bool,
}

impl Ea {
    fn linear(addr: u32) -> Self {
        Self {
            addr: addr & 0x00FF_FFFF,
            wrap16: false,
        }
    }

    fn bank0(addr: u16) -> Self {
        Self {
            addr: u32::from(addr),
            wrap16: true,
        }
    }

    fn next(self) -> u32 {
        if self.wrap16 {
            (self.addr & 0x00FF_0000) | (u32::from((self.addr as u16).wrapping_add(1)))
        } else {
            (self.addr + 1) & 0x00FF_FFFF
        }
    }
}

/// The WDC 65C816.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cpu65C816 {
    /// Register file.
    pub regs: Registers,
    /// Pin state.
    pub pins: Pins,
    /// Total cycles executed since power-on.
    pub cycles_spent: u64,
    /// Remaining pin-hold cycles of the reset sequence.
    resb_counter: u8,
    /// Edge detector for NMIB.
    nmi_seen_low: bool,
    nmi_pending: bool,
    abort_pending: bool,
    irq_line: bool,
    /// WAI executed; waiting for an interrupt line.
    waiting: bool,
    /// STP executed; only reset revives the CPU.
    stopped: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    tracer: Option<Box<dyn InstructionTracer + Send>>,
    #[cfg_attr(feature = "serde", serde(skip))]
    trace_buf: [u8; 4],
    #[cfg_attr(feature = "serde", serde(skip))]
    trace_len: u8,
}

impl Default for Cpu65C816 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu65C816 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            pins: Pins::default(),
            cycles_spent: 0,
            resb_counter: 0,
            nmi_seen_low: false,
            nmi_pending: false,
            abort_pending: false,
            irq_line: false,
            waiting: false,
            stopped: false,
            tracer: None,
            trace_buf: [0; 4],
            trace_len: 0,
        }
    }

    /// Install the per-instruction trace hook. Set once at construction.
    pub fn set_tracer(&mut self, tracer: Box<dyn InstructionTracer + Send>) {
        self.tracer = Some(tracer);
    }

    /// True while the CPU is inside WAI.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    // --- cycle and memory primitives -----------------------------------

    fn cycle<B: Bus>(&mut self, bus: &mut B) {
        self.cycles_spent += 1;
        bus.internal_cycle();
    }

    fn read8<B: Bus>(&mut self, bus: &mut B, addr: u32, access: MemAccess) -> u8 {
        self.cycles_spent += 1;
        bus.read(addr & 0x00FF_FFFF, access)
    }

    fn write8<B: Bus>(&mut self, bus: &mut B, addr: u32, value: u8, access: MemAccess) {
        self.cycles_spent += 1;
        bus.write(addr & 0x00FF_FFFF, value, access);
    }

    /// Fetch one program byte and advance PC (wrapping within PBR).
    fn fetch8<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let v = self.read8(bus, self.regs.pc24(), MemAccess::Program);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        if self.tracer.is_some() && (self.trace_len as usize) < self.trace_buf.len() {
            self.trace_buf[self.trace_len as usize] = v;
            self.trace_len += 1;
        }
        v
    }

    fn fetch16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch8(bus);
        let hi = self.fetch8(bus);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    fn ea_read8<B: Bus>(&mut self, bus: &mut B, ea: Ea) -> u8 {
        self.read8(bus, ea.addr, MemAccess::Data)
    }

    fn ea_read16<B: Bus>(&mut self, bus: &mut B, ea: Ea) -> u16 {
        let lo = self.read8(bus, ea.addr, MemAccess::Data);
        let hi = self.read8(bus, ea.next(), MemAccess::Data);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    fn ea_write8<B: Bus>(&mut self, bus: &mut B, ea: Ea, value: u8) {
        self.write8(bus, ea.addr, value, MemAccess::Data);
    }

    fn ea_write16<B: Bus>(&mut self, bus: &mut B, ea: Ea, value: u16) {
        self.write8(bus, ea.addr, value as u8, MemAccess::Data);
        self.write8(bus, ea.next(), (value >> 8) as u8, MemAccess::Data);
    }

    // --- stack ---------------------------------------------------------

    pub(crate) fn push8<B: Bus>(&mut self, bus: &mut B, value: u8) {
        self.write8(bus, u32::from(self.regs.s), value, MemAccess::Data);
        self.regs.s = self.regs.s.wrapping_sub(1);
        if self.regs.e {
            self.regs.s = 0x0100 | (self.regs.s & 0x00FF);
        }
    }

    pub(crate) fn push16<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.push8(bus, (value >> 8) as u8);
        self.push8(bus, value as u8);
    }

    pub(crate) fn pull8<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.regs.s = self.regs.s.wrapping_add(1);
        if self.regs.e {
            self.regs.s = 0x0100 | (self.regs.s & 0x00FF);
        }
        self.read8(bus, u32::from(self.regs.s), MemAccess::Data)
    }

    pub(crate) fn pull16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pull8(bus);
        let hi = self.pull8(bus);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    // --- addressing ----------------------------------------------------

    /// Read a 16-bit pointer from bank 0. With `page_wrap` (emulation mode,
    /// direct page aligned) the high pointer byte wraps within the page.
    fn read_ptr16<B: Bus>(&mut self, bus: &mut B, addr: u16, page_wrap: bool) -> u16 {
        let lo = self.read8(bus, u32::from(addr), MemAccess::Data);
        let hi_addr = if page_wrap {
            (addr & 0xFF00) | u16::from((addr as u8).wrapping_add(1))
        } else {
            addr.wrapping_add(1)
        };
        let hi = self.read8(bus, u32::from(hi_addr), MemAccess::Data);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    fn read_ptr24<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u32 {
        let lo = self.read8(bus, u32::from(addr), MemAccess::Data);
        let mid = self.read8(bus, u32::from(addr.wrapping_add(1)), MemAccess::Data);
        let hi = self.read8(bus, u32::from(addr.wrapping_add(2)), MemAccess::Data);
        u32::from(lo) | (u32::from(mid) << 8) | (u32::from(hi) << 16)
    }

    /// Direct-page base for an 8-bit offset, with the extra cycle when the
    /// D register is not page-aligned.
    fn direct_base<B: Bus>(&mut self, bus: &mut B) -> (u8, bool) {
        let off = self.fetch8(bus);
        let dl_zero = self.regs.d & 0x00FF == 0;
        if !dl_zero {
            self.cycle(bus);
        }
        (off, dl_zero)
    }

    /// Evaluate an addressing mode to an effective address. `writes` marks
    /// store and read-modify-write operations, which always take the
    /// indexed-cross penalty cycle.
    fn effective_address<B: Bus>(&mut self, bus: &mut B, mode: AddrMode, writes: bool) -> Ea {
        let regs = self.regs;
        match mode {
            AddrMode::Direct => {
                let (off, _) = self.direct_base(bus);
                Ea::bank0(regs.d.wrapping_add(u16::from(off)))
            }
            AddrMode::DirectX | AddrMode::DirectY => {
                let (off, dl_zero) = self.direct_base(bus);
                self.cycle(bus);
                let idx = if mode == AddrMode::DirectX {
                    regs.x_w()
                } else {
                    regs.y_w()
                };
                if regs.e && dl_zero {
                    // Emulation mode with page-aligned D: indexing wraps
                    // within the direct page.
                    Ea::bank0((regs.d & 0xFF00) | u16::from(off.wrapping_add(idx as u8)))
                } else {
                    Ea::bank0(regs.d.wrapping_add(u16::from(off)).wrapping_add(idx))
                }
            }
            AddrMode::DirectIndirect => {
                let (off, dl_zero) = self.direct_base(bus);
                let ptr_at = regs.d.wrapping_add(u16::from(off));
                let ptr = self.read_ptr16(bus, ptr_at, regs.e && dl_zero);
                Ea::linear((u32::from(regs.dbr) << 16) + u32::from(ptr))
            }
            AddrMode::DirectXIndirect => {
                let (off, dl_zero) = self.direct_base(bus);
                self.cycle(bus);
                let ptr_at = if regs.e && dl_zero {
                    (regs.d & 0xFF00) | u16::from(off.wrapping_add(regs.x_w() as u8))
                } else {
                    regs.d.wrapping_add(u16::from(off)).wrapping_add(regs.x_w())
                };
                let ptr = self.read_ptr16(bus, ptr_at, regs.e && dl_zero);
                Ea::linear((u32::from(regs.dbr) << 16) + u32::from(ptr))
            }
            AddrMode::DirectIndirectY => {
                let (off, dl_zero) = self.direct_base(bus);
                let ptr_at = regs.d.wrapping_add(u16::from(off));
                let ptr = self.read_ptr16(bus, ptr_at, regs.e && dl_zero);
                let base = (u32::from(regs.dbr) << 16) + u32::from(ptr);
                let ea = base + u32::from(regs.y_w());
                if writes || !regs.x8() || (ptr & 0xFF00) != (ptr.wrapping_add(regs.y_w()) & 0xFF00)
                {
                    self.cycle(bus);
                }
                Ea::linear(ea)
            }
            AddrMode::DirectIndirectLong => {
                let (off, _) = self.direct_base(bus);
                let ptr = self.read_ptr24(bus, regs.d.wrapping_add(u16::from(off)));
                Ea::linear(ptr)
            }
            AddrMode::DirectIndirectLongY => {
                let (off, _) = self.direct_base(bus);
                let ptr = self.read_ptr24(bus, regs.d.wrapping_add(u16::from(off)));
                Ea::linear(ptr + u32::from(regs.y_w()))
            }
            AddrMode::Absolute => {
                let addr = self.fetch16(bus);
                Ea::linear((u32::from(regs.dbr) << 16) + u32::from(addr))
            }
            AddrMode::AbsoluteX | AddrMode::AbsoluteY => {
                let addr = self.fetch16(bus);
                let idx = if mode == AddrMode::AbsoluteX {
                    regs.x_w()
                } else {
                    regs.y_w()
                };
                let crossed = (addr & 0xFF00) != (addr.wrapping_add(idx) & 0xFF00);
                if writes || !regs.x8() || crossed {
                    self.cycle(bus);
                }
                Ea::linear((u32::from(regs.dbr) << 16) + u32::from(addr) + u32::from(idx))
            }
            AddrMode::AbsoluteLong => {
                let addr = self.fetch16(bus);
                let bank = self.fetch8(bus);
                Ea::linear((u32::from(bank) << 16) | u32::from(addr))
            }
            AddrMode::AbsoluteLongX => {
                let addr = self.fetch16(bus);
                let bank = self.fetch8(bus);
                Ea::linear(((u32::from(bank) << 16) | u32::from(addr)) + u32::from(regs.x_w()))
            }
            AddrMode::StackRelative => {
                let off = self.fetch8(bus);
                self.cycle(bus);
                Ea::bank0(regs.s.wrapping_add(u16::from(off)))
            }
            AddrMode::StackRelativeIndirectY => {
                let off = self.fetch8(bus);
                self.cycle(bus);
                let ptr = self.read_ptr16(bus, regs.s.wrapping_add(u16::from(off)), false);
                self.cycle(bus);
                Ea::linear((u32::from(regs.dbr) << 16) + u32::from(ptr) + u32::from(regs.y_w()))
            }
            _ => unreachable!("mode {mode:?} has no data effective address"),
        }
    }

    /// Fetch an operand for an accumulator-width (M) operation.
    fn read_operand_m<B: Bus>(&mut self, bus: &mut B, desc: &OpcodeDesc) -> u16 {
        if desc.mode == AddrMode::Immediate {
            if self.regs.m8() {
                u16::from(self.fetch8(bus))
            } else {
                self.fetch16(bus)
            }
        } else {
            let ea = self.effective_address(bus, desc.mode, false);
            if self.regs.m8() {
                u16::from(self.ea_read8(bus, ea))
            } else {
                self.ea_read16(bus, ea)
            }
        }
    }

    /// Fetch an operand for an index-width (X) operation.
    fn read_operand_x<B: Bus>(&mut self, bus: &mut B, desc: &OpcodeDesc) -> u16 {
        if desc.mode == AddrMode::Immediate {
            if self.regs.x8() {
                u16::from(self.fetch8(bus))
            } else {
                self.fetch16(bus)
            }
        } else {
            let ea = self.effective_address(bus, desc.mode, false);
            if self.regs.x8() {
                u16::from(self.ea_read8(bus, ea))
            } else {
                self.ea_read16(bus, ea)
            }
        }
    }

    fn store_m<B: Bus>(&mut self, bus: &mut B, mode: AddrMode, value: u16) {
        let ea = self.effective_address(bus, mode, true);
        if self.regs.m8() {
            self.ea_write8(bus, ea, value as u8);
        } else {
            self.ea_write16(bus, ea, value);
        }
    }

    fn store_x<B: Bus>(&mut self, bus: &mut B, mode: AddrMode, value: u16) {
        let ea = self.effective_address(bus, mode, true);
        if self.regs.x8() {
            self.ea_write8(bus, ea, value as u8);
        } else {
            self.ea_write16(bus, ea, value);
        }
    }

    /// Read-modify-write at accumulator width.
    fn rmw<B: Bus>(&mut self, bus: &mut B, mode: AddrMode, f: fn(&mut Self, u16) -> u16) {
        if mode == AddrMode::Accumulator {
            self.cycle(bus);
            let v = self.regs.a_w();
            let r = f(self, v);
            self.regs.set_a_w(r);
            return;
        }
        let ea = self.effective_address(bus, mode, true);
        let (v, r);
        if self.regs.m8() {
            v = u16::from(self.ea_read8(bus, ea));
            self.cycle(bus);
            r = f(self, v);
            self.ea_write8(bus, ea, r as u8);
        } else {
            v = self.ea_read16(bus, ea);
            self.cycle(bus);
            r = f(self, v);
            self.ea_write16(bus, ea, r);
        }
    }

    // --- interrupts and reset ------------------------------------------

    /// Vector through an interrupt. `software` covers BRK/COP (signature
    /// byte already consumed); hardware interrupts burn the two dead cycles
    /// the real chip spends instead of the fetches.
    fn take_interrupt<B: Bus>(
        &mut self,
        bus: &mut B,
        vector_native: u16,
        vector_emu: u16,
        software_break: bool,
    ) {
        if !software_break {
            self.cycle(bus);
            self.cycle(bus);
        }
        if self.regs.e {
            // Bit 4 of the pushed P distinguishes BRK (1) from IRQ/NMI (0).
            let mut p = self.regs.p.0;
            if software_break {
                p |= X;
            } else {
                p &= !X;
            }
            self.push16(bus, self.regs.pc);
            self.push8(bus, p);
        } else {
            self.push8(bus, self.regs.pbr);
            self.push16(bus, self.regs.pc);
            self.push8(bus, self.regs.p.0);
        }
        self.regs.p.set(I);
        self.regs.p.clear(D);
        self.regs.pbr = 0;
        let vector = if self.regs.e {
            vector_emu
        } else {
            vector_native
        };
        let lo = self.read8(bus, u32::from(vector), MemAccess::Data);
        let hi = self.read8(bus, u32::from(vector) + 1, MemAccess::Data);
        self.regs.pc = u16::from(lo) | (u16::from(hi) << 8);
    }

    /// Complete the reset sequence: force emulation mode and vector through
    /// $FFFC.
    fn reset_vector<B: Bus>(&mut self, bus: &mut B) {
        self.regs.e = true;
        self.regs.p.set(M);
        self.regs.p.set(X);
        self.regs.p.set(I);
        self.regs.p.clear(D);
        self.regs.d = 0;
        self.regs.dbr = 0;
        self.regs.pbr = 0;
        self.regs.s = 0x0100 | (self.regs.s & 0x00FF);
        self.regs.x &= 0x00FF;
        self.regs.y &= 0x00FF;
        self.pins.resb_in = true;
        self.pins.emulation = true;
        self.pins.ready_out = true;
        let lo = self.read8(bus, u32::from(VEC_EMU_RESET), MemAccess::Data);
        let hi = self.read8(bus, u32::from(VEC_EMU_RESET) + 1, MemAccess::Data);
        self.regs.pc = u16::from(lo) | (u16::from(hi) << 8);
    }

    fn pending_interrupt(&mut self) -> Option<(u16, u16)> {
        if self.nmi_pending {
            self.nmi_pending = false;
            Some((VEC_NATIVE_NMI, VEC_EMU_NMI))
        } else if self.abort_pending {
            self.abort_pending = false;
            Some((VEC_NATIVE_ABORT, VEC_EMU_ABORT))
        } else if self.irq_line && !self.regs.p.is_set(I) {
            Some((VEC_NATIVE_IRQ, VEC_EMU_IRQBRK))
        } else {
            None
        }
    }

    // --- the step driver -----------------------------------------------

    /// Execute one instruction (or one reset/WAI/STP filler cycle).
    pub fn step<B: Bus>(&mut self, bus: &mut B) {
        if self.stopped {
            self.cycle(bus);
            return;
        }
        if self.resb_counter > 0 {
            self.resb_counter -= 1;
            self.cycle(bus);
            if self.resb_counter == 0 {
                self.reset_vector(bus);
            }
            return;
        }
        if self.waiting {
            // WAI wakes on any interrupt line, even a masked IRQ; a masked
            // wake simply resumes execution after the WAI.
            if self.nmi_pending || self.abort_pending || self.irq_line {
                self.waiting = false;
                self.pins.ready_out = true;
            } else {
                self.cycle(bus);
                return;
            }
        }
        if let Some((vec_native, vec_emu)) = self.pending_interrupt() {
            self.take_interrupt(bus, vec_native, vec_emu, false);
            return;
        }

        let start_pc = self.regs.pc24();
        self.trace_len = 0;
        let opcode = self.read8(bus, start_pc, MemAccess::OpcodeFetch);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        let desc = &OPCODES[usize::from(opcode)];
        self.execute(bus, desc);
        self.pins.emulation = self.regs.e;

        if self.tracer.is_some() {
            let operand = self.format_operand(desc);
            if let Some(tracer) = self.tracer.as_mut() {
                tracer.trace(start_pc, desc.mnemonic, &operand);
            }
        }
    }

    fn execute<B: Bus>(&mut self, bus: &mut B, desc: &OpcodeDesc) {
        match desc.op {
            // --- accumulator-width loads and ALU -----------------------
            Op::Adc => {
                let v = self.read_operand_m(bus, desc);
                if self.regs.p.is_set(D) {
                    self.cycle(bus);
                }
                self.op_adc(v);
            }
            Op::Sbc => {
                let v = self.read_operand_m(bus, desc);
                if self.regs.p.is_set(D) {
                    self.cycle(bus);
                }
                self.op_sbc(v);
            }
            Op::And => {
                let v = self.read_operand_m(bus, desc);
                let r = self.regs.a_w() & v;
                self.regs.set_a_w(r);
                self.set_nz_m(r);
            }
            Op::Ora => {
                let v = self.read_operand_m(bus, desc);
                let r = self.regs.a_w() | v;
                self.regs.set_a_w(r);
                self.set_nz_m(r);
            }
            Op::Eor => {
                let v = self.read_operand_m(bus, desc);
                let r = self.regs.a_w() ^ v;
                self.regs.set_a_w(r);
                self.set_nz_m(r);
            }
            Op::Cmp => {
                let v = self.read_operand_m(bus, desc);
                self.op_compare_m(self.regs.a_w(), v);
            }
            Op::Bit => {
                let v = self.read_operand_m(bus, desc);
                self.op_bit(v, desc.mode == AddrMode::Immediate);
            }
            Op::Lda => {
                let v = self.read_operand_m(bus, desc);
                self.regs.set_a_w(v);
                self.set_nz_m(v);
            }

            // --- index-width loads and compares ------------------------
            Op::Ldx => {
                let v = self.read_operand_x(bus, desc);
                self.regs.x = v;
                self.set_nz_x(v);
            }
            Op::Ldy => {
                let v = self.read_operand_x(bus, desc);
                self.regs.y = v;
                self.set_nz_x(v);
            }
            Op::Cpx => {
                let v = self.read_operand_x(bus, desc);
                self.op_compare_x(self.regs.x_w(), v);
            }
            Op::Cpy => {
                let v = self.read_operand_x(bus, desc);
                self.op_compare_x(self.regs.y_w(), v);
            }

            // --- stores ------------------------------------------------
            Op::Sta => self.store_m(bus, desc.mode, self.regs.a_w()),
            Op::Stz => self.store_m(bus, desc.mode, 0),
            Op::Stx => self.store_x(bus, desc.mode, self.regs.x_w()),
            Op::Sty => self.store_x(bus, desc.mode, self.regs.y_w()),

            // --- read-modify-write -------------------------------------
            Op::Asl => self.rmw(bus, desc.mode, Self::op_asl),
            Op::Lsr => self.rmw(bus, desc.mode, Self::op_lsr),
            Op::Rol => self.rmw(bus, desc.mode, Self::op_rol),
            Op::Ror => self.rmw(bus, desc.mode, Self::op_ror),
            Op::Inc => self.rmw(bus, desc.mode, Self::op_inc),
            Op::Dec => self.rmw(bus, desc.mode, Self::op_dec),
            Op::Trb => self.rmw(bus, desc.mode, Self::op_trb),
            Op::Tsb => self.rmw(bus, desc.mode, Self::op_tsb),

            // --- register increments and transfers ---------------------
            Op::Inx
            | Op::Iny
            | Op::Dex
            | Op::Dey
            | Op::Tax
            | Op::Tay
            | Op::Tcd
            | Op::Tcs
            | Op::Tdc
            | Op::Tsc
            | Op::Tsx
            | Op::Txa
            | Op::Txs
            | Op::Txy
            | Op::Tya
            | Op::Tyx
            | Op::Xba
            | Op::Xce
            | Op::Nop => {
                self.cycle(bus);
                self.op_register(desc.op);
                if desc.op == Op::Xba {
                    self.cycle(bus);
                }
            }
            Op::Wdm => {
                let _ = self.fetch8(bus);
            }

            // --- flag operations ---------------------------------------
            Op::Clc | Op::Cld | Op::Cli | Op::Clv | Op::Sec | Op::Sed | Op::Sei => {
                self.cycle(bus);
                self.op_flag(desc.op);
            }
            Op::Rep => {
                let v = self.fetch8(bus);
                self.cycle(bus);
                self.op_rep(v);
            }
            Op::Sep => {
                let v = self.fetch8(bus);
                self.cycle(bus);
                self.op_sep(v);
            }

            // --- stack -------------------------------------------------
            Op::Pha => {
                self.cycle(bus);
                if self.regs.m8() {
                    self.push8(bus, self.regs.a as u8);
                } else {
                    self.push16(bus, self.regs.a);
                }
            }
            Op::Phx => {
                self.cycle(bus);
                if self.regs.x8() {
                    self.push8(bus, self.regs.x as u8);
                } else {
                    self.push16(bus, self.regs.x);
                }
            }
            Op::Phy => {
                self.cycle(bus);
                if self.regs.x8() {
                    self.push8(bus, self.regs.y as u8);
                } else {
                    self.push16(bus, self.regs.y);
                }
            }
            Op::Php => {
                self.cycle(bus);
                let mut p = self.regs.p.0;
                if self.regs.e {
                    p |= M | X;
                }
                self.push8(bus, p);
            }
            Op::Phb => {
                self.cycle(bus);
                self.push8(bus, self.regs.dbr);
            }
            Op::Phk => {
                self.cycle(bus);
                self.push8(bus, self.regs.pbr);
            }
            Op::Phd => {
                self.cycle(bus);
                self.push16(bus, self.regs.d);
            }
            Op::Pla => {
                self.cycle(bus);
                self.cycle(bus);
                let v = if self.regs.m8() {
                    u16::from(self.pull8(bus))
                } else {
                    self.pull16(bus)
                };
                self.regs.set_a_w(v);
                self.set_nz_m(v);
            }
            Op::Plx => {
                self.cycle(bus);
                self.cycle(bus);
                let v = if self.regs.x8() {
                    u16::from(self.pull8(bus))
                } else {
                    self.pull16(bus)
                };
                self.regs.x = v;
                self.set_nz_x(v);
            }
            Op::Ply => {
                self.cycle(bus);
                self.cycle(bus);
                let v = if self.regs.x8() {
                    u16::from(self.pull8(bus))
                } else {
                    self.pull16(bus)
                };
                self.regs.y = v;
                self.set_nz_x(v);
            }
            Op::Plp => {
                self.cycle(bus);
                self.cycle(bus);
                let v = self.pull8(bus);
                self.op_set_p(v);
            }
            Op::Plb => {
                self.cycle(bus);
                self.cycle(bus);
                let v = self.pull8(bus);
                self.regs.dbr = v;
                self.regs.p.set_nz8(v);
            }
            Op::Pld => {
                self.cycle(bus);
                self.cycle(bus);
                let v = self.pull16(bus);
                self.regs.d = v;
                self.regs.p.set_nz16(v);
            }
            Op::Pea => {
                let v = self.fetch16(bus);
                self.push16(bus, v);
            }
            Op::Pei => {
                let (off, _) = self.direct_base(bus);
                let ptr_at = self.regs.d.wrapping_add(u16::from(off));
                let v = self.read_ptr16(bus, ptr_at, false);
                self.push16(bus, v);
            }
            Op::Per => {
                let off = self.fetch16(bus);
                self.cycle(bus);
                let v = self.regs.pc.wrapping_add(off);
                self.push16(bus, v);
            }

            // --- control flow ------------------------------------------
            Op::Jmp => self.op_jmp(bus, desc.mode),
            Op::Jsr => self.op_jsr(bus, desc.mode),
            Op::Jsl => {
                let addr = self.fetch16(bus);
                let bank = self.fetch8(bus);
                self.push8(bus, self.regs.pbr);
                self.cycle(bus);
                self.push16(bus, self.regs.pc.wrapping_sub(1));
                self.regs.pbr = bank;
                self.regs.pc = addr;
            }
            Op::Rts => {
                self.cycle(bus);
                self.cycle(bus);
                let pc = self.pull16(bus);
                self.cycle(bus);
                self.regs.pc = pc.wrapping_add(1);
            }
            Op::Rtl => {
                self.cycle(bus);
                self.cycle(bus);
                let pc = self.pull16(bus);
                let bank = self.pull8(bus);
                self.regs.pc = pc.wrapping_add(1);
                self.regs.pbr = bank;
            }
            Op::Rti => {
                self.cycle(bus);
                self.cycle(bus);
                let p = self.pull8(bus);
                self.op_set_p(p);
                self.regs.pc = self.pull16(bus);
                if !self.regs.e {
                    self.regs.pbr = self.pull8(bus);
                }
            }
            Op::Bra => self.op_branch(bus, true),
            Op::Bpl => self.op_branch(bus, !self.regs.p.is_set(crate::flags::N)),
            Op::Bmi => self.op_branch(bus, self.regs.p.is_set(crate::flags::N)),
            Op::Bvc => self.op_branch(bus, !self.regs.p.is_set(crate::flags::V)),
            Op::Bvs => self.op_branch(bus, self.regs.p.is_set(crate::flags::V)),
            Op::Bcc => self.op_branch(bus, !self.regs.p.is_set(crate::flags::C)),
            Op::Bcs => self.op_branch(bus, self.regs.p.is_set(crate::flags::C)),
            Op::Bne => self.op_branch(bus, !self.regs.p.is_set(crate::flags::Z)),
            Op::Beq => self.op_branch(bus, self.regs.p.is_set(crate::flags::Z)),
            Op::Brl => {
                let off = self.fetch16(bus);
                self.cycle(bus);
                self.regs.pc = self.regs.pc.wrapping_add(off);
            }

            // --- software interrupts -----------------------------------
            Op::Brk => {
                let _signature = self.fetch8(bus);
                self.take_interrupt(bus, VEC_NATIVE_BRK, VEC_EMU_IRQBRK, true);
            }
            Op::Cop => {
                let _signature = self.fetch8(bus);
                self.take_interrupt(bus, VEC_NATIVE_COP, VEC_EMU_COP, true);
            }

            // --- block moves -------------------------------------------
            Op::Mvn => self.op_block_move(bus, false),
            Op::Mvp => self.op_block_move(bus, true),

            // --- wait and stop -----------------------------------------
            Op::Wai => {
                self.cycle(bus);
                self.cycle(bus);
                self.waiting = true;
                self.pins.ready_out = false;
            }
            Op::Stp => {
                self.cycle(bus);
                self.cycle(bus);
                self.stopped = true;
                self.pins.ready_out = false;
            }
        }
    }

    fn op_jmp<B: Bus>(&mut self, bus: &mut B, mode: AddrMode) {
        match mode {
            AddrMode::Absolute => {
                self.regs.pc = self.fetch16(bus);
            }
            AddrMode::AbsoluteLong => {
                let addr = self.fetch16(bus);
                let bank = self.fetch8(bus);
                self.regs.pc = addr;
                self.regs.pbr = bank;
            }
            AddrMode::AbsoluteIndirect => {
                let ptr = self.fetch16(bus);
                self.regs.pc = self.read_ptr16(bus, ptr, false);
            }
            AddrMode::AbsoluteIndirectLong => {
                let ptr = self.fetch16(bus);
                let target = self.read_ptr24(bus, ptr);
                self.regs.pc = target as u16;
                self.regs.pbr = (target >> 16) as u8;
            }
            AddrMode::AbsoluteXIndirect => {
                let ptr = self.fetch16(bus);
                self.cycle(bus);
                let at = (u32::from(self.regs.pbr) << 16)
                    | u32::from(ptr.wrapping_add(self.regs.x_w()));
                let lo = self.read8(bus, at, MemAccess::Data);
                let hi = self.read8(bus, (at & 0x00FF_0000) | u32::from((at as u16).wrapping_add(1)), MemAccess::Data);
                self.regs.pc = u16::from(lo) | (u16::from(hi) << 8);
            }
            _ => unreachable!("JMP has no mode {mode:?}"),
        }
    }

    fn op_jsr<B: Bus>(&mut self, bus: &mut B, mode: AddrMode) {
        match mode {
            AddrMode::Absolute => {
                let target = self.fetch16(bus);
                self.cycle(bus);
                self.push16(bus, self.regs.pc.wrapping_sub(1));
                self.regs.pc = target;
            }
            AddrMode::AbsoluteXIndirect => {
                let ptr = self.fetch16(bus);
                self.push16(bus, self.regs.pc.wrapping_sub(1));
                self.cycle(bus);
                let at = (u32::from(self.regs.pbr) << 16)
                    | u32::from(ptr.wrapping_add(self.regs.x_w()));
                let lo = self.read8(bus, at, MemAccess::Data);
                let hi = self.read8(bus, (at & 0x00FF_0000) | u32::from((at as u16).wrapping_add(1)), MemAccess::Data);
                self.regs.pc = u16::from(lo) | (u16::from(hi) << 8);
            }
            _ => unreachable!("JSR has no mode {mode:?}"),
        }
    }

    fn op_branch<B: Bus>(&mut self, bus: &mut B, taken: bool) {
        let off = self.fetch8(bus) as i8;
        if taken {
            self.cycle(bus);
            let target = self.regs.pc.wrapping_add(off as u16);
            // Emulation mode charges one more cycle when the branch crosses
            // a page.
            if self.regs.e && (target & 0xFF00) != (self.regs.pc & 0xFF00) {
                self.cycle(bus);
            }
            self.regs.pc = target;
        }
    }

    /// One iteration of MVN/MVP: move a byte, then rewind PC to re-execute
    /// until the full count in C has been transferred. Interrupts are
    /// serviced between iterations, as on hardware.
    fn op_block_move<B: Bus>(&mut self, bus: &mut B, descending: bool) {
        let dst_bank = self.fetch8(bus);
        let src_bank = self.fetch8(bus);
        self.regs.dbr = dst_bank;
        let src = (u32::from(src_bank) << 16) | u32::from(self.regs.x_w());
        let dst = (u32::from(dst_bank) << 16) | u32::from(self.regs.y_w());
        let v = self.read8(bus, src, MemAccess::Data);
        self.write8(bus, dst, v, MemAccess::Data);
        self.cycle(bus);
        self.cycle(bus);
        let step: u16 = if descending { 0xFFFF } else { 1 };
        if self.regs.x8() {
            self.regs.x = u16::from((self.regs.x as u8).wrapping_add(step as u8));
            self.regs.y = u16::from((self.regs.y as u8).wrapping_add(step as u8));
        } else {
            self.regs.x = self.regs.x.wrapping_add(step);
            self.regs.y = self.regs.y.wrapping_add(step);
        }
        self.regs.a = self.regs.a.wrapping_sub(1);
        if self.regs.a != 0xFFFF {
            self.regs.pc = self.regs.pc.wrapping_sub(3);
        }
    }

    // --- trace formatting ----------------------------------------------

    fn format_operand(&self, desc: &OpcodeDesc) -> String {
        let b = &self.trace_buf;
        let n = self.trace_len as usize;
        let op8 = || b[0];
        let op16 = || u16::from(b[0]) | (u16::from(*b.get(1).unwrap_or(&0)) << 8);
        match desc.mode {
            AddrMode::Implied | AddrMode::Accumulator => String::new(),
            AddrMode::Immediate => {
                if n >= 2 && desc.width != Width::Byte {
                    format!("#${:04X}", op16())
                } else {
                    format!("#${:02X}", op8())
                }
            }
            AddrMode::Absolute => format!("${:04X}", op16()),
            AddrMode::AbsoluteX => format!("${:04X},X", op16()),
            AddrMode::AbsoluteY => format!("${:04X},Y", op16()),
            AddrMode::AbsoluteLong => {
                format!("${:02X}{:04X}", b[2], op16())
            }
            AddrMode::AbsoluteLongX => format!("${:02X}{:04X},X", b[2], op16()),
            AddrMode::Direct => format!("${:02X}", op8()),
            AddrMode::DirectX => format!("${:02X},X", op8()),
            AddrMode::DirectY => format!("${:02X},Y", op8()),
            AddrMode::DirectIndirect => format!("(${:02X})", op8()),
            AddrMode::DirectIndirectLong => format!("[${:02X}]", op8()),
            AddrMode::DirectXIndirect => format!("(${:02X},X)", op8()),
            AddrMode::DirectIndirectY => format!("(${:02X}),Y", op8()),
            AddrMode::DirectIndirectLongY => format!("[${:02X}],Y", op8()),
            AddrMode::StackRelative => format!("${:02X},S", op8()),
            AddrMode::StackRelativeIndirectY => format!("(${:02X},S),Y", op8()),
            AddrMode::AbsoluteIndirect => format!("(${:04X})", op16()),
            AddrMode::AbsoluteIndirectLong => format!("[${:04X}]", op16()),
            AddrMode::AbsoluteXIndirect => format!("(${:04X},X)", op16()),
            AddrMode::Relative => {
                let target = self.regs.pc.wrapping_add((b[0] as i8) as u16);
                format!("${target:04X}")
            }
            AddrMode::RelativeLong => {
                let target = self.regs.pc.wrapping_add(op16());
                format!("${target:04X}")
            }
            AddrMode::BlockMove => format!("${:02X},${:02X}", b[1], b[0]),
            AddrMode::StackInterrupt => format!("#${:02X}", op8()),
        }
    }
}

impl emu_core::Cpu for Cpu65C816 {
    type Registers = Registers;

    fn step<B: Bus>(&mut self, bus: &mut B) {
        Cpu65C816::step(self, bus);
    }

    fn pc(&self) -> u32 {
        self.regs.pc24()
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn set_irq(&mut self, asserted: bool) {
        self.pins.irqb_in = !asserted;
        self.irq_line = asserted;
    }

    fn set_nmi(&mut self, asserted: bool) {
        self.pins.nmib_in = !asserted;
        if asserted && !self.nmi_seen_low {
            self.nmi_pending = true;
        }
        self.nmi_seen_low = asserted;
    }

    fn abort(&mut self) {
        self.abort_pending = true;
    }

    fn reset(&mut self) {
        self.pins.resb_in = false;
        self.pins.irqb_in = true;
        self.pins.nmib_in = true;
        self.pins.ready_out = true;
        self.resb_counter = 3;
        self.stopped = false;
        self.waiting = false;
        self.nmi_pending = false;
        self.abort_pending = false;
        self.irq_line = false;
    }
}
