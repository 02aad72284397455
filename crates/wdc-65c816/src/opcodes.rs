//! The 256-entry opcode descriptor table.
//!
//! Each entry names the operation, the addressing mode, and the immediate
//! operand width class. The dispatcher evaluates the addressing mode (which
//! charges the mode's memory and penalty cycles) and then applies the
//! operation. The 65C816 defines all 256 encodings; there is no illegal
//! opcode path.

/// Addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// No operand.
    Implied,
    /// Operates on the accumulator.
    Accumulator,
    /// `#imm` — width decided by [`Width`].
    Immediate,
    /// `addr` (DBR bank).
    Absolute,
    /// `addr,X`.
    AbsoluteX,
    /// `addr,Y`.
    AbsoluteY,
    /// `long` (24-bit).
    AbsoluteLong,
    /// `long,X`.
    AbsoluteLongX,
    /// `dp`.
    Direct,
    /// `dp,X`.
    DirectX,
    /// `dp,Y`.
    DirectY,
    /// `(dp)`.
    DirectIndirect,
    /// `[dp]`.
    DirectIndirectLong,
    /// `(dp,X)`.
    DirectXIndirect,
    /// `(dp),Y`.
    DirectIndirectY,
    /// `[dp],Y`.
    DirectIndirectLongY,
    /// `sr,S`.
    StackRelative,
    /// `(sr,S),Y`.
    StackRelativeIndirectY,
    /// `(addr)` — JMP only, bank 0 pointer.
    AbsoluteIndirect,
    /// `[addr]` — JML, bank 0 pointer, 24-bit target.
    AbsoluteIndirectLong,
    /// `(addr,X)` — JMP/JSR, pointer in PBR bank.
    AbsoluteXIndirect,
    /// 8-bit PC-relative branch.
    Relative,
    /// 16-bit PC-relative (BRL, PER).
    RelativeLong,
    /// `src,dst` bank pair (MVN/MVP).
    BlockMove,
    /// BRK/COP: signature byte then interrupt sequence.
    StackInterrupt,
}

/// Immediate operand width class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// Follows the M flag (accumulator/memory ops).
    M,
    /// Follows the X flag (index ops).
    X,
    /// Always one byte (REP/SEP, signatures).
    Byte,
    /// Not an immediate.
    None,
}

/// Operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[rustfmt::skip]
pub enum Op {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Bra, Brk, Brl, Bvc,
    Bvs, Clc, Cld, Cli, Clv, Cmp, Cop, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc,
    Inx, Iny, Jmp, Jsl, Jsr, Lda, Ldx, Ldy, Lsr, Mvn, Mvp, Nop, Ora, Pea,
    Pei, Per, Pha, Phb, Phd, Phk, Php, Phx, Phy, Pla, Plb, Pld, Plp, Plx,
    Ply, Rep, Rol, Ror, Rti, Rtl, Rts, Sbc, Sec, Sed, Sei, Sep, Sta, Stp,
    Stx, Sty, Stz, Tax, Tay, Tcd, Tcs, Tdc, Trb, Tsb, Tsc, Tsx, Txa, Txs,
    Txy, Tya, Tyx, Wai, Wdm, Xba, Xce,
}

/// One table entry.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeDesc {
    pub op: Op,
    pub mode: AddrMode,
    pub width: Width,
    pub mnemonic: &'static str,
}

const fn desc(op: Op, mode: AddrMode, width: Width, mnemonic: &'static str) -> OpcodeDesc {
    OpcodeDesc {
        op,
        mode,
        width,
        mnemonic,
    }
}

use AddrMode::*;
use Width::{Byte, M, None as NoImm, X as XW};

/// The full opcode matrix, indexed by opcode byte.
#[rustfmt::skip]
pub static OPCODES: [OpcodeDesc; 256] = [
    /* 00 */ desc(Op::Brk, StackInterrupt, Byte, "BRK"),
    /* 01 */ desc(Op::Ora, DirectXIndirect, NoImm, "ORA"),
    /* 02 */ desc(Op::Cop, StackInterrupt, Byte, "COP"),
    /* 03 */ desc(Op::Ora, StackRelative, NoImm, "ORA"),
    /* 04 */ desc(Op::Tsb, Direct, NoImm, "TSB"),
    /* 05 */ desc(Op::Ora, Direct, NoImm, "ORA"),
    /* 06 */ desc(Op::Asl, Direct, NoImm, "ASL"),
    /* 07 */ desc(Op::Ora, DirectIndirectLong, NoImm, "ORA"),
    /* 08 */ desc(Op::Php, Implied, NoImm, "PHP"),
    /* 09 */ desc(Op::Ora, Immediate, M, "ORA"),
    /* 0A */ desc(Op::Asl, Accumulator, NoImm, "ASL"),
    /* 0B */ desc(Op::Phd, Implied, NoImm, "PHD"),
    /* 0C */ desc(Op::Tsb, Absolute, NoImm, "TSB"),
    /* 0D */ desc(Op::Ora, Absolute, NoImm, "ORA"),
    /* 0E */ desc(Op::Asl, Absolute, NoImm, "ASL"),
    /* 0F */ desc(Op::Ora, AbsoluteLong, NoImm, "ORA"),
    /* 10 */ desc(Op::Bpl, Relative, NoImm, "BPL"),
    /* 11 */ desc(Op::Ora, DirectIndirectY, NoImm, "ORA"),
    /* 12 */ desc(Op::Ora, DirectIndirect, NoImm, "ORA"),
    /* 13 */ desc(Op::Ora, StackRelativeIndirectY, NoImm, "ORA"),
    /* 14 */ desc(Op::Trb, Direct, NoImm, "TRB"),
    /* 15 */ desc(Op::Ora, DirectX, NoImm, "ORA"),
    /* 16 */ desc(Op::Asl, DirectX, NoImm, "ASL"),
    /* 17 */ desc(Op::Ora, DirectIndirectLongY, NoImm, "ORA"),
    /* 18 */ desc(Op::Clc, Implied, NoImm, "CLC"),
    /* 19 */ desc(Op::Ora, AbsoluteY, NoImm, "ORA"),
    /* 1A */ desc(Op::Inc, Accumulator, NoImm, "INC"),
    /* 1B */ desc(Op::Tcs, Implied, NoImm, "TCS"),
    /* 1C */ desc(Op::Trb, Absolute, NoImm, "TRB"),
    /* 1D */ desc(Op::Ora, AbsoluteX, NoImm, "ORA"),
    /* 1E */ desc(Op::Asl, AbsoluteX, NoImm, "ASL"),
    /* 1F */ desc(Op::Ora, AbsoluteLongX, NoImm, "ORA"),
    /* 20 */ desc(Op::Jsr, Absolute, NoImm, "JSR"),
    /* 21 */ desc(Op::And, DirectXIndirect, NoImm, "AND"),
    /* 22 */ desc(Op::Jsl, AbsoluteLong, NoImm, "JSL"),
    /* 23 */ desc(Op::And, StackRelative, NoImm, "AND"),
    /* 24 */ desc(Op::Bit, Direct, NoImm, "BIT"),
    /* 25 */ desc(Op::And, Direct, NoImm, "AND"),
    /* 26 */ desc(Op::Rol, Direct, NoImm, "ROL"),
    /* 27 */ desc(Op::And, DirectIndirectLong, NoImm, "AND"),
    /* 28 */ desc(Op::Plp, Implied, NoImm, "PLP"),
    /* 29 */ desc(Op::And, Immediate, M, "AND"),
    /* 2A */ desc(Op::Rol, Accumulator, NoImm, "ROL"),
    /* 2B */ desc(Op::Pld, Implied, NoImm, "PLD"),
    /* 2C */ desc(Op::Bit, Absolute, NoImm, "BIT"),
    /* 2D */ desc(Op::And, Absolute, NoImm, "AND"),
    /* 2E */ desc(Op::Rol, Absolute, NoImm, "ROL"),
    /* 2F */ desc(Op::And, AbsoluteLong, NoImm, "AND"),
    /* 30 */ desc(Op::Bmi, Relative, NoImm, "BMI"),
    /* 31 */ desc(Op::And, DirectIndirectY, NoImm, "AND"),
    /* 32 */ desc(Op::And, DirectIndirect, NoImm, "AND"),
    /* 33 */ desc(Op::And, StackRelativeIndirectY, NoImm, "AND"),
    /* 34 */ desc(Op::Bit, DirectX, NoImm, "BIT"),
    /* 35 */ desc(Op::And, DirectX, NoImm, "AND"),
    /* 36 */ desc(Op::Rol, DirectX, NoImm, "ROL"),
    /* 37 */ desc(Op::And, DirectIndirectLongY, NoImm, "AND"),
    /* 38 */ desc(Op::Sec, Implied, NoImm, "SEC"),
    /* 39 */ desc(Op::And, AbsoluteY, NoImm, "AND"),
    /* 3A */ desc(Op::Dec, Accumulator, NoImm, "DEC"),
    /* 3B */ desc(Op::Tsc, Implied, NoImm, "TSC"),
    /* 3C */ desc(Op::Bit, AbsoluteX, NoImm, "BIT"),
    /* 3D */ desc(Op::And, AbsoluteX, NoImm, "AND"),
    /* 3E */ desc(Op::Rol, AbsoluteX, NoImm, "ROL"),
    /* 3F */ desc(Op::And, AbsoluteLongX, NoImm, "AND"),
    /* 40 */ desc(Op::Rti, Implied, NoImm, "RTI"),
    /* 41 */ desc(Op::Eor, DirectXIndirect, NoImm, "EOR"),
    /* 42 */ desc(Op::Wdm, Immediate, Byte, "WDM"),
    /* 43 */ desc(Op::Eor, StackRelative, NoImm, "EOR"),
    /* 44 */ desc(Op::Mvp, BlockMove, NoImm, "MVP"),
    /* 45 */ desc(Op::Eor, Direct, NoImm, "EOR"),
    /* 46 */ desc(Op::Lsr, Direct, NoImm, "LSR"),
    /* 47 */ desc(Op::Eor, DirectIndirectLong, NoImm, "EOR"),
    /* 48 */ desc(Op::Pha, Implied, NoImm, "PHA"),
    /* 49 */ desc(Op::Eor, Immediate, M, "EOR"),
    /* 4A */ desc(Op::Lsr, Accumulator, NoImm, "LSR"),
    /* 4B */ desc(Op::Phk, Implied, NoImm, "PHK"),
    /* 4C */ desc(Op::Jmp, Absolute, NoImm, "JMP"),
    /* 4D */ desc(Op::Eor, Absolute, NoImm, "EOR"),
    /* 4E */ desc(Op::Lsr, Absolute, NoImm, "LSR"),
    /* 4F */ desc(Op::Eor, AbsoluteLong, NoImm, "EOR"),
    /* 50 */ desc(Op::Bvc, Relative, NoImm, "BVC"),
    /* 51 */ desc(Op::Eor, DirectIndirectY, NoImm, "EOR"),
    /* 52 */ desc(Op::Eor, DirectIndirect, NoImm, "EOR"),
    /* 53 */ desc(Op::Eor, StackRelativeIndirectY, NoImm, "EOR"),
    /* 54 */ desc(Op::Mvn, BlockMove, NoImm, "MVN"),
    /* 55 */ desc(Op::Eor, DirectX, NoImm, "EOR"),
    /* 56 */ desc(Op::Lsr, DirectX, NoImm, "LSR"),
    /* 57 */ desc(Op::Eor, DirectIndirectLongY, NoImm, "EOR"),
    /* 58 */ desc(Op::Cli, Implied, NoImm, "CLI"),
    /* 59 */ desc(Op::Eor, AbsoluteY, NoImm, "EOR"),
    /* 5A */ desc(Op::Phy, Implied, NoImm, "PHY"),
    /* 5B */ desc(Op::Tcd, Implied, NoImm, "TCD"),
    /* 5C */ desc(Op::Jmp, AbsoluteLong, NoImm, "JMP"),
    /* 5D */ desc(Op::Eor, AbsoluteX, NoImm, "EOR"),
    /* 5E */ desc(Op::Lsr, AbsoluteX, NoImm, "LSR"),
    /* 5F */ desc(Op::Eor, AbsoluteLongX, NoImm, "EOR"),
    /* 60 */ desc(Op::Rts, Implied, NoImm, "RTS"),
    /* 61 */ desc(Op::Adc, DirectXIndirect, NoImm, "ADC"),
    /* 62 */ desc(Op::Per, RelativeLong, NoImm, "PER"),
    /* 63 */ desc(Op::Adc, StackRelative, NoImm, "ADC"),
    /* 64 */ desc(Op::Stz, Direct, NoImm, "STZ"),
    /* 65 */ desc(Op::Adc, Direct, NoImm, "ADC"),
    /* 66 */ desc(Op::Ror, Direct, NoImm, "ROR"),
    /* 67 */ desc(Op::Adc, DirectIndirectLong, NoImm, "ADC"),
    /* 68 */ desc(Op::Pla, Implied, NoImm, "PLA"),
    /* 69 */ desc(Op::Adc, Immediate, M, "ADC"),
    /* 6A */ desc(Op::Ror, Accumulator, NoImm, "ROR"),
    /* 6B */ desc(Op::Rtl, Implied, NoImm, "RTL"),
    /* 6C */ desc(Op::Jmp, AbsoluteIndirect, NoImm, "JMP"),
    /* 6D */ desc(Op::Adc, Absolute, NoImm, "ADC"),
    /* 6E */ desc(Op::Ror, Absolute, NoImm, "ROR"),
    /* 6F */ desc(Op::Adc, AbsoluteLong, NoImm, "ADC"),
    /* 70 */ desc(Op::Bvs, Relative, NoImm, "BVS"),
    /* 71 */ desc(Op::Adc, DirectIndirectY, NoImm, "ADC"),
    /* 72 */ desc(Op::Adc, DirectIndirect, NoImm, "ADC"),
    /* 73 */ desc(Op::Adc, StackRelativeIndirectY, NoImm, "ADC"),
    /* 74 */ desc(Op::Stz, DirectX, NoImm, "STZ"),
    /* 75 */ desc(Op::Adc, DirectX, NoImm, "ADC"),
    /* 76 */ desc(Op::Ror, DirectX, NoImm, "ROR"),
    /* 77 */ desc(Op::Adc, DirectIndirectLongY, NoImm, "ADC"),
    /* 78 */ desc(Op::Sei, Implied, NoImm, "SEI"),
    /* 79 */ desc(Op::Adc, AbsoluteY, NoImm, "ADC"),
    /* 7A */ desc(Op::Ply, Implied, NoImm, "PLY"),
    /* 7B */ desc(Op::Tdc, Implied, NoImm, "TDC"),
    /* 7C */ desc(Op::Jmp, AbsoluteXIndirect, NoImm, "JMP"),
    /* 7D */ desc(Op::Adc, AbsoluteX, NoImm, "ADC"),
    /* 7E */ desc(Op::Ror, AbsoluteX, NoImm, "ROR"),
    /* 7F */ desc(Op::Adc, AbsoluteLongX, NoImm, "ADC"),
    /* 80 */ desc(Op::Bra, Relative, NoImm, "BRA"),
    /* 81 */ desc(Op::Sta, DirectXIndirect, NoImm, "STA"),
    /* 82 */ desc(Op::Brl, RelativeLong, NoImm, "BRL"),
    /* 83 */ desc(Op::Sta, StackRelative, NoImm, "STA"),
    /* 84 */ desc(Op::Sty, Direct, NoImm, "STY"),
    /* 85 */ desc(Op::Sta, Direct, NoImm, "STA"),
    /* 86 */ desc(Op::Stx, Direct, NoImm, "STX"),
    /* 87 */ desc(Op::Sta, DirectIndirectLong, NoImm, "STA"),
    /* 88 */ desc(Op::Dey, Implied, NoImm, "DEY"),
    /* 89 */ desc(Op::Bit, Immediate, M, "BIT"),
    /* 8A */ desc(Op::Txa, Implied, NoImm, "TXA"),
    /* 8B */ desc(Op::Phb, Implied, NoImm, "PHB"),
    /* 8C */ desc(Op::Sty, Absolute, NoImm, "STY"),
    /* 8D */ desc(Op::Sta, Absolute, NoImm, "STA"),
    /* 8E */ desc(Op::Stx, Absolute, NoImm, "STX"),
    /* 8F */ desc(Op::Sta, AbsoluteLong, NoImm, "STA"),
    /* 90 */ desc(Op::Bcc, Relative, NoImm, "BCC"),
    /* 91 */ desc(Op::Sta, DirectIndirectY, NoImm, "STA"),
    /* 92 */ desc(Op::Sta, DirectIndirect, NoImm, "STA"),
    /* 93 */ desc(Op::Sta, StackRelativeIndirectY, NoImm, "STA"),
    /* 94 */ desc(Op::Sty, DirectX, NoImm, "STY"),
    /* 95 */ desc(Op::Sta, DirectX, NoImm, "STA"),
    /* 96 */ desc(Op::Stx, DirectY, NoImm, "STX"),
    /* 97 */ desc(Op::Sta, DirectIndirectLongY, NoImm, "STA"),
    /* 98 */ desc(Op::Tya, Implied, NoImm, "TYA"),
    /* 99 */ desc(Op::Sta, AbsoluteY, NoImm, "STA"),
    /* 9A */ desc(Op::Txs, Implied, NoImm, "TXS"),
    /* 9B */ desc(Op::Txy, Implied, NoImm, "TXY"),
    /* 9C */ desc(Op::Stz, Absolute, NoImm, "STZ"),
    /* 9D */ desc(Op::Sta, AbsoluteX, NoImm, "STA"),
    /* 9E */ desc(Op::Stz, AbsoluteX, NoImm, "STZ"),
    /* 9F */ desc(Op::Sta, AbsoluteLongX, NoImm, "STA"),
    /* A0 */ desc(Op::Ldy, Immediate, XW, "LDY"),
    /* A1 */ desc(Op::Lda, DirectXIndirect, NoImm, "LDA"),
    /* A2 */ desc(Op::Ldx, Immediate, XW, "LDX"),
    /* A3 */ desc(Op::Lda, StackRelative, NoImm, "LDA"),
    /* A4 */ desc(Op::Ldy, Direct, NoImm, "LDY"),
    /* A5 */ desc(Op::Lda, Direct, NoImm, "LDA"),
    /* A6 */ desc(Op::Ldx, Direct, NoImm, "LDX"),
    /* A7 */ desc(Op::Lda, DirectIndirectLong, NoImm, "LDA"),
    /* A8 */ desc(Op::Tay, Implied, NoImm, "TAY"),
    /* A9 */ desc(Op::Lda, Immediate, M, "LDA"),
    /* AA */ desc(Op::Tax, Implied, NoImm, "TAX"),
    /* AB */ desc(Op::Plb, Implied, NoImm, "PLB"),
    /* AC */ desc(Op::Ldy, Absolute, NoImm, "LDY"),
    /* AD */ desc(Op::Lda, Absolute, NoImm, "LDA"),
    /* AE */ desc(Op::Ldx, Absolute, NoImm, "LDX"),
    /* AF */ desc(Op::Lda, AbsoluteLong, NoImm, "LDA"),
    /* B0 */ desc(Op::Bcs, Relative, NoImm, "BCS"),
    /* B1 */ desc(Op::Lda, DirectIndirectY, NoImm, "LDA"),
    /* B2 */ desc(Op::Lda, DirectIndirect, NoImm, "LDA"),
    /* B3 */ desc(Op::Lda, StackRelativeIndirectY, NoImm, "LDA"),
    /* B4 */ desc(Op::Ldy, DirectX, NoImm, "LDY"),
    /* B5 */ desc(Op::Lda, DirectX, NoImm, "LDA"),
    /* B6 */ desc(Op::Ldx, DirectY, NoImm, "LDX"),
    /* B7 */ desc(Op::Lda, DirectIndirectLongY, NoImm, "LDA"),
    /* B8 */ desc(Op::Clv, Implied, NoImm, "CLV"),
    /* B9 */ desc(Op::Lda, AbsoluteY, NoImm, "LDA"),
    /* BA */ desc(Op::Tsx, Implied, NoImm, "TSX"),
    /* BB */ desc(Op::Tyx, Implied, NoImm, "TYX"),
    /* BC */ desc(Op::Ldy, AbsoluteX, NoImm, "LDY"),
    /* BD */ desc(Op::Lda, AbsoluteX, NoImm, "LDA"),
    /* BE */ desc(Op::Ldx, AbsoluteY, NoImm, "LDX"),
    /* BF */ desc(Op::Lda, AbsoluteLongX, NoImm, "LDA"),
    /* C0 */ desc(Op::Cpy, Immediate, XW, "CPY"),
    /* C1 */ desc(Op::Cmp, DirectXIndirect, NoImm, "CMP"),
    /* C2 */ desc(Op::Rep, Immediate, Byte, "REP"),
    /* C3 */ desc(Op::Cmp, StackRelative, NoImm, "CMP"),
    /* C4 */ desc(Op::Cpy, Direct, NoImm, "CPY"),
    /* C5 */ desc(Op::Cmp, Direct, NoImm, "CMP"),
    /* C6 */ desc(Op::Dec, Direct, NoImm, "DEC"),
    /* C7 */ desc(Op::Cmp, DirectIndirectLong, NoImm, "CMP"),
    /* C8 */ desc(Op::Iny, Implied, NoImm, "INY"),
    /* C9 */ desc(Op::Cmp, Immediate, M, "CMP"),
    /* CA */ desc(Op::Dex, Implied, NoImm, "DEX"),
    /* CB */ desc(Op::Wai, Implied, NoImm, "WAI"),
    /* CC */ desc(Op::Cpy, Absolute, NoImm, "CPY"),
    /* CD */ desc(Op::Cmp, Absolute, NoImm, "CMP"),
    /* CE */ desc(Op::Dec, Absolute, NoImm, "DEC"),
    /* CF */ desc(Op::Cmp, AbsoluteLong, NoImm, "CMP"),
    /* D0 */ desc(Op::Bne, Relative, NoImm, "BNE"),
    /* D1 */ desc(Op::Cmp, DirectIndirectY, NoImm, "CMP"),
    /* D2 */ desc(Op::Cmp, DirectIndirect, NoImm, "CMP"),
    /* D3 */ desc(Op::Cmp, StackRelativeIndirectY, NoImm, "CMP"),
    /* D4 */ desc(Op::Pei, Direct, NoImm, "PEI"),
    /* D5 */ desc(Op::Cmp, DirectX, NoImm, "CMP"),
    /* D6 */ desc(Op::Dec, DirectX, NoImm, "DEC"),
    /* D7 */ desc(Op::Cmp, DirectIndirectLongY, NoImm, "CMP"),
    /* D8 */ desc(Op::Cld, Implied, NoImm, "CLD"),
    /* D9 */ desc(Op::Cmp, AbsoluteY, NoImm, "CMP"),
    /* DA */ desc(Op::Phx, Implied, NoImm, "PHX"),
    /* DB */ desc(Op::Stp, Implied, NoImm, "STP"),
    /* DC */ desc(Op::Jmp, AbsoluteIndirectLong, NoImm, "JMP"),
    /* DD */ desc(Op::Cmp, AbsoluteX, NoImm, "CMP"),
    /* DE */ desc(Op::Dec, AbsoluteX, NoImm, "DEC"),
    /* DF */ desc(Op::Cmp, AbsoluteLongX, NoImm, "CMP"),
    /* E0 */ desc(Op::Cpx, Immediate, XW, "CPX"),
    /* E1 */ desc(Op::Sbc, DirectXIndirect, NoImm, "SBC"),
    /* E2 */ desc(Op::Sep, Immediate, Byte, "SEP"),
    /* E3 */ desc(Op::Sbc, StackRelative, NoImm, "SBC"),
    /* E4 */ desc(Op::Cpx, Direct, NoImm, "CPX"),
    /* E5 */ desc(Op::Sbc, Direct, NoImm, "SBC"),
    /* E6 */ desc(Op::Inc, Direct, NoImm, "INC"),
    /* E7 */ desc(Op::Sbc, DirectIndirectLong, NoImm, "SBC"),
    /* E8 */ desc(Op::Inx, Implied, NoImm, "INX"),
    /* E9 */ desc(Op::Sbc, Immediate, M, "SBC"),
    /* EA */ desc(Op::Nop, Implied, NoImm, "NOP"),
    /* EB */ desc(Op::Xba, Implied, NoImm, "XBA"),
    /* EC */ desc(Op::Cpx, Absolute, NoImm, "CPX"),
    /* ED */ desc(Op::Sbc, Absolute, NoImm, "SBC"),
    /* EE */ desc(Op::Inc, Absolute, NoImm, "INC"),
    /* EF */ desc(Op::Sbc, AbsoluteLong, NoImm, "SBC"),
    /* F0 */ desc(Op::Beq, Relative, NoImm, "BEQ"),
    /* F1 */ desc(Op::Sbc, DirectIndirectY, NoImm, "SBC"),
    /* F2 */ desc(Op::Sbc, DirectIndirect, NoImm, "SBC"),
    /* F3 */ desc(Op::Sbc, StackRelativeIndirectY, NoImm, "SBC"),
    /* F4 */ desc(Op::Pea, Absolute, NoImm, "PEA"),
    /* F5 */ desc(Op::Sbc, DirectX, NoImm, "SBC"),
    /* F6 */ desc(Op::Inc, DirectX, NoImm, "INC"),
    /* F7 */ desc(Op::Sbc, DirectIndirectLongY, NoImm, "SBC"),
    /* F8 */ desc(Op::Sed, Implied, NoImm, "SED"),
    /* F9 */ desc(Op::Sbc, AbsoluteY, NoImm, "SBC"),
    /* FA */ desc(Op::Plx, Implied, NoImm, "PLX"),
    /* FB */ desc(Op::Xce, Implied, NoImm, "XCE"),
    /* FC */ desc(Op::Jsr, AbsoluteXIndirect, NoImm, "JSR"),
    /* FD */ desc(Op::Sbc, AbsoluteX, NoImm, "SBC"),
    /* FE */ desc(Op::Inc, AbsoluteX, NoImm, "INC"),
    /* FF */ desc(Op::Sbc, AbsoluteLongX, NoImm, "SBC"),
];
