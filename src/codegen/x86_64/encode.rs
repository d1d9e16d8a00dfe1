//! x86_64 instruction encoders.
//!
//! One function per instruction shape the generator needs; each returns the
//! finished machine-code bytes. Encoding references:
//! http://ref.x86asm.net/coder64.html and
//! https://wiki.osdev.org/X86-64_Instruction_Encoding

use bitflags::bitflags;

bitflags! {
    /// REX prefix bits. `BASE` (0100) is the fixed high nibble; the low four
    /// bits widen the operand (W) or extend register fields (R, X, B).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Rex: u8 {
        const BASE = 0b0100_0000;
        /// Wide instruction (64 bit instead of 32)
        const W = 0b0000_1000;
        /// Extends the `reg` field in ModRM
        const R = 0b0000_0100;
        /// Extends the `index` field in SIB
        const X = 0b0000_0010;
        /// Extends the `rm` field in ModRM or the `base` field in SIB
        const B = 0b0000_0001;
    }
}

/// The current cell, `(%r13,%r12)`, as ModRM + SIB + disp8 bytes.
///
/// ModRM picks disp8+SIB mode with the opcode extension in `reg`; the SIB is
/// base r13, index r12, scale 1. Base r13 (like rbp) cannot use the
/// no-displacement mode, hence the zero disp8.
fn cell_operand(opcode_ext: u8) -> [u8; 3] {
    [0x40 | (opcode_ext << 3) | 0x04, 0x25, 0x00]
}

/// movabs $imm64, %r13 (49 BD imm64)
pub fn movabs_r13(imm64: u64) -> Vec<u8> {
    let mut buf = vec![(Rex::BASE | Rex::W | Rex::B).bits(), 0xBD];
    buf.extend_from_slice(&imm64.to_le_bytes());
    buf
}

/// xorq %r12, %r12 (4D 31 E4)
pub fn xorq_r12_r12() -> Vec<u8> {
    // 31 /r with ModRM 11 100 100 (r12, r12)
    vec![(Rex::BASE | Rex::W | Rex::R | Rex::B).bits(), 0x31, 0xE4]
}

/// xorq %rax, %rax (48 31 C0)
pub fn xorq_rax_rax() -> Vec<u8> {
    vec![(Rex::BASE | Rex::W).bits(), 0x31, 0xC0]
}

/// xorq %rdi, %rdi (48 31 FF)
pub fn xorq_rdi_rdi() -> Vec<u8> {
    vec![(Rex::BASE | Rex::W).bits(), 0x31, 0xFF]
}

/// addq $imm32, %r12 (49 81 C4 imm32)
pub fn addq_imm32_r12(imm32: i32) -> Vec<u8> {
    // 81 /0 id with ModRM 11 000 100
    let mut buf = vec![(Rex::BASE | Rex::W | Rex::B).bits(), 0x81, 0xC4];
    buf.extend_from_slice(&imm32.to_le_bytes());
    buf
}

/// subq $imm32, %r12 (49 81 EC imm32)
pub fn subq_imm32_r12(imm32: i32) -> Vec<u8> {
    // 81 /5 id with ModRM 11 101 100
    let mut buf = vec![(Rex::BASE | Rex::W | Rex::B).bits(), 0x81, 0xEC];
    buf.extend_from_slice(&imm32.to_le_bytes());
    buf
}

/// addb $imm8, (%r13,%r12) (43 80 44 25 00 imm8)
pub fn addb_imm8_cell(imm8: u8) -> Vec<u8> {
    // 80 /0 ib; REX.XB extends the SIB index (r12) and base (r13)
    let mut buf = vec![(Rex::BASE | Rex::X | Rex::B).bits(), 0x80];
    buf.extend_from_slice(&cell_operand(0));
    buf.push(imm8);
    buf
}

/// subb $imm8, (%r13,%r12) (43 80 6C 25 00 imm8)
pub fn subb_imm8_cell(imm8: u8) -> Vec<u8> {
    // 80 /5 ib
    let mut buf = vec![(Rex::BASE | Rex::X | Rex::B).bits(), 0x80];
    buf.extend_from_slice(&cell_operand(5));
    buf.push(imm8);
    buf
}

/// movb $0, (%r13,%r12) (43 C6 44 25 00 00)
pub fn movb_zero_cell() -> Vec<u8> {
    // C6 /0 ib
    let mut buf = vec![(Rex::BASE | Rex::X | Rex::B).bits(), 0xC6];
    buf.extend_from_slice(&cell_operand(0));
    buf.push(0x00);
    buf
}

/// testb $0xff, (%r13,%r12) (43 F6 44 25 00 FF)
pub fn testb_cell() -> Vec<u8> {
    // F6 /0 ib
    let mut buf = vec![(Rex::BASE | Rex::X | Rex::B).bits(), 0xF6];
    buf.extend_from_slice(&cell_operand(0));
    buf.push(0xFF);
    buf
}

/// leaq (%r13,%r12), %rsi (4B 8D 74 25 00)
pub fn leaq_cell_rsi() -> Vec<u8> {
    // 8D /r with rsi (110) in reg
    let mut buf = vec![(Rex::BASE | Rex::W | Rex::X | Rex::B).bits(), 0x8D];
    buf.extend_from_slice(&cell_operand(6));
    buf
}

/// movq $imm32, %rax (48 C7 C0 imm32), sign-extended
pub fn movq_imm32_rax(imm32: i32) -> Vec<u8> {
    movq_imm32(0xC0, imm32)
}

/// movq $imm32, %rdi (48 C7 C7 imm32), sign-extended
pub fn movq_imm32_rdi(imm32: i32) -> Vec<u8> {
    movq_imm32(0xC7, imm32)
}

/// movq $imm32, %rdx (48 C7 C2 imm32), sign-extended
pub fn movq_imm32_rdx(imm32: i32) -> Vec<u8> {
    movq_imm32(0xC2, imm32)
}

/// C7 /0 id with a register-direct ModRM byte.
fn movq_imm32(modrm: u8, imm32: i32) -> Vec<u8> {
    let mut buf = vec![(Rex::BASE | Rex::W).bits(), 0xC7, modrm];
    buf.extend_from_slice(&imm32.to_le_bytes());
    buf
}

/// jz rel32 (0F 84 rel32), relative to the end of the instruction
pub fn jz_rel32(rel32: i32) -> Vec<u8> {
    let mut buf = vec![0x0F, 0x84];
    buf.extend_from_slice(&rel32.to_le_bytes());
    buf
}

/// jnz rel32 (0F 85 rel32), relative to the end of the instruction
pub fn jnz_rel32(rel32: i32) -> Vec<u8> {
    let mut buf = vec![0x0F, 0x85];
    buf.extend_from_slice(&rel32.to_le_bytes());
    buf
}

/// call rel32 (E8 rel32), relative to the end of the instruction
pub fn call_rel32(rel32: i32) -> Vec<u8> {
    let mut buf = vec![0xE8];
    buf.extend_from_slice(&rel32.to_le_bytes());
    buf
}

/// ret (C3)
pub fn ret() -> Vec<u8> {
    vec![0xC3]
}

/// syscall (0F 05)
pub fn syscall() -> Vec<u8> {
    vec![0x0F, 0x05]
}
