pub mod encode;

use std::collections::{HashMap, HashSet};

use crate::elf;
use crate::ir::{Op, OpKind};

use super::{collect_targets, SYS_EXIT, SYS_WRITE, TAPE_SIZE};

/// Virtual address the code segment's page range starts at.
const CODE_BASE: u64 = 0x400000;

/// Virtual address of the zero-filled tape segment.
const BSS_BASE: u64 = 0x600000;

/// What a rel32 placeholder should end up pointing at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FixupTarget {
    /// An IR index, resolved through the label map
    Ir(usize),
    ReadHelper,
    WriteHelper,
}

/// A rel32 hole in the code buffer, patched once all offsets are known.
#[derive(Clone, Copy, Debug)]
struct Fixup {
    /// Offset in the code buffer where the rel32 starts
    offset: usize,
    target: FixupTarget,
}

/// Emits raw x86_64 machine code for an IR stream and packages it as a
/// static ELF64 executable.
///
/// Register convention, shared with the GAS backend:
///   - `r13` holds the tape base address, set once in the prologue
///   - `r12` holds the data-pointer offset
///
/// Every jump or helper call is emitted with a zero rel32 and a recorded
/// fix-up; helper offsets and forward-jump offsets only exist once emission
/// has finished, so everything resolves in one pass at the end.
pub struct Codegen<'a> {
    ops: &'a [Op],
    code: Vec<u8>,

    /// IR indices some jump lands on
    targets: HashSet<usize>,
    /// IR index -> code offset, filled in as emission passes each target
    label_offsets: HashMap<usize, usize>,
    fixups: Vec<Fixup>,

    read_helper: usize,
    write_helper: usize,

    code_base: u64,
    bss_base: u64,
}

impl<'a> Codegen<'a> {
    pub fn new(ops: &'a [Op]) -> Codegen<'a> {
        Codegen {
            ops,
            code: Vec::with_capacity(4096),
            targets: collect_targets(ops),
            label_offsets: HashMap::new(),
            fixups: Vec::new(),
            read_helper: 0,
            write_helper: 0,
            // the first page holds the ELF and program headers
            code_base: CODE_BASE + elf::PAGE_SIZE,
            bss_base: BSS_BASE,
        }
    }

    /// Produces the raw machine code: prologue, body, exit, I/O helpers.
    pub fn generate(mut self) -> Vec<u8> {
        self.emit_all();
        self.code
    }

    /// Produces a complete statically-linked ELF64 executable.
    pub fn generate_elf(mut self) -> Vec<u8> {
        self.emit_all();

        let mut builder = elf::Builder::new();
        builder.set_entry(self.code_base);
        builder.add_load_segment(self.code, self.code_base, elf::SegmentFlags::R | elf::SegmentFlags::X);
        builder.add_bss_segment(self.bss_base, TAPE_SIZE as u64, elf::SegmentFlags::R | elf::SegmentFlags::W);
        builder.build()
    }

    fn emit_all(&mut self) {
        self.emit_prologue();

        let ops = self.ops;
        for (i, op) in ops.iter().enumerate() {
            if self.targets.contains(&i) {
                self.label_offsets.insert(i, self.code.len());
            }
            self.emit_op(op);
        }

        // a loop at the very end targets one past the last op
        if self.targets.contains(&self.ops.len()) {
            self.label_offsets.insert(self.ops.len(), self.code.len());
        }

        self.emit_epilogue();
        self.emit_helpers();
        self.resolve_fixups();
    }

    fn emit(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    /// movabs $tape, %r13; xorq %r12, %r12
    fn emit_prologue(&mut self) {
        let tape = encode::movabs_r13(self.bss_base);
        self.emit(&tape);
        self.emit(&encode::xorq_r12_r12());
    }

    /// exit(0)
    fn emit_epilogue(&mut self) {
        self.emit(&encode::movq_imm32_rax(SYS_EXIT as i32));
        self.emit(&encode::xorq_rdi_rdi());
        self.emit(&encode::syscall());
    }

    /// The I/O helpers, emitted after the epilogue so the program's
    /// straight-line execution never falls into them.
    ///
    /// `_bf_read` ignores the syscall result: a read of zero bytes leaves the
    /// cell as it was. This matches the interpreter only under its `NoChange`
    /// EOF policy; the interpreter defaults to writing 0.
    fn emit_helpers(&mut self) {
        // _bf_read: read(0, cell, 1)
        self.read_helper = self.code.len();
        self.emit(&encode::leaq_cell_rsi());
        self.emit(&encode::xorq_rax_rax());
        self.emit(&encode::xorq_rdi_rdi());
        self.emit(&encode::movq_imm32_rdx(1));
        self.emit(&encode::syscall());
        self.emit(&encode::ret());

        // _bf_write: write(1, cell, 1)
        self.write_helper = self.code.len();
        self.emit(&encode::leaq_cell_rsi());
        self.emit(&encode::movq_imm32_rax(SYS_WRITE as i32));
        self.emit(&encode::movq_imm32_rdi(1));
        self.emit(&encode::movq_imm32_rdx(1));
        self.emit(&encode::syscall());
        self.emit(&encode::ret());
    }

    fn emit_op(&mut self, op: &Op) {
        match op.kind {
            OpKind::Shift(k) => self.emit_shift(k),
            OpKind::Add(k) => self.emit_add(k),
            OpKind::Zero => self.emit(&encode::movb_zero_cell()),
            OpKind::In => self.emit_call(FixupTarget::ReadHelper),
            OpKind::Out => self.emit_call(FixupTarget::WriteHelper),
            OpKind::Jz(target) => self.emit_branch(encode::jz_rel32(0), target),
            OpKind::Jnz(target) => self.emit_branch(encode::jnz_rel32(0), target),
        }
    }

    /// addq/subq $k, %r12
    fn emit_shift(&mut self, k: isize) {
        if k == 0 {
            return;
        }
        if k > 0 {
            self.emit(&encode::addq_imm32_r12(k as i32));
        } else {
            self.emit(&encode::subq_imm32_r12((-k) as i32));
        }
    }

    /// addb/subb $k, (%r13,%r12); the immediate is the low byte of |k|
    fn emit_add(&mut self, k: isize) {
        if k == 0 {
            return;
        }
        if k > 0 {
            self.emit(&encode::addb_imm8_cell(k as u8));
        } else {
            self.emit(&encode::subb_imm8_cell((-k) as u8));
        }
    }

    /// call rel32 with a placeholder displacement
    fn emit_call(&mut self, target: FixupTarget) {
        // rel32 starts one byte into the call instruction
        self.fixups.push(Fixup { offset: self.code.len() + 1, target });
        self.emit(&encode::call_rel32(0));
    }

    /// testb $0xff, (%r13,%r12); jcc rel32 with a placeholder displacement
    fn emit_branch(&mut self, branch: Vec<u8>, target: usize) {
        self.emit(&encode::testb_cell());
        // rel32 starts two bytes into the 0F 8x instruction
        self.fixups.push(Fixup {
            offset: self.code.len() + 2,
            target: FixupTarget::Ir(target),
        });
        self.emit(&branch);
    }

    /// Patches every recorded rel32 now that all code offsets are known.
    fn resolve_fixups(&mut self) {
        for fixup in &self.fixups {
            let target_offset = match fixup.target {
                FixupTarget::ReadHelper => self.read_helper,
                FixupTarget::WriteHelper => self.write_helper,
                FixupTarget::Ir(index) => *self
                    .label_offsets
                    .get(&index)
                    .expect("jump target has no recorded label"),
            };

            // displacement is relative to the end of the instruction, which
            // is always 4 bytes past the rel32 itself
            let insn_end = fixup.offset + 4;
            let rel32 = i32::try_from(target_offset as i64 - insn_end as i64)
                .expect("relative jump does not fit in 32 bits");

            self.code[fixup.offset..fixup.offset + 4].copy_from_slice(&rel32.to_le_bytes());
        }
    }
}
