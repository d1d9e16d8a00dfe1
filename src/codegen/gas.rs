use std::collections::HashSet;

use crate::ir::{Op, OpKind};

use super::{collect_targets, SYS_EXIT, SYS_WRITE, TAPE_SIZE};

/// Emits GAS (AT&T syntax) assembly for x86_64 Linux.
///
/// Register convention, shared with the native backend:
///   - `%r13` holds the tape base address and is never touched again
///   - `%r12` holds the data-pointer offset
///
/// so the current cell is always `(%r13,%r12)`. Assembling and linking this
/// output yields the same program the native backend packages directly.
pub struct Generator<'a> {
    ops: &'a [Op],
    out: String,
    targets: HashSet<usize>,
}

impl<'a> Generator<'a> {
    pub fn new(ops: &'a [Op]) -> Generator<'a> {
        let targets = collect_targets(ops);
        Generator { ops, out: String::new(), targets }
    }

    /// Produces the complete assembly listing.
    pub fn generate(mut self) -> String {
        self.emit_header();
        self.emit_prologue();

        let ops = self.ops;
        for (i, op) in ops.iter().enumerate() {
            if self.targets.contains(&i) {
                self.emit_label(i);
            }
            self.emit_op(op);
        }

        // a loop can target the index one past the last op
        if self.targets.contains(&self.ops.len()) {
            self.emit_label(self.ops.len());
        }

        self.emit_epilogue();
        self.emit_helpers();

        self.out
    }

    fn emit_header(&mut self) {
        self.out.push_str(".section .bss\n");
        self.out.push_str(&format!("    .lcomm tape, {TAPE_SIZE}\n"));
        self.out.push('\n');
        self.out.push_str(".section .text\n");
        self.out.push_str(".globl _start\n");
    }

    fn emit_prologue(&mut self) {
        self.out.push_str("_start:\n");
        self.out.push_str("    movq $tape, %r13\n");
        self.out.push_str("    xorq %r12, %r12\n");
    }

    fn emit_epilogue(&mut self) {
        self.out.push_str(&format!("    movq ${SYS_EXIT}, %rax\n"));
        self.out.push_str("    xorq %rdi, %rdi\n");
        self.out.push_str("    syscall\n");
    }

    /// The I/O helpers sit past the epilogue so straight-line execution never
    /// falls into them.
    ///
    /// `_bf_read` ignores the syscall result, so reading at end-of-input
    /// leaves the cell unchanged. This matches the interpreter only under its
    /// `NoChange` EOF policy; the interpreter defaults to writing 0.
    fn emit_helpers(&mut self) {
        self.out.push_str("\n_bf_read:\n");
        self.out.push_str("    leaq (%r13,%r12), %rsi\n");
        self.out.push_str("    xorq %rax, %rax\n");
        self.out.push_str("    xorq %rdi, %rdi\n");
        self.out.push_str("    movq $1, %rdx\n");
        self.out.push_str("    syscall\n");
        self.out.push_str("    ret\n");

        self.out.push_str("\n_bf_write:\n");
        self.out.push_str("    leaq (%r13,%r12), %rsi\n");
        self.out.push_str(&format!("    movq ${SYS_WRITE}, %rax\n"));
        self.out.push_str("    movq $1, %rdi\n");
        self.out.push_str("    movq $1, %rdx\n");
        self.out.push_str("    syscall\n");
        self.out.push_str("    ret\n");
    }

    fn emit_label(&mut self, index: usize) {
        self.out.push_str(&format!(".jt_{index}:\n"));
    }

    fn emit_op(&mut self, op: &Op) {
        match op.kind {
            OpKind::Shift(k) => self.emit_shift(k),
            OpKind::Add(k) => self.emit_add(k),
            OpKind::Zero => self.out.push_str("    movb $0, (%r13,%r12)\n"),
            OpKind::In => self.out.push_str("    call _bf_read\n"),
            OpKind::Out => self.out.push_str("    call _bf_write\n"),
            OpKind::Jz(target) => self.emit_jump("jz", target),
            OpKind::Jnz(target) => self.emit_jump("jnz", target),
        }
    }

    fn emit_shift(&mut self, k: isize) {
        if k == 0 {
            return;
        }
        if k > 0 {
            self.out.push_str(&format!("    addq ${k}, %r12\n"));
        } else {
            self.out.push_str(&format!("    subq ${}, %r12\n", -k));
        }
    }

    fn emit_add(&mut self, k: isize) {
        if k == 0 {
            return;
        }
        if k > 0 {
            self.out.push_str(&format!("    addb ${k}, (%r13,%r12)\n"));
        } else {
            self.out.push_str(&format!("    subb ${}, (%r13,%r12)\n", -k));
        }
    }

    fn emit_jump(&mut self, mnemonic: &str, target: usize) {
        self.out.push_str("    testb $0xff, (%r13,%r12)\n");
        self.out.push_str(&format!("    {mnemonic} .jt_{target}\n"));
    }
}
