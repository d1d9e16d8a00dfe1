use crate::ir::{Op, OpKind};

use self::clear_loops::clear_loops;
use self::constant_folding::merge_adjacent;
use self::empty_loops::remove_empty_loops;
use self::normalize::remove_no_ops;

pub mod clear_loops;
pub mod constant_folding;
pub mod empty_loops;
pub mod normalize;

/// Optimization level selected on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptLevel {
    /// No rewrites at all
    O0,
    O1,
    O2,
}

impl OptLevel {
    /// Parses the numeric `-O` flag. Anything outside 0..=2 is a caller error.
    pub fn from_flag(level: u8) -> Option<OptLevel> {
        match level {
            0 => Some(OptLevel::O0),
            1 => Some(OptLevel::O1),
            2 => Some(OptLevel::O2),
            _ => None,
        }
    }
}

/// Applies peephole and structural rewrites to the IR.
///
/// The four passes run in a fixed order until one full round leaves the
/// stream length unchanged. Every pass is non-increasing in length, so the
/// loop terminates. O1 and O2 currently share the same pipeline.
pub fn optimize(ops: Vec<Op>, level: OptLevel) -> Vec<Op> {
    if level == OptLevel::O0 || ops.is_empty() {
        return ops;
    }

    let mut result = ops;
    loop {
        let prev = result.len();
        result = clear_loops(result);
        result = remove_empty_loops(result);
        result = merge_adjacent(result);
        result = remove_no_ops(result);
        if result.len() == prev {
            return result;
        }
    }
}

/// Recomputes JZ/JNZ targets after a pass removed or merged instructions.
///
/// A single bracket walk re-pairs every JZ with its JNZ regardless of where
/// deletions happened, which is simpler than tracking how each removal moved
/// each target.
pub(crate) fn fix_jump_targets(mut ops: Vec<Op>) -> Vec<Op> {
    let mut stack: Vec<usize> = Vec::with_capacity(8);

    for i in 0..ops.len() {
        match ops[i].kind {
            OpKind::Jz(_) => stack.push(i),
            OpKind::Jnz(_) => {
                if let Some(start) = stack.pop() {
                    // the JZ jumps past the JNZ, the JNZ jumps back to the JZ
                    ops[start].kind = OpKind::Jz(i + 1);
                    ops[i].kind = OpKind::Jnz(start);
                }
            }
            _ => {}
        }
    }

    ops
}
