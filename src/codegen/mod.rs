pub mod gas;
pub mod x86_64;

use std::collections::HashSet;

use crate::ir::{Op, OpKind};

/// Linux syscall numbers used by generated programs.
pub(crate) const SYS_WRITE: u64 = 1;
pub(crate) const SYS_EXIT: u64 = 60;

/// Tape length of generated programs, in bytes.
pub(crate) const TAPE_SIZE: usize = 30_000;

/// Collects the IR indices any jump lands on.
///
/// Both backends place a label (or record a code offset) only at these
/// indices. The index one past the last op is a valid target: a loop at the
/// very end of the program jumps there.
pub(crate) fn collect_targets(ops: &[Op]) -> HashSet<usize> {
    let mut targets = HashSet::new();
    for op in ops {
        if let OpKind::Jz(target) | OpKind::Jnz(target) = op.kind {
            targets.insert(target);
        }
    }
    targets
}
