use crate::ir::{Op, OpKind};

/// Drops empty `[]` loops, a `Jz` immediately followed by its own `Jnz`.
///
/// These show up as comment brackets in real programs. If the cell is zero
/// the pair falls through; if not, the program was spinning forever anyway,
/// and removal preserves every terminating execution.
pub fn remove_empty_loops(ops: Vec<Op>) -> Vec<Op> {
    if ops.len() < 2 {
        return ops;
    }

    let mut result = Vec::with_capacity(ops.len());
    let mut i = 0;

    while i < ops.len() {
        if i + 1 < ops.len() {
            let window = (ops[i].kind, ops[i + 1].kind);
            if let (OpKind::Jz(end), OpKind::Jnz(back)) = window {
                if end == i + 2 && back == i {
                    i += 2;
                    continue;
                }
            }
        }

        result.push(ops[i]);
        i += 1;
    }

    super::fix_jump_targets(result)
}
