use crate::ir::{Op, OpKind};

/// Replaces `[-]` and `[+]` loops with a single `Zero`.
///
/// The window is `Jz, Add ±1, Jnz` where the pair targets each other. A
/// decrement reaches zero by counting down; an increment reaches zero by
/// wrapping past 255. Either way the loop only ever exits with the cell at
/// zero, so `Zero` is equivalent. The replacement keeps the `[`'s position.
pub fn clear_loops(ops: Vec<Op>) -> Vec<Op> {
    if ops.len() < 3 {
        return ops;
    }

    let mut result = Vec::with_capacity(ops.len());
    let mut i = 0;

    while i < ops.len() {
        if i + 2 < ops.len() {
            let window = (ops[i].kind, ops[i + 1].kind, ops[i + 2].kind);
            if let (OpKind::Jz(end), OpKind::Add(step), OpKind::Jnz(back)) = window {
                if (step == 1 || step == -1) && end == i + 3 && back == i {
                    result.push(Op { kind: OpKind::Zero, pos: ops[i].pos });
                    i += 3;
                    continue;
                }
            }
        }

        result.push(ops[i]);
        i += 1;
    }

    super::fix_jump_targets(result)
}
