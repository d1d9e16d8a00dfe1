use crate::ir::{Op, OpKind};

/// Normalizes `Add` arguments to mod 256 and drops no-ops.
///
/// Cells wrap at 256, so `Add k` and `Add (k % 256)` are indistinguishable;
/// the truncating `%` keeps the sign, leaving arguments in `(-255..=255)`.
/// `Add 0` and `Shift 0` (typically left behind by the merge pass) disappear.
pub fn remove_no_ops(ops: Vec<Op>) -> Vec<Op> {
    let mut result = Vec::with_capacity(ops.len());

    for mut op in ops {
        if let OpKind::Add(k) = op.kind {
            op.kind = OpKind::Add(k % 256);
        }

        match op.kind {
            OpKind::Add(0) | OpKind::Shift(0) => continue,
            _ => result.push(op),
        }
    }

    super::fix_jump_targets(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::tests::assert_jump_pairs;

    fn ops(kinds: &[OpKind]) -> Vec<Op> {
        kinds.iter().map(|&kind| Op { kind, pos: None }).collect()
    }

    fn kinds(ops: &[Op]) -> Vec<OpKind> {
        ops.iter().map(|op| op.kind).collect()
    }

    #[test]
    fn test_add_wraps_mod_256() {
        let out = remove_no_ops(ops(&[OpKind::Add(300), OpKind::Add(-300)]));
        assert_eq!(kinds(&out), vec![OpKind::Add(44), OpKind::Add(-44)]);
    }

    #[test]
    fn test_full_wrap_becomes_no_op_and_is_dropped() {
        let out = remove_no_ops(ops(&[OpKind::Add(256), OpKind::Add(-512)]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_zero_ops_are_dropped() {
        let out = remove_no_ops(ops(&[
            OpKind::Add(0),
            OpKind::Shift(0),
            OpKind::Shift(2),
        ]));
        assert_eq!(kinds(&out), vec![OpKind::Shift(2)]);
    }

    #[test]
    fn test_shift_argument_is_not_wrapped() {
        let out = remove_no_ops(ops(&[OpKind::Shift(300)]));
        assert_eq!(kinds(&out), vec![OpKind::Shift(300)]);
    }

    #[test]
    fn test_targets_repair_after_drops() {
        let out = remove_no_ops(ops(&[
            OpKind::Add(0),
            OpKind::Jz(3),
            OpKind::Add(-1),
            OpKind::Jnz(1),
        ]));
        assert_jump_pairs(&out);
        assert_eq!(
            kinds(&out),
            vec![OpKind::Jz(3), OpKind::Add(-1), OpKind::Jnz(0)]
        );
    }
}
