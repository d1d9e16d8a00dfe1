use crate::ir::{Op, OpKind};

/// Folds adjacent counted ops of the same kind into one.
///
/// Consecutive `Add`s (or `Shift`s) become a single op whose argument is the
/// sum; signed arguments make the merge plain addition. The merged op keeps
/// the first op's position. Cancelling pairs can leave an argument of zero,
/// which the no-op pass removes afterwards.
pub fn merge_adjacent(ops: Vec<Op>) -> Vec<Op> {
    if ops.len() < 2 {
        return ops;
    }

    let mut result: Vec<Op> = Vec::with_capacity(ops.len());

    for op in ops {
        if let Some(last) = result.last_mut() {
            match (last.kind, op.kind) {
                (OpKind::Add(a), OpKind::Add(b)) => {
                    last.kind = OpKind::Add(a + b);
                    continue;
                }
                (OpKind::Shift(a), OpKind::Shift(b)) => {
                    last.kind = OpKind::Shift(a + b);
                    continue;
                }
                _ => {}
            }
        }
        result.push(op);
    }

    super::fix_jump_targets(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(kinds: &[OpKind]) -> Vec<Op> {
        kinds.iter().map(|&kind| Op { kind, pos: None }).collect()
    }

    fn kinds(ops: &[Op]) -> Vec<OpKind> {
        ops.iter().map(|op| op.kind).collect()
    }

    #[test]
    fn test_adds_merge_by_summing() {
        let merged = merge_adjacent(ops(&[OpKind::Add(2), OpKind::Add(-5), OpKind::Add(1)]));
        assert_eq!(kinds(&merged), vec![OpKind::Add(-2)]);
    }

    #[test]
    fn test_shifts_merge_by_summing() {
        let merged = merge_adjacent(ops(&[OpKind::Shift(3), OpKind::Shift(4)]));
        assert_eq!(kinds(&merged), vec![OpKind::Shift(7)]);
    }

    #[test]
    fn test_mixed_kinds_do_not_merge() {
        let input = ops(&[OpKind::Add(1), OpKind::Shift(1), OpKind::Add(1)]);
        assert_eq!(merge_adjacent(input.clone()), input);
    }

    #[test]
    fn test_cancelling_pair_leaves_zero_argument() {
        let merged = merge_adjacent(ops(&[OpKind::Add(4), OpKind::Add(-4)]));
        assert_eq!(kinds(&merged), vec![OpKind::Add(0)]);
    }

    #[test]
    fn test_io_breaks_a_run() {
        let merged = merge_adjacent(ops(&[OpKind::Add(1), OpKind::Out, OpKind::Add(1)]));
        assert_eq!(
            kinds(&merged),
            vec![OpKind::Add(1), OpKind::Out, OpKind::Add(1)]
        );
    }
}
