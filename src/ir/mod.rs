pub mod lower;

pub use lower::{lower, LowerError};

use crate::lexer::Position;

/// A very small backend-agnostic instruction set.
///
/// Jump targets are absolute indices into the op stream. Every `Jz` pairs
/// with exactly one `Jnz` later in the stream: the `Jz` jumps one past its
/// `Jnz`, and the `Jnz` jumps back to its `Jz`. The lowerer establishes this
/// and the optimizer re-establishes it after every rewrite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    /// Move the data pointer by the given signed amount
    Shift(isize),

    /// Add the given signed amount to the current cell, wrapping mod 256
    Add(isize),

    /// Set the current cell to zero
    Zero,

    /// Read one byte from the input into the current cell
    In,

    /// Write the current cell as one byte to the output
    Out,

    /// Jump to the absolute index if the current cell is zero
    Jz(usize),

    /// Jump to the absolute index if the current cell is non-zero
    Jnz(usize),
}

/// One intermediate instruction, optionally tagged with where it came from.
///
/// Positions are diagnostics only and never influence semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Op {
    pub kind: OpKind,
    pub pos: Option<Position>,
}

impl Op {
    pub fn at(kind: OpKind, pos: Position) -> Op {
        Op { kind, pos: Some(pos) }
    }
}

/// Formats the IR stream as one line per op with zero-padded indices.
pub fn dump(ops: &[Op]) -> String {
    let mut out = String::new();
    for (i, op) in ops.iter().enumerate() {
        let line = match op.kind {
            OpKind::Shift(k) => format!("{i:03}: SHIFT {k:+}\n"),
            OpKind::Add(k) => format!("{i:03}: ADD   {k:+}\n"),
            OpKind::Zero => format!("{i:03}: ZERO\n"),
            OpKind::In => format!("{i:03}: IN\n"),
            OpKind::Out => format!("{i:03}: OUT\n"),
            OpKind::Jz(t) => format!("{i:03}: JZ    {t}\n"),
            OpKind::Jnz(t) => format!("{i:03}: JNZ   {t}\n"),
        };
        out.push_str(&line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(kind: OpKind) -> Op {
        Op { kind, pos: None }
    }

    #[test]
    fn test_dump_formats_every_kind() {
        let ops = vec![
            op(OpKind::Add(3)),
            op(OpKind::Jz(6)),
            op(OpKind::Shift(-2)),
            op(OpKind::Zero),
            op(OpKind::In),
            op(OpKind::Out),
            op(OpKind::Jnz(1)),
        ];

        let expected = "\
000: ADD   +3
001: JZ    6
002: SHIFT -2
003: ZERO
004: IN
005: OUT
006: JNZ   1
";
        assert_eq!(dump(&ops), expected);
    }

    #[test]
    fn test_dump_empty_stream() {
        assert_eq!(dump(&[]), "");
    }
}
