use thiserror::Error;

use crate::lexer::{Position, Token, TokenKind};

use super::{Op, OpKind};

/// Returned when lowering fails, ie. on unmatched brackets.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerError {
    #[error("unmatched '[' at line {} col {} (offset {})", .0.line, .0.column, .0.offset)]
    UnmatchedOpenBracket(Position),

    #[error("unmatched ']' at line {} col {} (offset {})", .0.line, .0.column, .0.offset)]
    UnmatchedCloseBracket(Position),
}

/// Counts the consecutive tokens of `kind` starting at index `i`.
fn fold_run(tokens: &[Token], i: usize, kind: TokenKind) -> usize {
    tokens[i..].iter().take_while(|t| t.kind == kind).count()
}

/// Converts a token stream into IR with jump targets resolved.
///
/// Runs of `>` `<` `+` `-` fold into a single counted op taking the position
/// of the run's first token. `[` emits a `Jz` with a placeholder target that
/// is back-patched when the matching `]` emits its `Jnz`.
pub fn lower(tokens: &[Token]) -> Result<Vec<Op>, LowerError> {
    let mut ops = Vec::with_capacity(tokens.len());
    // open brackets: IR index of the Jz plus the `[` position for diagnostics
    let mut loop_stack: Vec<(usize, Position)> = Vec::with_capacity(8);

    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];

        match tok.kind {
            TokenKind::Eof => {
                if let Some(&(_, pos)) = loop_stack.first() {
                    return Err(LowerError::UnmatchedOpenBracket(pos));
                }
                return Ok(ops);
            }

            TokenKind::LBracket => {
                loop_stack.push((ops.len(), tok.pos));
                ops.push(Op::at(OpKind::Jz(0), tok.pos));
                i += 1;
            }

            TokenKind::RBracket => {
                let Some((start, _)) = loop_stack.pop() else {
                    return Err(LowerError::UnmatchedCloseBracket(tok.pos));
                };
                ops.push(Op::at(OpKind::Jnz(start), tok.pos));
                // the Jz jumps one past the Jnz just emitted
                ops[start].kind = OpKind::Jz(ops.len());
                i += 1;
            }

            TokenKind::ShiftRight | TokenKind::ShiftLeft | TokenKind::Add | TokenKind::Sub => {
                let run = fold_run(tokens, i, tok.kind);
                let kind = match tok.kind {
                    TokenKind::ShiftRight => OpKind::Shift(run as isize),
                    TokenKind::ShiftLeft => OpKind::Shift(-(run as isize)),
                    TokenKind::Add => OpKind::Add(run as isize),
                    TokenKind::Sub => OpKind::Add(-(run as isize)),
                    _ => unreachable!(),
                };
                ops.push(Op::at(kind, tok.pos));
                i += run;
            }

            TokenKind::Out => {
                ops.push(Op::at(OpKind::Out, tok.pos));
                i += 1;
            }

            TokenKind::In => {
                ops.push(Op::at(OpKind::In, tok.pos));
                i += 1;
            }
        }
    }

    // a stream from the lexer always ends in Eof; a hand-built one may not
    if let Some(&(_, pos)) = loop_stack.first() {
        return Err(LowerError::UnmatchedOpenBracket(pos));
    }
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn lower_src(src: &[u8]) -> Result<Vec<Op>, LowerError> {
        lower(&Lexer::new(src).tokenize())
    }

    fn kinds(ops: &[Op]) -> Vec<OpKind> {
        ops.iter().map(|op| op.kind).collect()
    }

    #[test]
    fn test_folds_runs_with_signs() {
        let ops = lower_src(b">>><<+++--").unwrap();
        assert_eq!(
            kinds(&ops),
            vec![
                OpKind::Shift(3),
                OpKind::Shift(-2),
                OpKind::Add(3),
                OpKind::Add(-2),
            ]
        );
    }

    #[test]
    fn test_io_ops_do_not_fold() {
        let ops = lower_src(b"..,,").unwrap();
        assert_eq!(
            kinds(&ops),
            vec![OpKind::Out, OpKind::Out, OpKind::In, OpKind::In]
        );
    }

    #[test]
    fn test_loop_targets_are_paired() {
        // +[->++<]
        let ops = lower_src(b"+[->++<]").unwrap();
        assert_eq!(
            kinds(&ops),
            vec![
                OpKind::Add(1),
                OpKind::Jz(7),
                OpKind::Add(-1),
                OpKind::Shift(1),
                OpKind::Add(2),
                OpKind::Shift(-1),
                OpKind::Jnz(1),
            ]
        );
    }

    #[test]
    fn test_nested_loops() {
        let ops = lower_src(b"[[+]]").unwrap();
        assert_eq!(
            kinds(&ops),
            vec![
                OpKind::Jz(5),
                OpKind::Jz(4),
                OpKind::Add(1),
                OpKind::Jnz(1),
                OpKind::Jnz(0),
            ]
        );
    }

    #[test]
    fn test_run_position_comes_from_first_token() {
        let ops = lower_src(b" ++").unwrap();
        let pos = ops[0].pos.unwrap();
        assert_eq!(pos.offset, 1);
        assert_eq!(pos.column, 2);
    }

    #[test]
    fn test_unmatched_open_reports_oldest_bracket() {
        // both brackets stay open; the error points at the first one
        match lower_src(b"[[+") {
            Err(LowerError::UnmatchedOpenBracket(pos)) => {
                assert_eq!(pos.offset, 0);
                assert_eq!(pos.line, 1);
                assert_eq!(pos.column, 1);
            }
            other => panic!("expected UnmatchedOpenBracket, got {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_close_reports_offending_bracket() {
        match lower_src(b"+]") {
            Err(LowerError::UnmatchedCloseBracket(pos)) => {
                assert_eq!(pos.offset, 1);
                assert_eq!(pos.line, 1);
                assert_eq!(pos.column, 2);
            }
            other => panic!("expected UnmatchedCloseBracket, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_source_lowers_to_empty_stream() {
        assert_eq!(lower_src(b"").unwrap(), vec![]);
    }
}
