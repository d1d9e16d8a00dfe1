use super::{Position, Token, TokenKind};

/// Scans raw source bytes into command tokens.
///
/// Anything that is not one of the eight command characters is a comment and
/// is skipped. Scanning cannot fail; bracket matching is the lowerer's job.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    /** Human readable positions in file */
    cur_line: usize,
    cur_col: usize,

    /** 'raw' format / byte offset within the file */
    offset: usize,

    src: &'a [u8],
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a [u8]) -> Lexer<'a> {
        Lexer {
            cur_line: 1,
            cur_col: 1,

            offset: 0,

            src,
        }
    }

    /// Consumes one byte, keeping the line/column counters in step.
    fn consume_byte(&mut self) -> Option<u8> {
        let b = *self.src.get(self.offset)?;
        self.offset += 1;
        if b == b'\n' {
            self.cur_line += 1;
            self.cur_col = 1;
        } else {
            self.cur_col += 1;
        }
        Some(b)
    }

    /// Returns the next command token, or `Eof` once the source is exhausted.
    pub fn next_token(&mut self) -> Token {
        loop {
            let pos = Position {
                offset: self.offset,
                line: self.cur_line,
                column: self.cur_col,
            };

            match self.consume_byte() {
                Some(b) => {
                    if let Some(kind) = TokenKind::from_byte(b) {
                        return Token { kind, pos };
                    }
                    // comment byte, keep scanning
                }
                None => return Token { kind: TokenKind::Eof, pos },
            }
        }
    }

    /// Scans the whole source. The result always ends with exactly one `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        // source is usually mostly comments/whitespace
        let mut tokens = Vec::with_capacity(self.src.len() / 2);
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_all_commands() {
        let tokens = Lexer::new(b"><+-.,[]").tokenize();
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::ShiftRight,
                TokenKind::ShiftLeft,
                TokenKind::Add,
                TokenKind::Sub,
                TokenKind::Out,
                TokenKind::In,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = Lexer::new(b"say + hello - world").tokenize();
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Add, TokenKind::Sub, TokenKind::Eof]
        );
    }

    #[test]
    fn test_empty_source_yields_single_eof() {
        let tokens = Lexer::new(b"").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!(
            tokens[0].pos,
            Position { offset: 0, line: 1, column: 1 }
        );
    }

    #[test]
    fn test_positions_track_lines_and_columns() {
        let tokens = Lexer::new(b"+x\n [").tokenize();

        assert_eq!(tokens[0].kind, TokenKind::Add);
        assert_eq!(tokens[0].pos, Position { offset: 0, line: 1, column: 1 });

        assert_eq!(tokens[1].kind, TokenKind::LBracket);
        assert_eq!(tokens[1].pos, Position { offset: 4, line: 2, column: 2 });

        // Eof carries the position one past the final byte
        assert_eq!(tokens[2].kind, TokenKind::Eof);
        assert_eq!(tokens[2].pos, Position { offset: 5, line: 2, column: 3 });
    }

    #[test]
    fn test_retokenizing_commands_is_stable() {
        let src = b"+[->.<]";
        let tokens = Lexer::new(src).tokenize();
        for (i, tok) in tokens[..tokens.len() - 1].iter().enumerate() {
            assert_eq!(tok.pos.offset, i);
            assert_eq!(tok.pos.column, i + 1);
            assert_eq!(tok.pos.line, 1);
        }
    }
}
