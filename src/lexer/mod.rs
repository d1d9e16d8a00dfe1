pub mod lexer;

pub use lexer::Lexer;

/// A location in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Byte offset from the start of the file
    pub offset: usize,
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // `>`: Move the data pointer right
    ShiftRight,
    // `<`: Move the data pointer left
    ShiftLeft,

    // `+`: Increment the byte at the data pointer
    Add,
    // `-`: Decrement the byte at the data pointer
    Sub,

    // `.`: Write the byte at the data pointer to the output device
    Out,
    // `,`: Read the next byte from the input device into the cell at the data pointer
    In,

    // `[`: If the byte at the data pointer is zero, jump forward past the matching `]`
    LBracket,
    // `]`: If the byte at the data pointer is non-zero, jump back to the matching `[`
    RBracket,

    // End of file: no more tokens left
    Eof,
}

impl TokenKind {
    /// Maps a command byte to its token kind. Every other byte is a comment.
    pub fn from_byte(b: u8) -> Option<TokenKind> {
        match b {
            b'>' => Some(TokenKind::ShiftRight),
            b'<' => Some(TokenKind::ShiftLeft),
            b'+' => Some(TokenKind::Add),
            b'-' => Some(TokenKind::Sub),
            b'.' => Some(TokenKind::Out),
            b',' => Some(TokenKind::In),
            b'[' => Some(TokenKind::LBracket),
            b']' => Some(TokenKind::RBracket),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}
