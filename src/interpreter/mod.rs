pub mod ir_interpreter;

pub use ir_interpreter::IrInterpreter;

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::lexer::Position;

/// Default tape length in cells (the traditional 30KB).
pub const DEFAULT_TAPE_SIZE: usize = 30_000;

/// What `In` writes to the cell when the input is exhausted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EofBehavior {
    /// Set the cell to 0
    #[default]
    Zero,
    /// Set the cell to 255
    MinusOne,
    /// Leave the cell untouched
    NoChange,
}

fn location(pos: &Option<Position>, pc: &usize) -> String {
    match pos {
        Some(p) => format!("at pc {} (line {}, col {})", pc, p.line, p.column),
        None => format!("at pc {}", pc),
    }
}

/// An error raised while executing IR.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("data pointer out of bounds: {dp} (valid range 0-{}) {}", .memory_size - 1, location(.pos, .pc))]
    PointerOutOfBounds {
        dp: isize,
        memory_size: usize,
        pos: Option<Position>,
        pc: usize,
    },

    #[error("io error {}: {source}", location(.pos, .pc))]
    Io {
        #[source]
        source: io::Error,
        pos: Option<Position>,
        pc: usize,
    },
}

/// The machine state a program runs against: the tape, the data pointer and
/// the byte streams. Streams default to the process stdin/stdout.
pub struct Runtime {
    /// Signed so an underflow is reported as the actual negative index
    data_pointer: isize,

    /// Statically sized, zero-initialised cell array
    tape: Vec<u8>,

    input: Box<dyn Read>,
    output: Box<dyn Write>,
    eof_behavior: EofBehavior,

    /// Reusable one-byte I/O buffer
    io_buf: [u8; 1],
}

impl Runtime {
    pub fn new(tape_size: usize) -> Self {
        Self {
            data_pointer: 0,
            tape: vec![0; tape_size],
            input: Box::new(io::stdin()),
            output: Box::new(io::stdout()),
            eof_behavior: EofBehavior::default(),
            io_buf: [0],
        }
    }

    pub fn with_input(mut self, input: Box<dyn Read>) -> Self {
        self.input = input;
        self
    }

    pub fn with_output(mut self, output: Box<dyn Write>) -> Self {
        self.output = output;
        self
    }

    pub fn with_eof_behavior(mut self, eof_behavior: EofBehavior) -> Self {
        self.eof_behavior = eof_behavior;
        self
    }

    fn cell(&self) -> usize {
        self.data_pointer as usize
    }

    /// Moves the data pointer, failing if it leaves the tape.
    ///
    /// This is the only op that moves the pointer, so every other op can
    /// index the tape without its own bounds check.
    pub fn shift(&mut self, by: isize, pos: Option<Position>, pc: usize) -> Result<(), RuntimeError> {
        self.data_pointer += by;
        if self.data_pointer < 0 || self.data_pointer as usize >= self.tape.len() {
            return Err(RuntimeError::PointerOutOfBounds {
                dp: self.data_pointer,
                memory_size: self.tape.len(),
                pos,
                pc,
            });
        }
        Ok(())
    }

    /// Adds to the current cell, wrapping mod 256.
    pub fn add(&mut self, by: isize) {
        let cell = &mut self.tape[self.data_pointer as usize];
        *cell = cell.wrapping_add(by as u8);
    }

    pub fn zero(&mut self) {
        let dp = self.cell();
        self.tape[dp] = 0;
    }

    pub fn cell_is_zero(&self) -> bool {
        self.tape[self.data_pointer as usize] == 0
    }

    /// Reads one byte into the current cell, applying the EOF policy when the
    /// input is exhausted.
    pub fn read_cell(&mut self, pos: Option<Position>, pc: usize) -> Result<(), RuntimeError> {
        let dp = self.cell();
        loop {
            match self.input.read(&mut self.io_buf) {
                Ok(0) => {
                    match self.eof_behavior {
                        EofBehavior::Zero => self.tape[dp] = 0,
                        EofBehavior::MinusOne => self.tape[dp] = 255,
                        EofBehavior::NoChange => {}
                    }
                    return Ok(());
                }
                Ok(_) => {
                    self.tape[dp] = self.io_buf[0];
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(RuntimeError::Io { source, pos, pc }),
            }
        }
    }

    /// Writes the current cell as one byte.
    pub fn write_cell(&mut self, pos: Option<Position>, pc: usize) -> Result<(), RuntimeError> {
        self.io_buf[0] = self.tape[self.data_pointer as usize];
        self.output
            .write_all(&self.io_buf)
            .map_err(|source| RuntimeError::Io { source, pos, pc })
    }
}
