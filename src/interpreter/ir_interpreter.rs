use crate::ir::{Op, OpKind};

use super::{Runtime, RuntimeError};

/// Executes an IR stream against a runtime.
pub struct IrInterpreter {}

impl IrInterpreter {
    pub fn new() -> Self {
        Self {}
    }

    /// Runs until the program counter falls off the end of the stream.
    ///
    /// Jump targets are trusted; the lowerer and optimizer guarantee they
    /// stay inside (or one past) the stream.
    pub fn run(&mut self, runtime: &mut Runtime, ops: &[Op]) -> Result<(), RuntimeError> {
        let mut pc = 0;

        while pc < ops.len() {
            let op = &ops[pc];

            match op.kind {
                OpKind::Shift(by) => runtime.shift(by, op.pos, pc)?,
                OpKind::Add(by) => runtime.add(by),
                OpKind::Zero => runtime.zero(),
                OpKind::In => runtime.read_cell(op.pos, pc)?,
                OpKind::Out => runtime.write_cell(op.pos, pc)?,
                OpKind::Jz(target) => {
                    if runtime.cell_is_zero() {
                        pc = target;
                        continue;
                    }
                }
                OpKind::Jnz(target) => {
                    if !runtime.cell_is_zero() {
                        pc = target;
                        continue;
                    }
                }
            }

            pc += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::EofBehavior;
    use crate::ir::lower;
    use crate::lexer::Lexer;
    use crate::optimizer::{optimize, OptLevel};

    use std::cell::RefCell;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;

    /// Write target the test can still read after the runtime took ownership.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        fn bytes(&self) -> Vec<u8> {
            self.0.borrow().clone()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn compile(src: &[u8], level: OptLevel) -> Vec<Op> {
        optimize(lower(&Lexer::new(src).tokenize()).unwrap(), level)
    }

    fn run_with_input(src: &[u8], input: &[u8], level: OptLevel) -> Vec<u8> {
        let ops = compile(src, level);
        let out = SharedBuf::default();
        let mut runtime = Runtime::new(64)
            .with_input(Box::new(Cursor::new(input.to_vec())))
            .with_output(Box::new(out.clone()));
        IrInterpreter::new().run(&mut runtime, &ops).unwrap();
        out.bytes()
    }

    #[test]
    fn test_prints_capital_a() {
        let out = run_with_input(b"++++++[>++++++++++<-]>+++++.", b"", OptLevel::O2);
        assert_eq!(out, vec![0x41]);
    }

    #[test]
    fn test_optimized_and_unoptimized_agree() {
        let src: &[u8] = b"+++[-]++[>+++<-]>[<+>-]<.";
        assert_eq!(
            run_with_input(src, b"", OptLevel::O0),
            run_with_input(src, b"", OptLevel::O2)
        );
    }

    #[test]
    fn test_cat_copies_input_to_output() {
        let out = run_with_input(b",[.,]", b"hello", OptLevel::O2);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_cell_wraps_at_256() {
        // 255 increments then one more wraps back to zero; `.` writes 0
        let mut src = vec![b'+'; 256];
        src.push(b'.');
        let out = run_with_input(&src, b"", OptLevel::O0);
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn test_eof_zero_overwrites_cell() {
        let out = run_with_input(b"+++++,.", b"", OptLevel::O0);
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn test_eof_minus_one_writes_255() {
        let ops = compile(b",.", OptLevel::O0);
        let out = SharedBuf::default();
        let mut runtime = Runtime::new(64)
            .with_input(Box::new(Cursor::new(Vec::new())))
            .with_output(Box::new(out.clone()))
            .with_eof_behavior(EofBehavior::MinusOne);
        IrInterpreter::new().run(&mut runtime, &ops).unwrap();
        assert_eq!(out.bytes(), vec![255]);
    }

    #[test]
    fn test_eof_no_change_keeps_cell() {
        let ops = compile(b"+++,.", OptLevel::O0);
        let out = SharedBuf::default();
        let mut runtime = Runtime::new(64)
            .with_input(Box::new(Cursor::new(Vec::new())))
            .with_output(Box::new(out.clone()))
            .with_eof_behavior(EofBehavior::NoChange);
        IrInterpreter::new().run(&mut runtime, &ops).unwrap();
        assert_eq!(out.bytes(), vec![3]);
    }

    #[test]
    fn test_pointer_underflow_is_reported() {
        let ops = compile(b"<", OptLevel::O0);
        let mut runtime = Runtime::new(64);
        match IrInterpreter::new().run(&mut runtime, &ops) {
            Err(RuntimeError::PointerOutOfBounds { dp, memory_size, pc, .. }) => {
                assert_eq!(dp, -1);
                assert_eq!(memory_size, 64);
                assert_eq!(pc, 0);
            }
            other => panic!("expected PointerOutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn test_pointer_overflow_is_reported() {
        let ops = compile(b">>>>", OptLevel::O0);
        let mut runtime = Runtime::new(4);
        match IrInterpreter::new().run(&mut runtime, &ops) {
            Err(RuntimeError::PointerOutOfBounds { dp, .. }) => assert_eq!(dp, 4),
            other => panic!("expected PointerOutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn test_write_error_is_fatal() {
        let ops = compile(b"+.", OptLevel::O0);
        let mut runtime = Runtime::new(64).with_output(Box::new(FailingWriter));
        match IrInterpreter::new().run(&mut runtime, &ops) {
            Err(RuntimeError::Io { pc, .. }) => assert_eq!(pc, 1),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_output_survives_a_late_error() {
        let ops = compile(b"+.<", OptLevel::O0);
        let out = SharedBuf::default();
        let mut runtime = Runtime::new(64).with_output(Box::new(out.clone()));
        assert!(IrInterpreter::new().run(&mut runtime, &ops).is_err());
        assert_eq!(out.bytes(), vec![1]);
    }
}
