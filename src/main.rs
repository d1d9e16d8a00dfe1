mod codegen;
mod elf;
mod interpreter;
mod ir;
mod lexer;
mod optimizer;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use thiserror::Error;

use crate::codegen::{gas, x86_64};
use crate::interpreter::{IrInterpreter, Runtime, RuntimeError, DEFAULT_TAPE_SIZE};
use crate::ir::{lower, LowerError, Op};
use crate::lexer::Lexer;
use crate::optimizer::{optimize, OptLevel};

/// Ahead-of-time compiler and interpreter for the eight-command tape language
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump tokenizer output
    Tokens {
        /// The program to tokenize
        file: PathBuf,
    },

    /// Dump the intermediate representation
    Ir {
        /// Optimization level (0, 1, or 2)
        #[arg(short = 'O', value_name = "LEVEL", default_value_t = 0)]
        opt_level: u8,

        /// The program to lower
        file: PathBuf,
    },

    /// Run the program in the interpreter
    Run {
        /// Optimization level (0, 1, or 2)
        #[arg(short = 'O', value_name = "LEVEL", default_value_t = 2)]
        opt_level: u8,

        /// The program to run
        file: PathBuf,
    },

    /// Write GAS (AT&T syntax) x86_64 assembly
    Asm {
        /// Optimization level (0, 1, or 2)
        #[arg(short = 'O', value_name = "LEVEL", default_value_t = 2)]
        opt_level: u8,

        /// Output file (default: input file with .s extension)
        #[arg(short = 'o', value_name = "OUT")]
        output: Option<PathBuf>,

        /// The program to compile
        file: PathBuf,
    },

    /// Build a native ELF64 Linux executable
    Build {
        /// Optimization level (0, 1, or 2)
        #[arg(short = 'O', value_name = "LEVEL", default_value_t = 2)]
        opt_level: u8,

        /// Output file (default: input file without extension)
        #[arg(short = 'o', value_name = "OUT")]
        output: Option<PathBuf>,

        /// The program to compile
        file: PathBuf,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error("invalid optimization level: {0} (must be 0, 1, or 2)")]
    BadOptLevel(u8),

    #[error("{}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Lower(#[from] LowerError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn main() -> ExitCode {
    // clap exits with status 2 on bad usage by default; keep every failure
    // on status 1
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(1);
        }
    };

    match run_command(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".red());
            ExitCode::from(1)
        }
    }
}

fn run_command(command: Command) -> Result<(), CliError> {
    match command {
        Command::Tokens { file } => {
            let src = read_source(&file)?;
            for token in Lexer::new(&src).tokenize() {
                println!("{}:{}\t{:?}", token.pos.line, token.pos.column, token.kind);
            }
            Ok(())
        }

        Command::Ir { opt_level, file } => {
            let ops = compile(&file, opt_level)?;
            print!("{}", ir::dump(&ops));
            Ok(())
        }

        Command::Run { opt_level, file } => {
            let ops = compile(&file, opt_level)?;
            let mut runtime = Runtime::new(DEFAULT_TAPE_SIZE);
            IrInterpreter::new().run(&mut runtime, &ops)?;
            Ok(())
        }

        Command::Asm { opt_level, output, file } => {
            let ops = compile(&file, opt_level)?;
            let out_path = output.unwrap_or_else(|| file.with_extension("s"));

            let asm = gas::Generator::new(&ops).generate();
            write_output(&out_path, asm.as_bytes())?;

            println!("{} {} -> {}", "generated".green(), file.display(), out_path.display());
            Ok(())
        }

        Command::Build { opt_level, output, file } => {
            let ops = compile(&file, opt_level)?;
            let out_path = output.unwrap_or_else(|| file.with_extension(""));

            let image = x86_64::Codegen::new(&ops).generate_elf();
            write_output(&out_path, &image)?;
            make_executable(&out_path)?;

            println!("{} {} -> {}", "built".green(), file.display(), out_path.display());
            Ok(())
        }
    }
}

/// Tokenizes, lowers and optimizes one source file.
fn compile(file: &Path, opt_level: u8) -> Result<Vec<Op>, CliError> {
    let level = OptLevel::from_flag(opt_level).ok_or(CliError::BadOptLevel(opt_level))?;
    let src = read_source(file)?;
    let ops = lower(&Lexer::new(&src).tokenize())?;
    Ok(optimize(ops, level))
}

fn read_source(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    fs::write(path, bytes).map_err(|source| CliError::Write { path: path.to_path_buf(), source })
}

/// chmod 0755 so the built image can be executed directly.
#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), CliError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|source| CliError::Write { path: path.to_path_buf(), source })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), CliError> {
    Ok(())
}
