//! Session driver: runs source text through scanner, parser, resolver and
//! interpreter, reports diagnostics to stderr and keeps the two error flags
//! the CLI turns into exit codes.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use log::{debug, info};

use crate::error::{LoxError, Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Exit code for a malformed command line.
pub const EXIT_USAGE: i32 = 64;

/// Exit code after a scan, parse or resolve error.
pub const EXIT_STATIC_ERROR: i32 = 65;

/// Exit code after a runtime error.
pub const EXIT_RUNTIME_ERROR: i32 = 70;

/// One interpreter session. Globals persist across [`Lox::run`] calls, which
/// is what lets REPL lines build on each other.
pub struct Lox<'src> {
    interpreter: Interpreter<'src>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Default for Lox<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'src> Lox<'src> {
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// Session whose program output goes to `out` instead of stdout.
    pub fn with_output<W: Write + 'src>(out: W) -> Self {
        Self::with_interpreter(Interpreter::with_output(out))
    }

    fn with_interpreter(interpreter: Interpreter<'src>) -> Self {
        Self {
            interpreter,
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Scan, parse, resolve and execute `source`. Static errors are all
    /// reported and prevent execution; a runtime error stops it.
    pub fn run(&mut self, source: &'src str) {
        info!("Running {} bytes of source", source.len());

        let (tokens, lex_errors) = Scanner::new(source).scan_all();
        let scanned_cleanly = lex_errors.is_empty();
        for e in &lex_errors {
            self.error(e);
        }

        // Parse even after lex errors so syntax errors surface in the same run.
        let statements = match Parser::new(tokens).parse() {
            Ok(statements) => statements,
            Err(errors) => {
                for e in &errors {
                    self.error(e);
                }
                return;
            }
        };

        if !scanned_cleanly {
            return;
        }

        let resolved = Resolver::new(&mut self.interpreter).resolve(&statements);
        if let Err(errors) = resolved {
            for e in &errors {
                self.error(e);
            }
            return;
        }

        if let Err(e) = self.interpreter.interpret(&statements) {
            self.runtime_error(&e);
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Static errors take precedence over runtime errors.
    pub fn exit_code(&self) -> i32 {
        if self.had_error {
            EXIT_STATIC_ERROR
        } else if self.had_runtime_error {
            EXIT_RUNTIME_ERROR
        } else {
            0
        }
    }

    fn error(&mut self, e: &LoxError) {
        debug_assert!(e.is_static());
        debug!("Static error: {}", e);
        eprintln!("{}", e);
        self.had_error = true;
    }

    fn runtime_error(&mut self, e: &RuntimeError) {
        debug!("Runtime error: {}", e);
        eprintln!("{}", e.report());
        self.had_runtime_error = true;
    }
}

impl Lox<'static> {
    /// Read-eval-print loop. Ends at end of input or on an empty line.
    ///
    /// A static error only clears the static flag, so later lines still run.
    pub fn run_prompt<R: BufRead, W: Write>(&mut self, mut input: R, mut prompt: W) -> io::Result<()> {
        info!("Starting prompt");

        loop {
            write!(prompt, "> ")?;
            prompt.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }

            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                break;
            }

            // Functions and classes from this line may outlive it in the globals.
            let line: &'static str = Box::leak(line.to_owned().into_boxed_str());
            self.run(line);
            self.had_error = false;
        }

        writeln!(prompt)?;
        Ok(())
    }
}

/// Run a script in a fresh session and return the exit code it earned.
pub fn run_file(path: &Path) -> Result<i32> {
    info!("Running script {:?}", path);

    let source = String::from_utf8(fs::read(path)?)?;

    let mut lox = Lox::new();
    lox.run(&source);

    Ok(lox.exit_code())
}
