use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::ValueEnum;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::lox::{self, Lox, EXIT_STATIC_ERROR, EXIT_USAGE};
use rox::parser::Parser;
use rox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    /// Script to run; starts an interactive prompt when omitted
    script: Option<PathBuf>,

    /// Print the script's tokens or syntax tree instead of running it
    #[arg(long, value_enum, requires = "script")]
    dump: Option<Dump>,

    /// Print token dumps as JSON lines
    #[arg(long, requires = "dump")]
    json: bool,

    /// Enable logging to app.log
    #[arg(long)]
    log: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Dump {
    Tokens,
    Ast,
}

fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Token stream, one per line; exits non-zero if any character was rejected.
fn dump_tokens(source: &str, json: bool) -> Result<i32> {
    let mut stdout = io::stdout().lock();
    let mut code = 0;

    for item in Scanner::new(source) {
        match item {
            Ok(token) if json => writeln!(stdout, "{}", serde_json::to_string(&token)?)?,
            Ok(token) => writeln!(stdout, "{}", token)?,
            Err(e) => {
                eprintln!("{}", e);
                code = EXIT_STATIC_ERROR;
            }
        }
    }

    Ok(code)
}

fn dump_ast(source: &str) -> Result<i32> {
    let (tokens, lex_errors) = Scanner::new(source).scan_all();
    let mut code = 0;

    for e in &lex_errors {
        eprintln!("{}", e);
        code = EXIT_STATIC_ERROR;
    }

    match Parser::new(tokens).parse() {
        Ok(statements) => {
            let mut stdout = io::stdout().lock();
            for stmt in &statements {
                writeln!(stdout, "{}", AstPrinter::print_stmt(stmt))?;
            }
        }
        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            code = EXIT_STATIC_ERROR;
        }
    }

    Ok(code)
}

fn main() -> Result<()> {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        // Help and version go to stdout and exit 0 through clap itself.
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            eprint!("{}", e.render());
            std::process::exit(EXIT_USAGE);
        }
    };

    if args.log {
        init_logger()?;
    }

    info!("CLI arguments: {:?}", args);

    let code = match (&args.script, args.dump) {
        (Some(script), Some(Dump::Tokens)) => dump_tokens(&read_file(script)?, args.json)?,

        (Some(script), Some(Dump::Ast)) => dump_ast(&read_file(script)?)?,

        (Some(script), None) => {
            lox::run_file(script).context(format!("Failed to run {:?}", script))?
        }

        (None, _) => {
            let mut session = Lox::new();
            session
                .run_prompt(io::stdin().lock(), io::stdout())
                .context("Prompt I/O failed")?;
            0
        }
    };

    debug!("Exiting with code {}", code);

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
