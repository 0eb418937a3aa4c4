//! Tarn driver: interprets a source file, or emits Java for it.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as CliParser;
use num_traits::ToPrimitive;
use owo_colors::OwoColorize;

use tarn_analyzer::Analyzer;
use tarn_interpreter::{Interpreter, Value};
use tarn_lexer::Lexer;
use tarn_parser::Parser;
use tarn_syntax::error::Error;

#[derive(CliParser, Debug)]
#[command(name = "tarn", about = "Run Tarn programs or emit Java for them")]
struct Cli {
    /// Source file to process
    file: PathBuf,

    /// Emit Java source to stdout instead of interpreting
    #[arg(long = "emit", default_value_t = false)]
    emit: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let src = match fs::read_to_string(&cli.file) {
        Ok(src) => src,
        Err(e) => {
            eprintln!(
                "{}: {}",
                "error".red().bold(),
                format!("failed to read {}: {}", cli.file.display(), e).red()
            );
            return ExitCode::FAILURE;
        }
    };

    let tokens = match Lexer::new(&src).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => return fail("Lex error", &src, &e),
    };
    let mut source = match Parser::new(tokens).parse_source() {
        Ok(source) => source,
        Err(e) => return fail("Parse error", &src, &e),
    };
    if let Err(e) = Analyzer::new().analyze(&mut source) {
        return fail("Semantic error", &src, &e);
    }

    if cli.emit {
        match tarn_emitter::emit(&source) {
            Ok(java) => {
                println!("{}", java);
                ExitCode::SUCCESS
            }
            Err(e) => fail("Emit error", &src, &e),
        }
    } else {
        match Interpreter::new().interpret(&source) {
            // the process exits with the integer main returned, mirroring
            // the emitted System.exit(new Main().main()) contract
            Ok(Value::Integer(status)) => match status.to_u8() {
                Some(code) => ExitCode::from(code),
                None => ExitCode::FAILURE,
            },
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => fail("Runtime error", &src, &e),
        }
    }
}

fn fail(kind: &str, src: &str, err: &Error) -> ExitCode {
    render_error(kind, src, err);
    ExitCode::FAILURE
}

/// Prints the error with the offending source line and a caret under the
/// failing column when the error carries an offset.
fn render_error(kind: &str, src: &str, err: &Error) {
    eprintln!("{}: {}", kind.red().bold(), err.msg.red());
    if let Some(offset) = err.offset {
        let (line, col) = line_col(src, offset);
        if let Some(text) = src.lines().nth(line - 1) {
            eprintln!("  {}", text.bright_black());
            let mut marker = String::new();
            if col > 1 {
                marker.push_str(&" ".repeat(col - 1));
            }
            marker.push('^');
            eprintln!("  {}", marker.red());
        } else {
            eprintln!("  at index {}", offset);
        }
    }
}

/// Converts a character offset into 1-based line and column.
fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, c) in src.chars().enumerate() {
        if i == offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
