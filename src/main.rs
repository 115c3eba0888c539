use std::fs;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::process;

use loxrs as lox;

use anyhow::Context;
use clap::Parser as ClapParser;

use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::stmt::Stmt;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to run; omit to start an interactive session.
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    match args.script {
        Some(path) => run_file(&path),

        None => run_prompt(),
    }
}

fn run_file(path: &PathBuf) -> anyhow::Result<()> {
    let bytes: Vec<u8> = fs::read(path).with_context(|| format!("failed to read {:?}", path))?;
    let source: String = String::from_utf8(bytes).map_err(LoxError::from)?;

    let mut interpreter: Interpreter<Stdout> = Interpreter::new(io::stdout());

    if let Err(e) = run(&source, &mut interpreter) {
        println!("{}", e);

        // 65 for static errors, 70 for runtime errors.
        let code: i32 = match e {
            LoxError::Runtime { .. } => 70,

            _ => 65,
        };

        process::exit(code);
    }

    Ok(())
}

fn run_prompt() -> anyhow::Result<()> {
    let stdin = io::stdin();

    let mut interpreter: Interpreter<Stdout> = Interpreter::new(io::stdout());
    interpreter.set_echo(true);

    let mut input: String = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        input.clear();
        let nbytes: usize = stdin.read_line(&mut input)?;

        // EOF or an explicit quit ends the session.
        if nbytes == 0 || input.trim() == "quit" {
            break;
        }

        // Errors are reported and the session continues; globals survive,
        // locals were unwound with their block frames.
        if let Err(e) = run(&input, &mut interpreter) {
            println!("{}", e);
        }
    }

    Ok(())
}

/// One trip through the pipeline: scan, parse, resolve, evaluate.
fn run<W: Write>(source: &str, interpreter: &mut Interpreter<W>) -> lox::error::Result<()> {
    let scanner: Scanner = Scanner::new(source);
    let mut parser: Parser = Parser::new(scanner);

    let program: Vec<Stmt> = parser.parse()?;

    let mut resolver: Resolver<W> = Resolver::new(interpreter);
    resolver.resolve(&program)?;

    interpreter.interpret(&program)
}
