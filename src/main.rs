//! KPL Compiler front end
//!
//! Checks KPL programs and reports the first diagnostic.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use kplc::feedback::{CompilationFeedback, CompilationStats};
use kplc::frontend::{self, lexer::Scanner};

/// KPL Compiler
#[derive(Parser, Debug)]
#[command(name = "kplc")]
#[command(author = "Z1529")]
#[command(version = "0.1.0")]
#[command(about = "kplc - single-pass front end for the KPL teaching language")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input source file (.kpl)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long, global = true, conflicts_with = "symbols")]
    json: bool,

    /// Print the symbol table after a successful compile
    #[arg(long, global = true)]
    symbols: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a source file for errors
    Check {
        /// Input source file
        input: PathBuf,
    },
    /// List the tokens of a source file
    Tokens {
        /// Input source file
        input: PathBuf,
    },
    /// Print version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };
    process::exit(code);
}

/// Dispatch the command line; the returned value is the exit code
fn run(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Some(Commands::Check { input }) => check_file(input, cli),
        Some(Commands::Tokens { input }) => list_tokens(input),
        Some(Commands::Version) => {
            println!("kplc 0.1.0");
            println!("KPL Compiler front end");
            println!("License: Apache-2.0");
            Ok(0)
        }
        None => match &cli.input {
            Some(input) => check_file(input, cli),
            None => bail!("no input file specified\nUsage: kplc <FILE> or kplc check <FILE>"),
        },
    }
}

fn read_source(input: &Path) -> anyhow::Result<String> {
    fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
}

/// Compile a source file; a diagnostic is printed on stdout
fn check_file(input: &Path, cli: &Cli) -> anyhow::Result<i32> {
    let source = read_source(input)?;
    let file_name = input.display().to_string();
    let mut stats = CompilationStats {
        loc: source.lines().count(),
        ..CompilationStats::default()
    };

    match frontend::compile(&source) {
        Ok(table) => {
            stats.object_count = table.object_count();
            if cli.json {
                println!("{}", CompilationFeedback::success(file_name, stats).to_json());
            } else if cli.symbols {
                print!("{}", table.dump());
            }
            Ok(0)
        }
        Err(err) => {
            if cli.json {
                println!("{}", CompilationFeedback::failure(file_name, &err, stats).to_json());
            } else {
                println!("{}", err.report());
            }
            Ok(1)
        }
    }
}

/// Print every token and every lexical diagnostic, in source order
fn list_tokens(input: &Path) -> anyhow::Result<i32> {
    let source = read_source(input)?;
    let mut failed = false;
    for item in Scanner::new(&source).scan_all() {
        match item {
            Ok(token) => println!("{}", token),
            Err(err) => {
                failed = true;
                println!("{}", err.report());
            }
        }
    }
    Ok(if failed { 1 } else { 0 })
}
