//! Frontend module - Reader, Scanner, Symbol Table, Parser/Analyzer

pub mod reader;
pub mod token;
pub mod lexer;
pub mod semantic;
pub mod parser;

use std::fs;
use std::path::Path;

use log::info;

use crate::utils::Result;
use parser::Parser;
use semantic::SymbolTable;

/// Compile a KPL program held in memory.
///
/// Returns the finished symbol table, or the first diagnostic.
pub fn compile(source: &str) -> Result<SymbolTable> {
    let mut parser = Parser::new(source)?;
    parser.compile_program()?;
    Ok(parser.into_symbol_table())
}

/// Read a KPL source file fully and compile it
pub fn compile_file(path: impl AsRef<Path>) -> Result<SymbolTable> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    info!("compiling {} ({} bytes)", path.display(), source.len());
    compile(&source)
}
