//! kplc - front end for the KPL teaching language
//!
//! Scans, parses and type-checks a KPL program in a single pass, stopping at
//! the first diagnostic.

pub mod feedback;
pub mod frontend;
pub mod types;
pub mod utils;

pub use frontend::{compile, compile_file};
pub use utils::{Error, Result};
