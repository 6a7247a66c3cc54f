//! Structured Feedback Module
//!
//! Machine-readable compile results for `kplc --json`:
//! - JSON diagnostic reports with stable error codes
//! - Compilation statistics

use serde::{Deserialize, Serialize};

use crate::utils::{Category, Error};

// ==================== Structured Error Report ====================

/// A structured report of one diagnostic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Error code (e.g., "E0201")
    pub code: String,

    pub category: Category,

    /// The message as printed on the diagnostic line
    pub message: String,

    /// Location information; absent for I/O errors
    pub location: Option<Location>,

    /// Extra detail, such as the two types of a mismatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

// ==================== Compilation Feedback ====================

/// Complete result of one compile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationFeedback {
    pub success: bool,

    pub source_file: String,

    /// At most one entry; the first diagnostic ends the compile
    pub diagnostics: Vec<DiagnosticReport>,

    pub stats: CompilationStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilationStats {
    /// Objects in the symbol table, program included
    pub object_count: usize,

    /// Lines of source
    pub loc: usize,
}

// ==================== Error Conversion ====================

impl DiagnosticReport {
    /// Create a report from a compiler error
    pub fn from_error(error: &Error, file_name: &str) -> Self {
        let location = error.span().map(|span| Location {
            file: file_name.to_string(),
            line: span.line,
            column: span.col,
        });
        Self {
            code: error_code(error).to_string(),
            category: error.category(),
            message: error.to_string(),
            location,
            detail: error_detail(error),
        }
    }
}

/// Stable code per diagnostic kind: E01xx lexical, E02xx syntax,
/// E03xx semantic, E04xx I/O
fn error_code(error: &Error) -> &'static str {
    match error {
        Error::InvalidSymbol { .. } => "E0101",
        Error::UnterminatedComment { .. } => "E0102",
        Error::IdentTooLong { .. } => "E0103",
        Error::InvalidCharConstant { .. } => "E0104",
        Error::InvalidNumber { .. } => "E0105",

        Error::MissingToken { .. } => "E0201",
        Error::InvalidConstant { .. } => "E0202",
        Error::InvalidType { .. } => "E0203",
        Error::InvalidBasicType { .. } => "E0204",
        Error::InvalidParameter { .. } => "E0205",
        Error::InvalidStatement { .. } => "E0206",
        Error::InvalidArguments { .. } => "E0207",
        Error::InvalidComparator { .. } => "E0208",
        Error::InvalidExpression { .. } => "E0209",
        Error::InvalidTerm { .. } => "E0210",
        Error::InvalidFactor { .. } => "E0211",
        Error::NestingTooDeep { .. } => "E0212",

        Error::Undeclared { .. } => "E0301",
        Error::WrongKind { .. } => "E0302",
        Error::DuplicateDeclaration { .. } => "E0303",
        Error::TypeMismatch { .. } => "E0304",
        Error::NotAnLValue { .. } => "E0305",
        Error::ArityMismatch { .. } => "E0306",
        Error::NotArrayType { .. } => "E0307",
        Error::NotNumericType { .. } => "E0308",
        Error::InvalidOperatorForType { .. } => "E0309",

        Error::Io(_) => "E0401",
    }
}

fn error_detail(error: &Error) -> Option<String> {
    match error {
        Error::TypeMismatch { expected, found, .. } => {
            Some(format!("expected {}, found {}", expected, found))
        }
        Error::MissingToken { expected, .. } => Some(format!("expected {:?}", expected)),
        _ => None,
    }
}

// ==================== Output ====================

impl CompilationFeedback {
    pub fn success(source_file: String, stats: CompilationStats) -> Self {
        Self {
            success: true,
            source_file,
            diagnostics: vec![],
            stats,
        }
    }

    pub fn failure(source_file: String, error: &Error, stats: CompilationStats) -> Self {
        let report = DiagnosticReport::from_error(error, &source_file);
        Self {
            success: false,
            source_file,
            diagnostics: vec![report],
            stats,
        }
    }

    /// Output as pretty JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
