//! =============================================================================
//! Shared Types
//! =============================================================================
//!
//! Domain records shared between the compiler bridge, the diagnostic parser
//! and the protocol handlers, so none of them has to depend on the others.

use std::fmt;

use lsp_types::DiagnosticSeverity;

/// Severity word reported by MetaEditor in front of each diagnostic code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Error,
    Warning,
    Information,
    /// Any other word, kept verbatim.
    Other(String),
}

impl DiagnosticKind {
    pub fn from_word(word: &str) -> Self {
        match word {
            "error" => Self::Error,
            "warning" => Self::Warning,
            "information" => Self::Information,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "information",
            Self::Other(word) => word,
        }
    }

    /// Only `warning` is downgraded; everything else is surfaced as an error.
    pub fn severity(&self) -> DiagnosticSeverity {
        match self {
            Self::Warning => DiagnosticSeverity::WARNING,
            _ => DiagnosticSeverity::ERROR,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding parsed out of the compiler log, already converted to
/// zero-based LSP coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerDiagnostic {
    pub script_name: String,
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: u32,
    pub character: u32,
    pub code: i32,
}
