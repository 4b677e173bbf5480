//! =============================================================================
//! Compiler Diagnostics
//! =============================================================================
//!
//! Drives a [`ToolchainAdapter`] for one document and turns the lines of its
//! log into [`CompilerDiagnostic`] records, then into LSP diagnostics. Lines
//! look like `<path>(<line>,<col>) : <severity> <code>: <message>`; anything
//! else, `information:` entries and findings for other files are dropped.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use lsp_types::{Diagnostic, NumberOrString};
use regex::Regex;

use crate::process::{CompileError, ToolchainAdapter};
use crate::types::{CompilerDiagnostic, DiagnosticKind};
use crate::utils::{compiler_target_path, line_range, utf16_len};

pub const DIAGNOSTIC_SOURCE: &str = "mq-bridge";
pub const LOG_FILE_NAME: &str = "compile.log";

const INFORMATION_MARKER: &str = "information:";

static LOG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*)\((\d+),(\d+)\) : (\w+) (\d+): (.*)$").expect("log line pattern is valid")
});

pub struct DiagnosticParser {
    adapter: Box<dyn ToolchainAdapter>,
    data_dir: PathBuf,
    cwd: PathBuf,
}

impl DiagnosticParser {
    pub fn new(
        adapter: Box<dyn ToolchainAdapter>,
        data_dir: impl Into<PathBuf>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            adapter,
            data_dir: data_dir.into(),
            cwd: cwd.into(),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE_NAME)
    }

    /// Compiles the document behind `uri` and returns the findings that
    /// belong to it.
    pub fn parse(&self, uri: &str) -> Result<Vec<CompilerDiagnostic>, ParseError> {
        let target = compiler_target_path(uri, &self.cwd);
        log::debug!("compiling {uri} as {target}");

        let log_path = self.log_path();
        ensure_log_file(&log_path)?;

        let log = self.adapter.compile(&target, &log_path)?;
        Ok(parse_log(&log, &target))
    }
}

/// Creates an empty log file (and its directory) if it does not exist yet.
fn ensure_log_file(path: &Path) -> Result<(), ParseError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ParseError::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| ParseError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Extracts the diagnostics for `target` from a decoded compiler log.
pub fn parse_log(log: &str, target: &str) -> Vec<CompilerDiagnostic> {
    let log = log.strip_prefix('\u{feff}').unwrap_or(log);
    log.lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.contains(INFORMATION_MARKER))
        .filter_map(|line| parse_line(line, target))
        .collect()
}

fn parse_line(line: &str, target: &str) -> Option<CompilerDiagnostic> {
    let Some(captures) = LOG_LINE.captures(line) else {
        log::trace!("skipping log line {line:?}");
        return None;
    };
    let script_name = &captures[1];
    if script_name != target {
        return None;
    }

    Some(CompilerDiagnostic {
        script_name: script_name.to_string(),
        kind: DiagnosticKind::from_word(&captures[4]),
        message: captures[6].to_string(),
        line: to_zero_based(&captures[2]),
        character: to_zero_based(&captures[3]),
        code: captures[5].parse().unwrap_or(0),
    })
}

fn to_zero_based(value: &str) -> u32 {
    value.parse::<u32>().unwrap_or(0).saturating_sub(1)
}

/// Converts a parsed record into the diagnostic published to the client.
/// The range starts at the reported column and is as wide as the message.
pub fn to_lsp_diagnostic(diagnostic: &CompilerDiagnostic) -> Diagnostic {
    let end = diagnostic
        .character
        .saturating_add(utf16_len(&diagnostic.message));
    Diagnostic {
        range: line_range(diagnostic.line, diagnostic.character, end),
        severity: Some(diagnostic.kind.severity()),
        code: Some(NumberOrString::Number(diagnostic.code)),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: diagnostic.message.clone(),
        ..Diagnostic::default()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("failed to prepare compiler log {path:?}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to compile: {0}")]
    Compile(#[from] CompileError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::DiagnosticSeverity;
    use std::sync::{Arc, Mutex};

    const TARGET: &str = "Experts/app.mq4";

    struct CannedLog {
        log: String,
        calls: Arc<Mutex<Vec<(String, PathBuf)>>>,
    }

    impl ToolchainAdapter for CannedLog {
        fn compile(&self, target: &str, log_path: &Path) -> Result<String, CompileError> {
            self.calls
                .lock()
                .unwrap()
                .push((target.to_string(), log_path.to_path_buf()));
            Ok(self.log.clone())
        }
    }

    struct Failing;

    impl ToolchainAdapter for Failing {
        fn compile(&self, _target: &str, _log_path: &Path) -> Result<String, CompileError> {
            Err(CompileError::Decode(crate::process::DecodeError::OddLength(7)))
        }
    }

    #[test]
    fn parse_log_converts_coordinates_to_zero_based() {
        let log = "Experts/app.mq4(12,5) : error 256: 'Foo' - undeclared identifier";
        let diagnostics = parse_log(log, TARGET);
        assert_eq!(
            diagnostics,
            vec![CompilerDiagnostic {
                script_name: TARGET.to_string(),
                kind: DiagnosticKind::Error,
                message: "'Foo' - undeclared identifier".to_string(),
                line: 11,
                character: 4,
                code: 256,
            }]
        );
    }

    #[test]
    fn parse_log_clamps_zero_coordinates() {
        let diagnostics = parse_log("Experts/app.mq4(0,0) : warning 43: lossy", TARGET);
        assert_eq!(diagnostics[0].line, 0);
        assert_eq!(diagnostics[0].character, 0);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Warning);
    }

    #[test]
    fn parse_log_keeps_only_target_findings() {
        let log = [
            "Include/lib.mqh(3,1) : error 100: other file",
            "Experts/app.mq4(1,1) : error 101: first",
            "Include/lib.mqh(4,1) : warning 102: other file",
            "Experts/app.mq4(2,2) : warning 103: second",
            "Include/util.mqh(9,9) : error 104: other file",
        ]
        .join("\r\n");
        let diagnostics = parse_log(&log, TARGET);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|diag| diag.script_name == TARGET));
    }

    #[test]
    fn parse_log_skips_information_blank_and_noise() {
        let log = "\u{feff}\r\n\
                   information: foo bar\r\n\
                   Experts/app.mq4 : information: compiling 'app.mq4'\r\n\
                   Result: 2 errors, 0 warnings\r\n\
                   \r\n";
        assert!(parse_log(log, TARGET).is_empty());
    }

    #[test]
    fn parse_log_strips_byte_order_mark() {
        let log = "\u{feff}Experts/app.mq4(1,2) : error 1: first line";
        assert_eq!(parse_log(log, TARGET).len(), 1);
    }

    #[test]
    fn unknown_severity_words_are_errors() {
        let diagnostics = parse_log("Experts/app.mq4(1,1) : fatal 9: boom", TARGET);
        assert_eq!(
            diagnostics[0].kind,
            DiagnosticKind::Other("fatal".to_string())
        );
        let lsp = to_lsp_diagnostic(&diagnostics[0]);
        assert_eq!(lsp.severity, Some(DiagnosticSeverity::ERROR));
    }

    #[test]
    fn to_lsp_diagnostic_spans_message_width() {
        let diagnostics = parse_log("Experts/app.mq4(3,4) : warning 43: abc", TARGET);
        let lsp = to_lsp_diagnostic(&diagnostics[0]);
        assert_eq!(lsp.range, line_range(2, 3, 6));
        assert_eq!(lsp.severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(lsp.code, Some(NumberOrString::Number(43)));
        assert_eq!(lsp.source.as_deref(), Some(DIAGNOSTIC_SOURCE));
    }

    #[test]
    fn parser_creates_log_file_and_passes_normalized_target() {
        let data = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let adapter = CannedLog {
            log: "Experts/app.mq4(5,1) : error 1: boom".to_string(),
            calls: Arc::clone(&calls),
        };
        let parser = DiagnosticParser::new(
            Box::new(adapter),
            data.path().join("nested"),
            "/home/trader/mql4",
        );

        let diagnostics = parser
            .parse("file:///home/trader/mql4/Experts/app.mq4")
            .expect("parse");
        assert_eq!(diagnostics.len(), 1);
        assert!(parser.log_path().is_file());
        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].0, TARGET);
        assert_eq!(calls[0].1, parser.log_path());
    }

    #[test]
    fn parser_is_idempotent_for_unchanged_log() {
        let data = tempfile::tempdir().expect("tempdir");
        let adapter = CannedLog {
            log: "Experts/app.mq4(5,1) : error 1: boom\nExperts/app.mq4(6,2) : warning 2: hm"
                .to_string(),
            calls: Arc::default(),
        };
        let parser = DiagnosticParser::new(Box::new(adapter), data.path(), "/home/trader/mql4");
        let uri = "file:///home/trader/mql4/Experts/app.mq4";
        assert_eq!(parser.parse(uri).unwrap(), parser.parse(uri).unwrap());
    }

    #[test]
    fn compile_failures_propagate() {
        let data = tempfile::tempdir().expect("tempdir");
        let parser = DiagnosticParser::new(Box::new(Failing), data.path(), "/");
        let err = parser.parse("file:///app.mq4").expect_err("compile failure");
        assert!(matches!(err, ParseError::Compile(CompileError::Decode(_))));
    }
}
