//! =============================================================================
//! Code Action Engine
//! =============================================================================
//!
//! Looks at a single line of a stored document and proposes rewrites:
//! * `Foo(a, b, c)` → one argument per line
//! * `"hello world"` → one quoted word per line
//! * a `/* ... */` block holding JSON → a struct declaration after it
//!
//! Every trigger is checked independently; a line can get any number of
//! actions.

mod json_struct;

pub use json_struct::{InferredField, InferredKind, infer_fields, json_to_struct, render_struct};

use std::collections::HashMap;
use std::sync::LazyLock;

use lsp_types::{CodeAction, CodeActionKind, TextEdit, Uri, WorkspaceEdit};
use regex::Regex;

use crate::utils::{line_range, utf16_len};

pub const SPLIT_ARGUMENTS_TITLE: &str = "Split arguments into separate lines";
pub const SPLIT_STRING_TITLE: &str = "Split string into multiple lines";
pub const JSON_TO_STRUCT_TITLE: &str = "Convert JSON to Struct";

const COMMENT_OPEN: &str = "/*";
const COMMENT_CLOSE: &str = "*/";

static CALL_WITH_ARGUMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+\s*\(.*,.*\)\s*\{?").expect("call pattern is valid")
});

static STRING_WITH_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"".*\s.*""#).expect("string pattern is valid"));

/// Computes every action that applies to `line_number` of `text`.
/// A line past the end of the document yields no actions.
pub fn actions_for_line(uri: &Uri, text: &str, line_number: u32) -> Vec<CodeAction> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let index = line_number as usize;
    let Some(line) = lines.get(index).copied() else {
        log::debug!(
            "code action requested for line {line_number} but {} has {} lines",
            uri.as_str(),
            lines.len()
        );
        return Vec::new();
    };

    let mut actions = Vec::new();
    if let Some(edit) = split_arguments(line, line_number) {
        actions.push(rewrite(uri, SPLIT_ARGUMENTS_TITLE, edit));
    }
    if let Some(edit) = split_string(line, line_number) {
        actions.push(rewrite(uri, SPLIT_STRING_TITLE, edit));
    }
    if let Some(edit) = comment_to_struct(&lines, index) {
        actions.push(rewrite(uri, JSON_TO_STRUCT_TITLE, edit));
    }
    actions
}

fn rewrite(uri: &Uri, title: &str, edit: TextEdit) -> CodeAction {
    let mut changes = HashMap::new();
    changes.insert(uri.clone(), vec![edit]);
    CodeAction {
        title: title.to_string(),
        kind: Some(CodeActionKind::REFACTOR_REWRITE),
        edit: Some(WorkspaceEdit {
            changes: Some(changes),
            document_changes: None,
            change_annotations: None,
        }),
        ..CodeAction::default()
    }
}

/// Puts every comma separated argument of the first parenthesised group on
/// its own line. The edit replaces exactly the text between the parentheses,
/// even when that group holds a single argument and the comma sits in a
/// later call.
fn split_arguments(line: &str, line_number: u32) -> Option<TextEdit> {
    if !CALL_WITH_ARGUMENTS.is_match(line) {
        return None;
    }
    let open = line.find('(')?;
    let inner_start = open + 1;
    let inner_end = inner_start + closing_paren(&line[inner_start..])?;
    let arguments = &line[inner_start..inner_end];

    let pieces: Vec<&str> = arguments.split(',').map(str::trim).collect();
    let start = utf16_len(&line[..inner_start]);
    let end = start + utf16_len(arguments);
    Some(TextEdit {
        range: line_range(line_number, start, end),
        new_text: format!("\n{}\n", pieces.join(",\n")),
    })
}

/// Byte offset of the `)` closing a group whose `(` precedes `rest`.
/// Parentheses inside double-quoted literals are not counted. Falls back to
/// the first `)` when the parentheses are unbalanced.
fn closing_paren(rest: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in rest.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' if depth == 0 => return Some(offset),
            ')' => depth -= 1,
            _ => {}
        }
    }
    rest.find(')')
}

/// Turns the first quoted string into one quoted word per line. The edit
/// covers the string including both quotes.
fn split_string(line: &str, line_number: u32) -> Option<TextEdit> {
    if !STRING_WITH_SPACES.is_match(line) {
        return None;
    }
    let open = line.find('"')?;
    let rest = &line[open + 1..];
    let inner = &rest[..rest.find('"')?];

    let new_text: String = inner
        .split(' ')
        .map(|word| format!("\"{word}\"\n"))
        .collect();
    let start = utf16_len(&line[..open]);
    let end = start + 2 + utf16_len(inner);
    Some(TextEdit {
        range: line_range(line_number, start, end),
        new_text,
    })
}

/// For a line opening a block comment, gathers the comment body and appends
/// a struct declaration inferred from it right after the closing `*/`. When
/// the body is not JSON the body itself is inserted instead.
fn comment_to_struct(lines: &[&str], index: usize) -> Option<TextEdit> {
    if !lines[index].starts_with(COMMENT_OPEN) {
        return None;
    }

    let mut body = String::new();
    let mut closer = None;
    for (offset, line) in lines.iter().enumerate().skip(index + 1) {
        body.push_str(line);
        body.push('\n');
        if line.contains(COMMENT_CLOSE) {
            closer = Some(offset);
            break;
        }
    }
    let Some(closer) = closer else {
        log::debug!("block comment at line {index} is never closed");
        return None;
    };
    body.truncate(body.find(COMMENT_CLOSE)?);

    let declaration = json_to_struct(&body).unwrap_or(body);
    let closer_line = lines[closer];
    let close_at = closer_line.find(COMMENT_CLOSE)?;
    Some(TextEdit {
        range: line_range(
            closer as u32,
            utf16_len(&closer_line[..close_at]),
            utf16_len(closer_line),
        ),
        new_text: format!("{COMMENT_CLOSE}\n\n{declaration}"),
    })
}
