//! =============================================================================
//! textDocument/codeAction
//! =============================================================================
//!
//! Offers the local rewrites computed by [`crate::actions`] for the first line
//! of the requested range. Unknown documents get an empty response instead of
//! an error so clients that ask before `didOpen` lands stay quiet.

use lsp_types::{CodeActionOrCommand, CodeActionParams, CodeActionResponse};

use crate::rpc::Service;

pub fn handle(service: &Service, params: CodeActionParams) -> CodeActionResponse {
    let uri = params.text_document.uri;
    let line = params.range.start.line;
    match service.code_actions(&uri, line) {
        Ok(actions) => actions
            .into_iter()
            .map(CodeActionOrCommand::CodeAction)
            .collect(),
        Err(err) => {
            log::debug!("code actions unavailable: {err}");
            CodeActionResponse::new()
        }
    }
}
