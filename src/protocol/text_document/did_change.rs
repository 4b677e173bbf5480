use lsp_types::{DidChangeTextDocumentParams, PublishDiagnosticsParams};

use crate::rpc::Service;

/// Full sync only: the last content change carries the whole document.
pub fn handle(
    service: &Service,
    params: DidChangeTextDocumentParams,
) -> Option<PublishDiagnosticsParams> {
    let DidChangeTextDocumentParams {
        text_document,
        content_changes,
    } = params;
    let Some(change) = content_changes.into_iter().last() else {
        log::debug!("didChange for {} without changes", text_document.uri.as_str());
        return None;
    };
    if change.range.is_some() {
        log::warn!(
            "ranged didChange for {} treated as full text; the server only advertises full sync",
            text_document.uri.as_str()
        );
    }

    let diagnostics = service.update_document(&text_document.uri, &change.text)?;
    Some(PublishDiagnosticsParams {
        uri: text_document.uri,
        diagnostics,
        version: Some(text_document.version),
    })
}
