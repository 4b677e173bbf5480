use lsp_types::{DidOpenTextDocumentParams, PublishDiagnosticsParams};

use crate::rpc::Service;

pub fn handle(service: &Service, params: DidOpenTextDocumentParams) -> PublishDiagnosticsParams {
    let document = params.text_document;
    let diagnostics = service.open_document(&document.uri, &document.text);
    PublishDiagnosticsParams {
        uri: document.uri,
        diagnostics,
        version: Some(document.version),
    }
}
