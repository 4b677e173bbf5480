use lsp_types::{DidSaveTextDocumentParams, PublishDiagnosticsParams};

use crate::rpc::Service;

pub fn handle(service: &Service, params: DidSaveTextDocumentParams) -> PublishDiagnosticsParams {
    let uri = params.text_document.uri;
    let diagnostics = service.save_document(&uri, params.text.as_deref());
    PublishDiagnosticsParams {
        uri,
        diagnostics,
        version: None,
    }
}
