//! =============================================================================
//! Protocol Handlers
//! =============================================================================
//!
//! Every supported LSP method maps to a Rust module inside this tree. Routing
//! is a static table keyed by method name so the server loop stays free of
//! per-method parsing.

pub mod diagnostics;
pub mod text_document;

use anyhow::Context;
use lsp_types::{
    DidChangeConfigurationParams, PublishDiagnosticsParams,
    notification::{
        DidChangeConfiguration, DidChangeTextDocument, DidOpenTextDocument, DidSaveTextDocument,
        Notification,
    },
    request::{CodeActionRequest, Request},
};
use serde_json::Value;

use crate::rpc::Service;

/// Handles a client request. Returns `None` for methods nobody implements.
pub fn route_request(
    service: &Service,
    method: &str,
    params: Value,
) -> Option<anyhow::Result<Value>> {
    if method == CodeActionRequest::METHOD {
        return Some(code_action(service, params));
    }
    None
}

fn code_action(service: &Service, params: Value) -> anyhow::Result<Value> {
    let params = serde_json::from_value(params).context("invalid codeAction params")?;
    let response = text_document::code_action::handle(service, params);
    Ok(serde_json::to_value(response)?)
}

/// Handles a client notification and returns the diagnostics to publish, if
/// any.
pub fn route_notification(
    service: &mut Service,
    method: &str,
    params: Value,
) -> anyhow::Result<Option<PublishDiagnosticsParams>> {
    if method == DidOpenTextDocument::METHOD {
        let params = serde_json::from_value(params).context("invalid didOpen params")?;
        return Ok(Some(text_document::did_open::handle(service, params)));
    }
    if method == DidChangeTextDocument::METHOD {
        let params = serde_json::from_value(params).context("invalid didChange params")?;
        return Ok(text_document::did_change::handle(service, params));
    }
    if method == DidSaveTextDocument::METHOD {
        let params = serde_json::from_value(params).context("invalid didSave params")?;
        return Ok(Some(text_document::did_save::handle(service, params)));
    }
    if method == DidChangeConfiguration::METHOD {
        let params: DidChangeConfigurationParams =
            serde_json::from_value(params).context("invalid configuration params")?;
        service
            .apply_workspace_settings(&params.settings)
            .context("failed to apply workspace settings")?;
        return Ok(None);
    }
    log::debug!("notification {method} ignored");
    Ok(None)
}
