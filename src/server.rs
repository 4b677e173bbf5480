use std::path::PathBuf;

use anyhow::Context;
use lsp_server::{
    Connection, ErrorCode, Message, Notification as ServerNotification, Request, Response,
};
use lsp_types::{
    CodeActionKind, CodeActionOptions, CodeActionProviderCapability, InitializeParams,
    InitializeResult, PositionEncodingKind, PublishDiagnosticsParams, ServerCapabilities,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions,
    notification::{Exit, Notification as LspNotification, PublishDiagnostics},
    request::{Initialize, Request as LspRequest, Shutdown},
};
use serde_json::Value;

use crate::config::{Config, PluginSettings};
use crate::protocol;
use crate::rpc::Service;

/// Runs the LSP server over stdio. This is the entry-point an editor's LSP
/// client executes.
pub fn run_stdio_server() -> anyhow::Result<()> {
    env_logger::init();

    let settings = PluginSettings::from_env().context("invalid environment configuration")?;
    let (connection, io_threads) = Connection::stdio();
    let (init_id, init_params) = connection
        .initialize_start()
        .context("waiting for initialize")?;
    let params: InitializeParams =
        serde_json::from_value(init_params).context("invalid initialize params")?;
    if let Some(root) = workspace_root_from_params(&params) {
        log::info!("client workspace root: {}", root.display());
    }

    // MetaEditor reports paths relative to the directory it was launched from,
    // which is ours.
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let mut service = Service::new(Config::new(settings), cwd)?;
    if let Some(options) = &params.initialization_options {
        service.apply_workspace_settings(options)?;
    }

    let init_result = InitializeResult {
        server_info: Some(lsp_types::ServerInfo {
            name: "mq-bridge".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
        capabilities: advertised_capabilities(),
    };
    connection
        .initialize_finish(init_id, serde_json::to_value(init_result)?)
        .context("failed to send initialize result")?;

    main_loop(&connection, &mut service)?;
    drop(connection);
    io_threads.join()?;

    Ok(())
}

pub fn advertised_capabilities() -> ServerCapabilities {
    let text_sync = TextDocumentSyncOptions {
        open_close: Some(true),
        change: Some(TextDocumentSyncKind::FULL),
        will_save: Some(false),
        will_save_wait_until: Some(false),
        save: Some(TextDocumentSyncSaveOptions::SaveOptions(
            lsp_types::SaveOptions {
                include_text: Some(true),
            },
        )),
    };
    let code_action_provider = CodeActionOptions {
        code_action_kinds: Some(vec![CodeActionKind::REFACTOR_REWRITE]),
        ..CodeActionOptions::default()
    };
    ServerCapabilities {
        position_encoding: Some(PositionEncodingKind::UTF16),
        text_document_sync: Some(TextDocumentSyncCapability::Options(text_sync)),
        code_action_provider: Some(CodeActionProviderCapability::Options(code_action_provider)),
        ..Default::default()
    }
}

#[allow(deprecated)]
fn workspace_root_from_params(params: &InitializeParams) -> Option<PathBuf> {
    if let Some(root_path) = &params.root_path {
        return Some(PathBuf::from(root_path));
    }
    params
        .root_uri
        .as_ref()
        .and_then(|uri| crate::utils::uri_to_file_path(uri.as_str()))
        .map(PathBuf::from)
}

/// Processes messages one at a time until the client sends `exit` or the
/// connection drops. Compilation runs inline, so a request is fully handled
/// before the next one is read.
pub fn main_loop(connection: &Connection, service: &mut Service) -> anyhow::Result<()> {
    for message in &connection.receiver {
        match message {
            Message::Request(req) => {
                if handle_request(connection, service, req)? {
                    break;
                }
            }
            Message::Response(resp) => {
                log::debug!("ignoring stray response: {:?}", resp);
            }
            Message::Notification(notif) => {
                if notif.method == Exit::METHOD {
                    break;
                }
                match protocol::route_notification(service, &notif.method, notif.params) {
                    Ok(Some(params)) => publish_diagnostics(connection, params)?,
                    Ok(None) => {}
                    Err(err) => log::warn!("failed to handle {}: {err:?}", notif.method),
                }
            }
        }
    }

    Ok(())
}

fn publish_diagnostics(
    connection: &Connection,
    params: PublishDiagnosticsParams,
) -> anyhow::Result<()> {
    let notif = ServerNotification::new(
        PublishDiagnostics::METHOD.to_string(),
        serde_json::to_value(params)?,
    );
    connection.sender.send(Message::Notification(notif))?;
    Ok(())
}

/// Answers one request. Returns `true` once the client asked to shut down.
fn handle_request(
    connection: &Connection,
    service: &mut Service,
    req: Request,
) -> anyhow::Result<bool> {
    let Request { id, method, params } = req;

    if method == Shutdown::METHOD {
        let response = Response::new_ok(id, Value::Null);
        connection.sender.send(response.into())?;
        return Ok(true);
    }

    if method == Initialize::METHOD {
        // Already handled via initialize_start, but the client might resend; respond with error.
        let response = Response::new_err(
            id,
            ErrorCode::InvalidRequest as i32,
            "initialize already completed".to_string(),
        );
        connection.sender.send(response.into())?;
        return Ok(false);
    }

    let response = match protocol::route_request(service, &method, params) {
        Some(Ok(result)) => Response::new_ok(id, result),
        Some(Err(err)) => Response::new_err(
            id,
            ErrorCode::InvalidParams as i32,
            format!("failed to handle {method}: {err:#}"),
        ),
        None => Response::new_err(
            id,
            ErrorCode::MethodNotFound as i32,
            format!("method {method} is not implemented"),
        ),
    };
    connection.sender.send(response.into())?;

    Ok(false)
}
