//! =============================================================================
//! Service Facade
//! =============================================================================
//!
//! Glues the protocol handlers to the document store, the diagnostic parser
//! and the code action engine. The server loop owns one `Service` and calls
//! into it for every notification and request.

use std::path::PathBuf;

use lsp_types::{CodeAction, Diagnostic, Uri};

use crate::actions::actions_for_line;
use crate::config::{Config, ConfigError};
use crate::documents::{DocumentError, DocumentStore};
use crate::process::{MetaEditor, ToolchainAdapter};
use crate::protocol::diagnostics::{DiagnosticParser, to_lsp_diagnostic};
use crate::provider::{Provider, ProviderError};

pub struct Service {
    config: Config,
    documents: DocumentStore,
    parser: DiagnosticParser,
    cwd: PathBuf,
}

impl Service {
    /// Builds a service that compiles through the real MetaEditor.
    pub fn new(config: Config, cwd: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let cwd = cwd.into();
        let data_dir = config.plugin().resolved_data_dir()?;
        let adapter = metaeditor_adapter(&config, &data_dir)?;
        Ok(Self::with_adapter(config, adapter, data_dir, cwd))
    }

    /// Builds a service around any toolchain adapter.
    pub fn with_adapter(
        config: Config,
        adapter: Box<dyn ToolchainAdapter>,
        data_dir: impl Into<PathBuf>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        let cwd = cwd.into();
        Self {
            config,
            documents: DocumentStore::default(),
            parser: DiagnosticParser::new(adapter, data_dir, cwd.clone()),
            cwd,
        }
    }

    /// Stores the opened text and compiles it.
    pub fn open_document(&self, uri: &Uri, text: &str) -> Vec<Diagnostic> {
        self.documents.open(uri.as_str(), text);
        self.diagnostics_for(uri)
    }

    /// Replaces the stored text. Compiles it unless `publishOnChange` is off,
    /// in which case `None` is returned.
    pub fn update_document(&self, uri: &Uri, text: &str) -> Option<Vec<Diagnostic>> {
        self.documents.update(uri.as_str(), text);
        self.config
            .plugin()
            .publish_on_change
            .then(|| self.diagnostics_for(uri))
    }

    /// Recompiles a saved document, optionally refreshing its text first.
    pub fn save_document(&self, uri: &Uri, text: Option<&str>) -> Vec<Diagnostic> {
        if let Some(text) = text {
            self.documents.update(uri.as_str(), text);
        }
        self.diagnostics_for(uri)
    }

    /// Compiles `uri`. Compile failures are logged and produce no findings.
    pub fn diagnostics_for(&self, uri: &Uri) -> Vec<Diagnostic> {
        match self.parser.parse(uri.as_str()) {
            Ok(diagnostics) => diagnostics.iter().map(to_lsp_diagnostic).collect(),
            Err(err) => {
                log::warn!("no diagnostics for {}: {err}", uri.as_str());
                Vec::new()
            }
        }
    }

    /// Refactorings available on `line` of a stored document.
    pub fn code_actions(&self, uri: &Uri, line: u32) -> Result<Vec<CodeAction>, DocumentError> {
        let text = self.documents.get(uri.as_str())?;
        Ok(actions_for_line(uri, &text, line))
    }

    /// Applies workspace settings and rebuilds the compiler adapter when
    /// anything changed. Nothing is kept if the rebuild fails.
    pub fn apply_workspace_settings(
        &mut self,
        settings: &serde_json::Value,
    ) -> Result<bool, ServiceError> {
        let mut config = self.config.clone();
        if !config.apply_workspace_settings(settings) {
            return Ok(false);
        }
        let data_dir = config.plugin().resolved_data_dir()?;
        let adapter = metaeditor_adapter(&config, &data_dir)?;
        self.parser = DiagnosticParser::new(adapter, data_dir, self.cwd.clone());
        self.config = config;
        log::info!("settings updated: {:?}", self.config.plugin());
        Ok(true)
    }
}

fn metaeditor_adapter(
    config: &Config,
    data_dir: &std::path::Path,
) -> Result<Box<dyn ToolchainAdapter>, ServiceError> {
    let plugin = config.plugin();
    let binary = Provider::new(plugin, data_dir).resolve()?;
    log::debug!("using compiler {binary:?}");
    Ok(Box::new(MetaEditor::new(binary, plugin.compile_timeout)))
}

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
