//! =============================================================================
//! Open Document Store
//! =============================================================================
//!
//! Tracks the latest full text for each document the client opened so code
//! actions can inspect lines without touching the filesystem. Every update
//! replaces the whole snapshot; there is no incremental sync.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Captures the current snapshot for every open text document.
#[derive(Default)]
pub struct DocumentStore {
    docs: Mutex<HashMap<String, String>>,
}

impl DocumentStore {
    /// Inserts or replaces the document snapshot on textDocument/didOpen.
    pub fn open(&self, uri: &str, text: &str) {
        self.replace(uri, text);
    }

    /// Replaces the snapshot wholesale on textDocument/didChange.
    pub fn update(&self, uri: &str, text: &str) {
        if !self.contains(uri) {
            log::debug!("received update for unopened document {uri}; storing it anyway");
        }
        self.replace(uri, text);
    }

    /// Returns a copy of the current text for `uri`.
    pub fn get(&self, uri: &str) -> Result<String, DocumentError> {
        self.docs()
            .get(uri)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(uri.to_string()))
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.docs().contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.docs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn replace(&self, uri: &str, text: &str) {
        self.docs().insert(uri.to_string(), text.to_string());
    }

    // Every write is a single insert, so a poisoned map is still consistent.
    fn docs(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.docs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document {0} is not open")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "file:///workspace/app.mq4";

    #[test]
    fn get_unknown_document_fails() {
        let store = DocumentStore::default();
        assert_eq!(
            store.get(URI),
            Err(DocumentError::NotFound(URI.to_string()))
        );
    }

    #[test]
    fn update_replaces_full_text() {
        let store = DocumentStore::default();
        store.open(URI, "int a;\nint b;\n");
        store.update(URI, "double c;");
        assert_eq!(store.get(URI).unwrap(), "double c;");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_without_open_still_stores() {
        let store = DocumentStore::default();
        store.update(URI, "void OnTick() {}");
        assert!(store.contains(URI));
    }

    #[test]
    fn store_is_shareable_across_threads() {
        let store = std::sync::Arc::new(DocumentStore::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || store.open(&format!("file:///doc{i}.mq4"), "x"))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 4);
    }
}
