//! Editable-group snapshots for the settings modal.
//!
//! A snapshot holds the last server-confirmed values for one group. Dirtiness
//! is a structural comparison of the live snapshot against the baseline, so
//! there are no hand-maintained flags to fall out of sync.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model selection: LLM and embedding provider/model, all required for a save.
/// Field names match the backend wire contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    #[serde(default)]
    pub llm_provider: String,
    #[serde(default)]
    pub llm_model: String,
    #[serde(default)]
    pub emb_provider: String,
    #[serde(default)]
    pub emb_model: String,
}

impl ModelSelection {
    /// True when all four fields are non-empty (valid to save).
    pub fn is_complete(&self) -> bool {
        !self.llm_provider.is_empty()
            && !self.llm_model.is_empty()
            && !self.emb_provider.is_empty()
            && !self.emb_model.is_empty()
    }
}

/// Knowledge base: system prompt and document names in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    pub system_prompt: String,
    pub documents: Vec<String>,
}

impl KnowledgeBase {
    pub fn new(system_prompt: impl Into<String>, documents: Vec<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            documents,
        }
    }

    /// Add a document name. A duplicate name replaces the old entry and moves
    /// to the back of the list (last add wins).
    pub fn add_document(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.documents.retain(|d| d != &name);
        self.documents.push(name);
    }

    /// Remove a document name; returns true if it was present.
    pub fn remove_document(&mut self, name: &str) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d != name);
        self.documents.len() != before
    }
}

/// Raw bytes of documents picked this session, keyed by name. Held only until
/// the next successful upload so memory stays bounded.
#[derive(Debug, Clone, Default)]
pub struct DocumentBlobs {
    contents: HashMap<String, Vec<u8>>,
}

impl DocumentBlobs {
    /// Store bytes for a name; a re-pick of the same name overwrites.
    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.contents.insert(name.into(), bytes);
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.contents.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.contents.get(name).map(|v| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn clear(&mut self) {
        self.contents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_selection_complete_requires_all_fields() {
        let mut sel = ModelSelection::default();
        assert!(!sel.is_complete());
        sel.llm_provider = "openai".to_string();
        sel.llm_model = "gpt-4o".to_string();
        sel.emb_provider = "openai".to_string();
        assert!(!sel.is_complete());
        sel.emb_model = "text-embedding-3-small".to_string();
        assert!(sel.is_complete());
    }

    #[test]
    fn add_document_keeps_upload_order() {
        let mut kb = KnowledgeBase::default();
        kb.add_document("a.txt");
        kb.add_document("b.pdf");
        kb.add_document("c.md");
        assert_eq!(kb.documents, vec!["a.txt", "b.pdf", "c.md"]);
    }

    #[test]
    fn add_document_duplicate_last_wins() {
        let mut kb = KnowledgeBase::default();
        kb.add_document("a.txt");
        kb.add_document("b.pdf");
        kb.add_document("a.txt");
        assert_eq!(kb.documents, vec!["b.pdf", "a.txt"]);
    }

    #[test]
    fn remove_document_reports_presence() {
        let mut kb = KnowledgeBase::new("", vec!["a.txt".to_string()]);
        assert!(kb.remove_document("a.txt"));
        assert!(!kb.remove_document("a.txt"));
        assert!(kb.documents.is_empty());
    }

    #[test]
    fn blobs_overwrite_on_same_name() {
        let mut blobs = DocumentBlobs::default();
        blobs.insert("a.txt", b"old".to_vec());
        blobs.insert("a.txt", b"new".to_vec());
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs.get("a.txt"), Some(b"new".as_slice()));
    }

    #[test]
    fn knowledge_equality_is_order_sensitive() {
        let a = KnowledgeBase::new("p", vec!["x".to_string(), "y".to_string()]);
        let b = KnowledgeBase::new("p", vec!["y".to_string(), "x".to_string()]);
        assert_ne!(a, b);
    }
}
