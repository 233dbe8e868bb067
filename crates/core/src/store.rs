use crate::models::DocumentIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One processed record per indexed path. Iteration order is by path, which
/// also serves as the stable tie-break for ranking.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentStore {
    documents: BTreeMap<String, DocumentIndex>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any entry with the same path wholesale.
    pub fn insert(&mut self, document: DocumentIndex) -> Option<DocumentIndex> {
        self.documents.insert(document.file_path.clone(), document)
    }

    pub fn get(&self, path: &str) -> Option<&DocumentIndex> {
        self.documents.get(path)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentIndex> {
        self.documents.values()
    }

    pub fn paths(&self) -> Vec<String> {
        self.documents.keys().cloned().collect()
    }

    /// Entries from `other` overwrite entries with the same path.
    pub fn merge(&mut self, other: DocumentStore) {
        self.documents.extend(other.documents);
    }

    pub fn documents_containing(&self, term: &str) -> usize {
        self.iter()
            .filter(|document| document.processed_doc.unique_terms.contains(term))
            .count()
    }
}

impl FromIterator<DocumentIndex> for DocumentStore {
    fn from_iter<I: IntoIterator<Item = DocumentIndex>>(iter: I) -> Self {
        let mut store = Self::new();
        for document in iter {
            store.insert(document);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessedDocument;

    fn document(path: &str, content: &str, terms: &[&str]) -> DocumentIndex {
        DocumentIndex {
            file_path: path.to_string(),
            title: path.to_string(),
            page_count: 1,
            content: content.to_string(),
            processed_doc: ProcessedDocument::from_tokens(
                content,
                terms.iter().map(|term| term.to_string()).collect(),
            ),
        }
    }

    #[test]
    fn insert_replaces_existing_path() {
        let mut store = DocumentStore::new();
        store.insert(document("a.pdf", "old", &["old"]));
        let previous = store.insert(document("a.pdf", "new", &["new"]));

        assert_eq!(previous.map(|doc| doc.content), Some("old".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.pdf").map(|doc| doc.content.as_str()), Some("new"));
    }

    #[test]
    fn merge_overwrites_and_extends() {
        let mut base: DocumentStore = vec![
            document("a.pdf", "a", &["alpha"]),
            document("b.pdf", "b", &["beta"]),
        ]
        .into_iter()
        .collect();
        let update: DocumentStore = vec![
            document("b.pdf", "b2", &["beta"]),
            document("c.pdf", "c", &["gamma", "beta"]),
        ]
        .into_iter()
        .collect();

        base.merge(update);

        assert_eq!(base.paths(), vec!["a.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(base.get("b.pdf").map(|doc| doc.content.as_str()), Some("b2"));
        assert_eq!(base.documents_containing("beta"), 2);
        assert_eq!(base.documents_containing("delta"), 0);
    }
}
