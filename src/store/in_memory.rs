//! In-memory document store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{DocumentKey, DocumentStore, Error};

/// Keeps documents in a map, keyed by their path
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryStore {
    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl DocumentStore for InMemoryStore {
    fn get(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>, Error> {
        Ok(self.documents.read().get(&key.path()).cloned())
    }

    fn put(&self, key: &DocumentKey, document: serde_json::Value) -> Result<(), Error> {
        self.documents.write().insert(key.path(), document);
        Ok(())
    }

    fn exists(&self, key: &DocumentKey) -> Result<bool, Error> {
        Ok(self.documents.read().contains_key(&key.path()))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_put_replaces_whole_document() {
        let store = InMemoryStore::default();
        let key = DocumentKey::Quiz { host: "Teacher1".to_owned() };

        assert!(!store.exists(&key).unwrap());
        store.put(&key, json!({"a": 1, "b": 2})).unwrap();
        store.put(&key, json!({"a": 3})).unwrap();

        assert!(store.exists(&key).unwrap());
        assert_eq!(store.get(&key).unwrap(), Some(json!({"a": 3})));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_hosts_with_same_slug_share_documents() {
        let store = InMemoryStore::default();
        store
            .put(&DocumentKey::Scores { host: "Ms Lan".to_owned() }, json!(1))
            .unwrap();
        assert!(
            store
                .exists(&DocumentKey::Scores { host: "ms-lan".to_owned() })
                .unwrap()
        );
    }
}
