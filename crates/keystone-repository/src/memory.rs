//! In-process document store.

use crate::driver::{ensure_id, merge_patch};
use crate::{Criteria, Document, DocumentDriver, ID_FIELD};
use async_trait::async_trait;
use keystone_config::StoreKind;
use keystone_core::{KeystoneError, KeystoneResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Document store held in a map of collections. Used for local runs and tests.
#[derive(Debug, Default)]
pub struct MemoryDocumentDriver {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    /// Positions of matching documents, ordered and paged.
    fn select(documents: &[Document], criteria: &Criteria) -> Vec<usize> {
        let mut positions: Vec<usize> = documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| criteria.matches(doc))
            .map(|(i, _)| i)
            .collect();

        if !criteria.order.is_empty() {
            positions.sort_by(|&a, &b| criteria.compare(&documents[a], &documents[b]));
        }

        let offset = usize::try_from(criteria.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = criteria
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        positions.into_iter().skip(offset).take(limit).collect()
    }

    fn update(&self, collection: &str, criteria: &Criteria, patch: &Document, single: bool) -> KeystoneResult<u64> {
        criteria.validate()?;
        let mut collections = self.collections.write();
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut positions = Self::select(documents, criteria);
        if single {
            positions.truncate(1);
        }
        for &position in &positions {
            merge_patch(&mut documents[position], patch);
        }
        Ok(positions.len() as u64)
    }
}

fn duplicate_id(collection: &str, id: &str) -> KeystoneError {
    KeystoneError::Database(format!(
        "Duplicate {} '{}' in collection '{}'",
        ID_FIELD, id, collection
    ))
}

fn has_id(documents: &[Document], id: &str) -> bool {
    documents
        .iter()
        .any(|doc| doc.get(ID_FIELD).and_then(|v| v.as_str()) == Some(id))
}

#[async_trait]
impl DocumentDriver for MemoryDocumentDriver {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    async fn find_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Option<Document>> {
        criteria.validate()?;
        let collections = self.collections.read();
        let Some(documents) = collections.get(collection) else {
            return Ok(None);
        };
        Ok(Self::select(documents, criteria)
            .first()
            .map(|&i| documents[i].clone()))
    }

    async fn find_all(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Vec<Document>> {
        criteria.validate()?;
        let collections = self.collections.read();
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(Self::select(documents, criteria)
            .into_iter()
            .map(|i| documents[i].clone())
            .collect())
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> KeystoneResult<Document> {
        let id = ensure_id(&mut document);

        let mut collections = self.collections.write();
        let documents = collections.entry(collection.to_string()).or_default();
        if has_id(documents, &id) {
            return Err(duplicate_id(collection, &id));
        }
        documents.push(document.clone());

        debug!("Inserted document '{}' into '{}'", id, collection);
        Ok(document)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> KeystoneResult<Vec<Document>> {
        let mut prepared = Vec::with_capacity(documents.len());
        let mut ids = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = ensure_id(&mut document);
            if ids.contains(&id) {
                return Err(duplicate_id(collection, &id));
            }
            ids.push(id);
            prepared.push(document);
        }

        let mut collections = self.collections.write();
        let existing = collections.entry(collection.to_string()).or_default();
        if let Some(id) = ids.iter().find(|id| has_id(existing, id)) {
            return Err(duplicate_id(collection, id));
        }
        existing.extend(prepared.iter().cloned());

        debug!("Inserted {} documents into '{}'", prepared.len(), collection);
        Ok(prepared)
    }

    async fn update_one(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64> {
        self.update(collection, criteria, &patch, true)
    }

    async fn update_many(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64> {
        self.update(collection, criteria, &patch, false)
    }

    async fn delete_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<u64> {
        criteria.validate()?;
        let mut collections = self.collections.write();
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        match Self::select(documents, criteria).first() {
            Some(&position) => {
                documents.remove(position);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn ping(&self) -> KeystoneResult<()> {
        Ok(())
    }
}
