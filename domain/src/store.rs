use crate::todos::Model;
use crate::Id;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct Records {
    next_id: Id,
    items: BTreeMap<Id, Model>,
}

/// In-memory todo storage. Ids start at 1 and are never reused.
///
/// Every read hands out a copy, so callers can never alias stored records.
#[derive(Debug)]
pub struct Store {
    records: RwLock<Records>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Records {
                next_id: 1,
                items: BTreeMap::new(),
            }),
        }
    }

    /// Stores the model under a freshly assigned id and returns the stored copy.
    pub async fn insert(&self, mut model: Model) -> Model {
        let mut records = self.records.write().await;
        model.id = records.next_id;
        records.next_id += 1;
        records.items.insert(model.id, model.clone());
        model
    }

    pub async fn get(&self, id: Id) -> Option<Model> {
        self.records.read().await.items.get(&id).cloned()
    }

    /// Overwrites an existing record. Returns `None` when there is nothing to replace.
    pub async fn replace(&self, model: Model) -> Option<Model> {
        let mut records = self.records.write().await;
        let slot = records.items.get_mut(&model.id)?;
        *slot = model.clone();
        Some(model)
    }

    pub async fn remove(&self, id: Id) -> Option<Model> {
        self.records.write().await.items.remove(&id)
    }

    /// All records in id order.
    pub async fn all(&self) -> Vec<Model> {
        self.records.read().await.items.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = Store::new();

        let first = store.insert(Model::new("a")).await;
        let second = store.insert(Model::new("b")).await;

        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_remove() {
        let store = Store::new();
        let first = store.insert(Model::new("a")).await;

        store.remove(first.id).await;
        let second = store.insert(Model::new("b")).await;

        assert_eq!(second.id, 2);
        assert!(store.get(first.id).await.is_none());
    }

    #[tokio::test]
    async fn test_replace_requires_an_existing_record() {
        let store = Store::new();
        let mut missing = Model::new("ghost");
        missing.id = 42;

        assert!(store.replace(missing).await.is_none());
        assert!(store.is_empty().await);
    }
}
