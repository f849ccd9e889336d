//! In-process partitioned store
//!
//! Each collection is split into a fixed number of partitions by key hash.
//! Aggregators run per partition and their partials are merged, the same
//! two-phase shape a clustered store uses. Results come back in canonical
//! key order so repeated executions are comparable.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::observability::Logger;
use crate::result::Payload;

use super::aggregator::EntryAggregator;
use super::errors::{StoreError, StoreResult};
use super::extractor::ValueExtractor;
use super::filter::Filter;
use super::processor::{EntryProcessor, InvocableEntry};
use super::values::canonical;
use super::{Entry, NamedCollection, Session};

type Partition = BTreeMap<String, Entry>;

/// A collection held in process memory
#[derive(Debug)]
pub struct LocalCollection {
    name: String,
    partitions: Vec<RwLock<Partition>>,
    indexes: RwLock<BTreeMap<String, Arc<dyn ValueExtractor>>>,
}

impl LocalCollection {
    fn new(name: &str, partition_count: usize) -> Self {
        Self {
            name: name.to_string(),
            partitions: (0..partition_count.max(1))
                .map(|_| RwLock::new(Partition::new()))
                .collect(),
            indexes: RwLock::new(BTreeMap::new()),
        }
    }

    fn partition_of(&self, canonical_key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        canonical_key.hash(&mut hasher);
        (hasher.finish() % self.partitions.len() as u64) as usize
    }

    fn poisoned(&self) -> StoreError {
        StoreError::Poisoned(self.name.clone())
    }
}

fn sort_entries(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by_cached_key(|e| canonical(&e.key));
    entries
}

impl NamedCollection for LocalCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> StoreResult<usize> {
        let mut size = 0;
        for partition in &self.partitions {
            size += partition.read().map_err(|_| self.poisoned())?.len();
        }
        Ok(size)
    }

    fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn entries(&self, filter: &dyn Filter) -> StoreResult<Vec<Entry>> {
        let mut matched = Vec::new();
        for partition in &self.partitions {
            let guard = partition.read().map_err(|_| self.poisoned())?;
            matched.extend(
                guard
                    .values()
                    .filter(|e| filter.evaluate(&e.key, &e.value))
                    .cloned(),
            );
        }
        Ok(sort_entries(matched))
    }

    fn aggregate(
        &self,
        filter: &dyn Filter,
        aggregator: &dyn EntryAggregator,
    ) -> StoreResult<Payload> {
        let mut partials = Vec::with_capacity(self.partitions.len());
        for partition in &self.partitions {
            let matched: Vec<Entry> = {
                let guard = partition.read().map_err(|_| self.poisoned())?;
                guard
                    .values()
                    .filter(|e| filter.evaluate(&e.key, &e.value))
                    .cloned()
                    .collect()
            };
            partials.push(aggregator.accumulate(&matched)?);
        }
        aggregator.combine(partials)
    }

    fn invoke_all(
        &self,
        filter: &dyn Filter,
        processor: &dyn EntryProcessor,
    ) -> StoreResult<Vec<(Value, Value)>> {
        let mut results = Vec::new();
        for partition in &self.partitions {
            let mut guard = partition.write().map_err(|_| self.poisoned())?;
            let keys: Vec<String> = guard
                .iter()
                .filter(|(_, e)| filter.evaluate(&e.key, &e.value))
                .map(|(k, _)| k.clone())
                .collect();

            for canonical_key in keys {
                let Some(entry) = guard.remove(&canonical_key) else {
                    continue;
                };
                let mut invocable = InvocableEntry::new(entry.key.clone(), Some(entry.value));
                let outcome = processor.process(&mut invocable);
                let key = entry.key;
                if let Some(value) = invocable.into_value() {
                    guard.insert(canonical_key, Entry::new(key.clone(), value));
                }
                if let Some(result) = outcome? {
                    results.push((key, result));
                }
            }
        }
        results.sort_by_cached_key(|(k, _)| canonical(k));
        Ok(results)
    }

    fn put(&self, key: Value, value: Value) -> StoreResult<Option<Value>> {
        let canonical_key = canonical(&key);
        let partition = &self.partitions[self.partition_of(&canonical_key)];
        let mut guard = partition.write().map_err(|_| self.poisoned())?;
        Ok(guard
            .insert(canonical_key, Entry::new(key, value))
            .map(|old| old.value))
    }

    fn get(&self, key: &Value) -> StoreResult<Option<Value>> {
        let canonical_key = canonical(key);
        let partition = &self.partitions[self.partition_of(&canonical_key)];
        let guard = partition.read().map_err(|_| self.poisoned())?;
        Ok(guard.get(&canonical_key).map(|e| e.value.clone()))
    }

    fn truncate(&self) -> StoreResult<()> {
        for partition in &self.partitions {
            partition.write().map_err(|_| self.poisoned())?.clear();
        }
        Ok(())
    }

    fn add_index(&self, extractor: Arc<dyn ValueExtractor>) -> StoreResult<()> {
        let mut indexes = self.indexes.write().map_err(|_| self.poisoned())?;
        indexes.entry(extractor.describe()).or_insert(extractor);
        Ok(())
    }

    fn remove_index(&self, extractor: &dyn ValueExtractor) -> StoreResult<bool> {
        let mut indexes = self.indexes.write().map_err(|_| self.poisoned())?;
        Ok(indexes.remove(&extractor.describe()).is_some())
    }

    fn indexes(&self) -> StoreResult<Vec<String>> {
        let indexes = self.indexes.read().map_err(|_| self.poisoned())?;
        Ok(indexes.keys().cloned().collect())
    }
}

/// Session over in-process collections
#[derive(Debug)]
pub struct LocalSession {
    partition_count: usize,
    collections: RwLock<BTreeMap<String, Arc<LocalCollection>>>,
}

impl LocalSession {
    pub fn new(partition_count: usize) -> Self {
        Self {
            partition_count: partition_count.max(1),
            collections: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::new(7)
    }
}

impl Session for LocalSession {
    fn get_collection(&self, name: &str) -> StoreResult<Arc<dyn NamedCollection>> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Poisoned(name.to_string()))?;
        let collection = collections.entry(name.to_string()).or_insert_with(|| {
            Logger::trace("COLLECTION_CREATED", &[("collection", name)]);
            Arc::new(LocalCollection::new(name, self.partition_count))
        });
        let collection: Arc<dyn NamedCollection> = collection.clone();
        Ok(collection)
    }

    fn has_collection(&self, name: &str) -> bool {
        self.collections
            .read()
            .map(|c| c.contains_key(name))
            .unwrap_or(false)
    }

    fn destroy_collection(&self, name: &str) -> StoreResult<bool> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Poisoned(name.to_string()))?;
        Ok(collections.remove(name).is_some())
    }

    fn collection_names(&self) -> Vec<String> {
        self.collections
            .read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::aggregator::ReducerAggregator;
    use crate::store::filter::AlwaysFilter;
    use crate::store::processor::ConditionalRemoveProcessor;
    use serde_json::json;

    #[derive(Debug)]
    struct Field(&'static str);

    impl ValueExtractor for Field {
        fn extract(&self, _key: &Value, value: &Value) -> Value {
            value.get(self.0).cloned().unwrap_or(Value::Null)
        }

        fn describe(&self) -> String {
            self.0.to_string()
        }
    }

    #[derive(Debug)]
    struct AgeOver(i64);

    impl Filter for AgeOver {
        fn evaluate(&self, _key: &Value, value: &Value) -> bool {
            value.get("age").and_then(Value::as_i64).map_or(false, |a| a > self.0)
        }

        fn describe(&self) -> String {
            format!("age > {}", self.0)
        }
    }

    fn people() -> Arc<dyn NamedCollection> {
        let session = LocalSession::new(3);
        let people = session.get_collection("people").unwrap();
        for (id, age) in [(1, 15), (2, 25), (3, 35), (4, 45)] {
            people.put(json!(id), json!({"age": age})).unwrap();
        }
        people
    }

    #[test]
    fn test_put_returns_previous() {
        let session = LocalSession::default();
        let c = session.get_collection("c").unwrap();
        assert_eq!(c.put(json!("k"), json!(1)).unwrap(), None);
        assert_eq!(c.put(json!("k"), json!(2)).unwrap(), Some(json!(1)));
        assert_eq!(c.get(&json!("k")).unwrap(), Some(json!(2)));
        assert_eq!(c.size().unwrap(), 1);
    }

    #[test]
    fn test_entries_are_key_ordered() {
        let people = people();
        let keys: Vec<Value> = people
            .entries(&AgeOver(20))
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec![json!(2), json!(3), json!(4)]);
    }

    #[test]
    fn test_aggregate_across_partitions() {
        let people = people();
        let payload = people
            .aggregate(&AgeOver(30), &ReducerAggregator::new(vec![Arc::new(Field("age"))]))
            .unwrap();
        assert_eq!(
            payload,
            Payload::Keyed(vec![(json!(3), json!(35)), (json!(4), json!(45))])
        );
    }

    #[test]
    fn test_invoke_all_removes() {
        let people = people();
        let removed = people
            .invoke_all(&AgeOver(40), &ConditionalRemoveProcessor::new(Arc::new(AlwaysFilter)))
            .unwrap();
        assert_eq!(removed, vec![(json!(4), json!({"age": 45}))]);
        assert_eq!(people.size().unwrap(), 3);
    }

    #[test]
    fn test_indexes_are_idempotent() {
        let people = people();
        people.add_index(Arc::new(Field("age"))).unwrap();
        people.add_index(Arc::new(Field("age"))).unwrap();
        assert_eq!(people.indexes().unwrap(), vec!["age".to_string()]);
        assert!(people.remove_index(&Field("age")).unwrap());
        assert!(!people.remove_index(&Field("age")).unwrap());
    }

    #[test]
    fn test_destroy_missing_is_noop() {
        let session = LocalSession::default();
        session.get_collection("x").unwrap();
        assert!(session.destroy_collection("x").unwrap());
        assert!(!session.destroy_collection("x").unwrap());
        assert!(!session.has_collection("x"));
    }
}
