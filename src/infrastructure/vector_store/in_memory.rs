use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::{EmbeddingVector, IndexedEntry, Result, RetrievalError, SearchResult};

#[derive(Default)]
struct Slots {
    positions: HashMap<String, usize>,
    entries: Vec<Arc<IndexedEntry>>,
}

/// Key → entry map behind one lock.
///
/// Entries keep the slot of the first insert of their key; replacing a key
/// swaps the entry in place. Slot order is the tie-break for equal scores.
pub struct EntryIndex {
    slots: RwLock<Slots>,
}

impl EntryIndex {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
        }
    }

    pub fn upsert(&self, entry: IndexedEntry) -> Result<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|e| RetrievalError::internal(e.to_string()))?;

        let entry = Arc::new(entry);
        match slots.positions.get(&entry.key).copied() {
            Some(position) => slots.entries[position] = entry,
            None => {
                let position = slots.entries.len();
                slots.positions.insert(entry.key.clone(), position);
                slots.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Live entries in slot order, detached from the lock.
    pub fn snapshot(&self) -> Result<Vec<Arc<IndexedEntry>>> {
        let slots = self
            .slots
            .read()
            .map_err(|e| RetrievalError::internal(e.to_string()))?;
        Ok(slots.entries.clone())
    }

    pub fn get(&self, key: &str) -> Option<IndexedEntry> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .positions
            .get(key)
            .map(|&position| slots.entries[position].as_ref().clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.entries.iter().map(|e| e.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn search(&self, query: &EmbeddingVector, limit: usize) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let snapshot = self.snapshot()?;
        Ok(rank(&snapshot, query, limit))
    }
}

impl Default for EntryIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Exhaustive cosine scan. Sorting is stable, so equal scores keep
/// snapshot order.
pub fn rank(entries: &[Arc<IndexedEntry>], query: &EmbeddingVector, limit: usize) -> Vec<SearchResult> {
    let mut scored: Vec<(f32, &IndexedEntry)> = entries
        .iter()
        .map(|entry| (query.cosine_similarity(&entry.vector), entry.as_ref()))
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(similarity, entry)| SearchResult {
            key: entry.key.clone(),
            similarity,
            content: entry.content.clone(),
        })
        .collect()
}
