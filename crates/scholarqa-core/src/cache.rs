//! Session-lifetime cache of retrieved papers, keyed by provider identifier.

use std::collections::HashMap;

use crate::paper::PaperRecord;

const DEFAULT_CAPACITY: usize = 256;

/// Bounded identifier-keyed store populated as a side effect of search.
///
/// Inserting an identifier that is already present overwrites the record
/// (last write wins) without moving its slot. Inserting a new identifier at
/// capacity evicts the oldest inserted one. Records without an identifier
/// are never cached.
#[derive(Debug)]
pub struct PaperCache {
    papers: HashMap<String, PaperRecord>,
    order: Vec<String>,
    capacity: usize,
}

impl Default for PaperCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl PaperCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            papers: HashMap::new(),
            order: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert a record under its identifier. A record without an identifier
    /// is dropped silently.
    pub fn insert(&mut self, paper: PaperRecord) {
        let Some(id) = paper.id.clone() else {
            return;
        };
        if self.papers.insert(id.clone(), paper).is_none() {
            if self.order.len() == self.capacity {
                let oldest = self.order.remove(0);
                self.papers.remove(&oldest);
            }
            self.order.push(id);
        }
    }

    /// Look up a previously retrieved paper by identifier.
    pub fn get(&self, id: &str) -> Option<&PaperRecord> {
        self.papers.get(id)
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
