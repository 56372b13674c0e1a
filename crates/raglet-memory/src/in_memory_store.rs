use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::vector_store::{BoxFuture, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredPoint {
    pub(crate) id: String,
    pub(crate) vector: Vec<f32>,
    pub(crate) payload: HashMap<String, serde_json::Value>,
}

/// Points of one collection in first-insertion order.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct PointSet {
    pub(crate) vector_size: u64,
    pub(crate) points: Vec<StoredPoint>,
}

impl PointSet {
    pub(crate) fn new(vector_size: u64) -> Self {
        Self {
            vector_size,
            points: Vec::new(),
        }
    }

    /// Validate the whole batch, then insert or overwrite by id.
    ///
    /// An overwritten point keeps its original position.
    pub(crate) fn upsert(&mut self, points: Vec<VectorPoint>) -> Result<(), VectorStoreError> {
        if let Some(bad) = points
            .iter()
            .find(|p| p.vector.len() as u64 != self.vector_size)
        {
            return Err(VectorStoreError::Upsert(format!(
                "point {} has dimension {}, collection expects {}",
                bad.id,
                bad.vector.len(),
                self.vector_size
            )));
        }

        let mut positions: HashMap<String, usize> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();

        for p in points {
            let stored = StoredPoint {
                id: p.id,
                vector: p.vector,
                payload: p.payload,
            };
            if let Some(&pos) = positions.get(&stored.id) {
                self.points[pos] = stored;
            } else {
                positions.insert(stored.id.clone(), self.points.len());
                self.points.push(stored);
            }
        }
        Ok(())
    }

    pub(crate) fn search(&self, vector: &[f32], limit: u64) -> Vec<ScoredVectorPoint> {
        let mut scored: Vec<ScoredVectorPoint> = self
            .points
            .iter()
            .map(|sp| ScoredVectorPoint {
                id: sp.id.clone(),
                score: cosine_similarity(vector, &sp.vector),
                payload: sp.payload.clone(),
            })
            .collect();

        // stable: ties stay in insertion order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        scored
    }
}

pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, PointSet>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore").finish_non_exhaustive()
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            cols.entry(collection)
                .or_insert_with(|| PointSet::new(vector_size));
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(cols.contains_key(&collection))
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            cols.remove(&collection);
            Ok(())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            let col = cols.get_mut(&collection).ok_or_else(|| {
                VectorStoreError::Upsert(format!("collection {collection} not found"))
            })?;
            col.upsert(points)
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            let col = cols.get(&collection).ok_or_else(|| {
                VectorStoreError::Search(format!("collection {collection} not found"))
            })?;
            Ok(col.search(&vector, limit))
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<usize, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(cols.get(&collection).map_or(0, |c| c.points.len()))
        })
    }
}
