// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Nearest-neighbour index over normalized embeddings.

use parlance_core::ParlanceError;

/// Inner product of two vectors; for L2-normalized inputs this is their
/// cosine similarity. Vectors of different length compare as 0.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// A similarity index addressed by insertion position.
///
/// Positions are dense: the n-th vector added since the last
/// [`VectorIndex::reset`] has position n.
pub trait VectorIndex: Send + Sync {
    /// Append a vector, returning its position.
    fn add(&mut self, vector: &[f32]) -> Result<usize, ParlanceError>;

    /// Up to `k` `(position, similarity)` pairs, most similar first.
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;

    /// Remove every vector.
    fn reset(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exhaustive inner-product search over a contiguous buffer.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, vector: &[f32]) -> Result<usize, ParlanceError> {
        if vector.len() != self.dimensions {
            return Err(ParlanceError::Embedding {
                message: format!(
                    "vector has {} dimensions, index expects {}",
                    vector.len(),
                    self.dimensions
                ),
                source: None,
            });
        }
        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if query.len() != self.dimensions || self.dimensions == 0 || k == 0 {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimensions)
            .map(|row| inner_product(row, query))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }

    fn reset(&mut self) {
        self.data.clear();
    }

    fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_product_of_orthogonal_and_opposite() {
        assert_eq!(inner_product(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(inner_product(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
        assert_eq!(inner_product(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn search_orders_by_similarity() {
        let mut index = FlatIndex::new(2);
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.6, 0.8]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        let hits = index.search(&[0.0, 1.0], 2);
        assert_eq!(hits[0].0, 2);
        assert_eq!(hits[1].0, 1);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let mut index = FlatIndex::new(3);
        assert!(index.add(&[1.0, 0.0]).is_err());
        assert!(index.search(&[1.0], 1).is_empty());
    }

    #[test]
    fn reset_empties_the_index() {
        let mut index = FlatIndex::new(2);
        assert_eq!(index.add(&[1.0, 0.0]).unwrap(), 0);
        assert_eq!(index.add(&[0.0, 1.0]).unwrap(), 1);
        index.reset();
        assert!(index.is_empty());
        assert_eq!(index.add(&[0.0, 1.0]).unwrap(), 0);
    }
}
