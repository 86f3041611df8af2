//! Brute-force nearest-neighbor index over squared Euclidean distance.
//!
//! Append-only: vectors can be added in batches but never removed or
//! reordered, so a vector's position is a stable identity. Exact search by
//! full scan; suitable for corpora that fit in memory.


use serde::{Deserialize, Serialize};

use crate::{QaError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    /// Row-major vector storage, `dim` floats per row.
    data: Vec<f32>,
}

impl FlatIndex {
    #[inline]
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(QaError::Index(
                "Index dimension must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            dim,
            data: Vec::new(),
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of vectors held.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a batch of vectors in order.
    ///
    /// All rows are validated before any is stored, so a dimension mismatch
    /// leaves the index unchanged.
    #[inline]
    pub fn add_batch(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            if vector.len() != self.dim {
                return Err(QaError::Index(format!(
                    "Vector dimension mismatch: expected {}, got {}",
                    self.dim,
                    vector.len()
                )));
            }
        }

        self.data.reserve(vectors.len() * self.dim);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }

        Ok(())
    }

    /// Top-k nearest positions by ascending squared-L2 distance.
    /// Returns fewer than k pairs when the index holds fewer vectors.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dim {
            return Err(QaError::Index(format!(
                "Query dimension mismatch: expected {}, got {}",
                self.dim,
                query.len()
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, row)| (position, squared_l2(query, row)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
