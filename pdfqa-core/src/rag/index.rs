//! In-memory exact nearest-neighbor index.
//!
//! Vectors live in one contiguous row-major buffer and every search scans all
//! of them. One document yields tens to hundreds of chunks, so the O(N·D) scan
//! is cheaper than maintaining any approximate structure.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("Index has not been built")]
    NotBuilt,

    #[error("Vector dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// One search hit: position of the stored vector and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    /// Squared Euclidean distance. Lower is more similar.
    pub distance: f32,
}

impl Neighbor {
    /// Cosine similarity derived from the squared distance.
    ///
    /// Only meaningful when both vectors are unit length, where
    /// `cos = 1 - d²/2`. Higher is more similar, within `[-1, 1]`.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance / 2.0
    }
}

/// Flat (brute-force) L2 index over vectors of one fixed dimension.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
    count: usize,
    built: bool,
}

impl FlatIndex {
    /// Creates an empty, unbuilt index for vectors of `dimension` floats.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
            count: 0,
            built: false,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Replaces the contents of the index with `vectors`.
    ///
    /// Every row must match the index dimension. On error the previous
    /// contents are left untouched.
    pub fn build(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.data = vectors.concat();
        self.count = vectors.len();
        self.built = true;
        Ok(())
    }

    /// Returns the `k` stored vectors closest to `query`, ascending by
    /// distance. Equal distances are ordered by lower index first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if !self.built {
            return Err(IndexError::NotBuilt);
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.count == 0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .rows()
            .enumerate()
            .map(|(index, row)| Neighbor {
                index,
                distance: squared_l2(query, row),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.dimension.max(1)).take(self.count)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
