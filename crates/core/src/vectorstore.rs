use std::cmp::Ordering;
use storage::faiss::{FlatVectors, Metric};

/// Exhaustive similarity ranking over every indexed row.
pub trait VectorIndex: Send + Sync {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    /// Metric the stored vectors were built for.
    fn metric(&self) -> Metric {
        Metric::InnerProduct
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rows as `(row, score)`, best first. Equal scores keep row order.
    fn search(&self, query: &[f32]) -> Vec<(usize, f32)>;
}

/// In-memory cosine index. Rows are L2-normalized on construction, so the
/// inner product with a normalized query is the cosine similarity.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    rows: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize, rows: Vec<Vec<f32>>) -> anyhow::Result<Self> {
        let mut rows = rows;
        for (i, row) in rows.iter_mut().enumerate() {
            anyhow::ensure!(
                row.len() == dimension,
                "row {} has dimension {}, expected {}",
                i,
                row.len(),
                dimension
            );
            normalize_l2(row);
        }
        Ok(Self {
            dimension,
            metric: Metric::InnerProduct,
            rows,
        })
    }

    pub fn from_flat(vectors: &FlatVectors) -> anyhow::Result<Self> {
        let rows = vectors.rows().map(<[f32]>::to_vec).collect();
        let mut index = Self::new(vectors.dimension, rows)?;
        index.metric = vectors.metric;
        Ok(index)
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn search(&self, query: &[f32]) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i, dot(row, query)))
            .collect();
        scored.sort_by(|a, b| descending(a.1, b.1));
        scored
    }
}

/// Scales `v` to unit length in place. A zero vector is left as is.
pub fn normalize_l2(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Orders scores high to low; NaN sorts last. `Vec::sort_by` is stable, so
/// equal scores keep their incoming order.
pub fn descending(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
