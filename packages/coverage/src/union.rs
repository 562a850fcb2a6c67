//! Batched polygon unions.

use geo::{BooleanOps, MultiPolygon, Polygon};

/// Unions the given polygons in bounded batches: each chunk of `batch_size`
/// polygons is unioned first, then the chunk results are unioned together.
/// This bounds the size of intermediate geometries as the facility count
/// grows into the hundreds, instead of growing one accumulator across the
/// whole set.
///
/// An empty input yields an empty multipolygon.
#[must_use]
pub fn batched_union(polygons: &[Polygon<f64>], batch_size: usize) -> MultiPolygon<f64> {
    let batch_size = batch_size.max(1);

    let batches: Vec<MultiPolygon<f64>> = polygons
        .chunks(batch_size)
        .map(|chunk| {
            let mut acc = MultiPolygon::<f64>::new(vec![]);
            for polygon in chunk {
                acc = acc.union(&MultiPolygon::new(vec![polygon.clone()]));
            }
            acc
        })
        .collect();

    let mut merged = MultiPolygon::<f64>::new(vec![]);
    for batch in &batches {
        merged = merged.union(batch);
    }
    merged
}
