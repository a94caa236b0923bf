//! Straightforward initial partitioners.

use rand::Rng;

use crate::error::Result;
use crate::model::{ModelSet, Partition};

/// Puts every vertex in the same part.
pub fn all_in_one_part(models: &ModelSet, part_count: usize, part: usize) -> Result<Partition> {
    Partition::uniform(models.vertex_count(), part_count, part)
}

/// Gives a random part to every vertex.
pub fn random_part<R: Rng>(
    models: &ModelSet,
    part_count: usize,
    rng: &mut R,
) -> Result<Partition> {
    let parts = (0..models.vertex_count())
        .map(|_| rng.gen_range(0..part_count))
        .collect();
    Partition::from_parts(Some(part_count), parts)
}
