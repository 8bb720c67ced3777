//! Weighted bucket interleaving: orders a job's pending candidates for review.
//!
//! Not a sort: every bucket is interleaved with every other, but each tier up
//! is twice as likely to supply the next card as the tier below it.
//!
//! Algorithm:
//! 1. Keep only candidates that are pending and belong to the job.
//! 2. Partition by bucket and shuffle each partition independently.
//! 3. Fill a draw pool with each non-empty bucket's label `draw_weight` times.
//! 4. Draw a label uniformly, emit the next id from that bucket's shuffled list.
//!    When a bucket runs dry, every copy of its label leaves the pool.
//! 5. Anything left once the pool is empty is appended in shuffled order.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::models::candidate::{Bucket, Candidate};

/// Relative draw weight of a bucket. Each tier doubles the one below.
pub const fn draw_weight(bucket: Bucket) -> usize {
    match bucket {
        Bucket::Top => 16,
        Bucket::Strong => 8,
        Bucket::Average => 4,
        Bucket::Weak => 2,
        Bucket::Poor => 1,
    }
}

/// Produces the visiting order for `job_id`'s pending candidates.
///
/// The result is always a permutation of exactly the filtered input set.
pub fn rank_pending<'a, I, R>(candidates: I, job_id: Uuid, rng: &mut R) -> Vec<Uuid>
where
    I: IntoIterator<Item = &'a Candidate>,
    R: Rng,
{
    let mut partitions: BTreeMap<Bucket, Vec<Uuid>> = BTreeMap::new();
    for candidate in candidates {
        if candidate.is_pending_for(job_id) {
            partitions
                .entry(candidate.bucket())
                .or_default()
                .push(candidate.id);
        }
    }

    for ids in partitions.values_mut() {
        // Canonical starting order so a seeded rng reproduces the same ranking
        // no matter how the caller iterated its collection.
        ids.sort_unstable();
        ids.shuffle(rng);
    }

    interleave(partitions, rng)
}

fn interleave<R: Rng>(partitions: BTreeMap<Bucket, Vec<Uuid>>, rng: &mut R) -> Vec<Uuid> {
    let total: usize = partitions.values().map(Vec::len).sum();
    let mut order = Vec::with_capacity(total);

    let mut pool: Vec<Bucket> = partitions
        .iter()
        .filter(|(_, ids)| !ids.is_empty())
        .flat_map(|(bucket, _)| std::iter::repeat(*bucket).take(draw_weight(*bucket)))
        .collect();

    let mut cursors: BTreeMap<Bucket, std::vec::IntoIter<Uuid>> = partitions
        .into_iter()
        .map(|(bucket, ids)| (bucket, ids.into_iter()))
        .collect();

    while !pool.is_empty() {
        let bucket = pool[rng.gen_range(0..pool.len())];
        let Some(cursor) = cursors.get_mut(&bucket) else {
            pool.retain(|b| *b != bucket);
            continue;
        };

        match cursor.next() {
            Some(id) => {
                order.push(id);
                if cursor.len() == 0 {
                    pool.retain(|b| *b != bucket);
                }
            }
            None => pool.retain(|b| *b != bucket),
        }
    }

    // Unreachable while the pool bookkeeping holds; keeps the output a full
    // permutation if it ever drifts.
    for (_, rest) in cursors {
        order.extend(rest);
    }

    order
}
