use crossbeam_channel::Sender;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::PairwiseError;
use crate::levenshtein::{try_levenshtein_distance, Granularity};

pub const DEFAULT_BATCH_SIZE: usize = 1 << 16;

/// Settings for an all-pairs run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairwiseConfig {
    pub granularity: Granularity,
    /// Records longer than this many bytes are skipped, never truncated.
    pub max_len: Option<usize>,
    /// Maximum rows per [`DistanceBatch`] sent by [`stream_pairwise`].
    pub batch_size: usize,
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        PairwiseConfig {
            granularity: Granularity::Bytes,
            max_len: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairDistance {
    pub left: u32,
    pub right: u32,
    pub distance: u64,
}

/// Column-oriented rows, ready to become an Arrow record batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DistanceBatch {
    pub left: Vec<u32>,
    pub right: Vec<u32>,
    pub distance: Vec<u64>,
}

impl DistanceBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        DistanceBatch {
            left: Vec::with_capacity(capacity),
            right: Vec::with_capacity(capacity),
            distance: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, pair: PairDistance) {
        self.left.push(pair.left);
        self.right.push(pair.right);
        self.distance.push(pair.distance);
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = PairDistance> + '_ {
        self.left
            .iter()
            .zip(&self.right)
            .zip(&self.distance)
            .map(|((&left, &right), &distance)| PairDistance { left, right, distance })
    }
}

/// Distances for every unordered pair of eligible records, ordered by
/// `(left, right)`.
pub fn pairwise_distances<R>(
    records: &[R],
    config: &PairwiseConfig,
) -> Result<Vec<PairDistance>, PairwiseError>
where
    R: AsRef<[u8]> + Sync,
{
    let eligible = eligible_indices(records, config.max_len)?;
    match config.granularity {
        Granularity::Bytes => collect_pairs(&byte_units(records, &eligible)),
        Granularity::Chars => {
            let decoded = char_units(records, &eligible)?;
            collect_pairs(&borrow_units(&decoded))
        }
    }
}

/// Computes the same pairs as [`pairwise_distances`] but hands them to
/// `sender` in batches of at most `config.batch_size` rows. Batches arrive
/// in no particular order. Returns the number of pairs computed.
pub fn stream_pairwise<R>(
    records: &[R],
    config: &PairwiseConfig,
    sender: &Sender<DistanceBatch>,
) -> Result<usize, PairwiseError>
where
    R: AsRef<[u8]> + Sync,
{
    let eligible = eligible_indices(records, config.max_len)?;
    let batch_size = config.batch_size.max(1);
    tracing::debug!(records = eligible.len(), batch_size, "streaming pairwise distances");

    match config.granularity {
        Granularity::Bytes => stream_pairs(&byte_units(records, &eligible), batch_size, sender)?,
        Granularity::Chars => {
            let decoded = char_units(records, &eligible)?;
            stream_pairs(&borrow_units(&decoded), batch_size, sender)?
        }
    }

    let n = eligible.len();
    Ok(n * n.saturating_sub(1) / 2)
}

fn collect_pairs<T>(units: &[(u32, &[T])]) -> Result<Vec<PairDistance>, PairwiseError>
where
    T: PartialEq + Sync,
{
    let rows = units
        .par_iter()
        .enumerate()
        .map(|(pos, left)| {
            units[pos + 1..]
                .iter()
                .map(|right| compare(left, right))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().flatten().collect())
}

fn stream_pairs<T>(
    units: &[(u32, &[T])],
    batch_size: usize,
    sender: &Sender<DistanceBatch>,
) -> Result<(), PairwiseError>
where
    T: PartialEq + Sync,
{
    units
        .par_iter()
        .enumerate()
        .try_for_each(|(pos, left)| -> Result<(), PairwiseError> {
            let partners = &units[pos + 1..];
            let mut batch = DistanceBatch::with_capacity(batch_size.min(partners.len()));

            for right in partners {
                batch.add(compare(left, right)?);
                if batch.len() >= batch_size {
                    let full = std::mem::replace(&mut batch, DistanceBatch::with_capacity(batch_size));
                    sender.send(full).map_err(|_| PairwiseError::Disconnected)?;
                }
            }

            if !batch.is_empty() {
                sender.send(batch).map_err(|_| PairwiseError::Disconnected)?;
            }
            Ok(())
        })
}

fn eligible_indices<R: AsRef<[u8]>>(
    records: &[R],
    max_len: Option<usize>,
) -> Result<Vec<u32>, PairwiseError> {
    if u32::try_from(records.len()).is_err() {
        return Err(PairwiseError::TooManyRecords(records.len()));
    }

    let mut eligible = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let len = record.as_ref().len();
        match max_len {
            Some(cap) if len > cap => {
                tracing::debug!(record = idx, len, cap, "skipping record over length cap");
            }
            _ => eligible.push(idx as u32),
        }
    }
    Ok(eligible)
}

fn byte_units<'a, R: AsRef<[u8]>>(records: &'a [R], eligible: &[u32]) -> Vec<(u32, &'a [u8])> {
    eligible.iter().map(|&idx| (idx, records[idx as usize].as_ref())).collect()
}

// Each record is validated and decoded once, not once per pair.
fn char_units<R>(records: &[R], eligible: &[u32]) -> Result<Vec<(u32, Vec<char>)>, PairwiseError>
where
    R: AsRef<[u8]> + Sync,
{
    eligible
        .par_iter()
        .map(|&idx| -> Result<(u32, Vec<char>), PairwiseError> {
            let text = std::str::from_utf8(records[idx as usize].as_ref()).map_err(|e| {
                PairwiseError::InvalidRecord { record: idx, valid_up_to: e.valid_up_to() }
            })?;
            Ok((idx, text.chars().collect()))
        })
        .collect()
}

fn borrow_units(decoded: &[(u32, Vec<char>)]) -> Vec<(u32, &[char])> {
    decoded.iter().map(|(idx, chars)| (*idx, chars.as_slice())).collect()
}

fn compare<T: PartialEq>(
    &(left, a): &(u32, &[T]),
    &(right, b): &(u32, &[T]),
) -> Result<PairDistance, PairwiseError> {
    let distance = try_levenshtein_distance(a, b)
        .map_err(|source| PairwiseError::Distance { left, right, source })?;
    Ok(PairDistance { left, right, distance: distance as u64 })
}
