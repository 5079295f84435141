//! Agreement pattern counts
//!
//! A [`Tally`] holds how often each agreement pattern was observed over the
//! blocked pairs of two record collections. Only nonzero counts are kept.

use fsmatch_core::{BlockIndex, Error, Pattern, Record, RecordComparator, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Immutable sparse pattern counts, sorted by pattern index.
#[derive(Debug, Clone)]
pub struct Tally {
    comparator: Arc<RecordComparator>,
    indices: Vec<usize>,
    patterns: Vec<Pattern>,
    counts: Vec<u64>,
    total: u64,
}

impl Tally {
    /// Compact a sparse map of pattern index to count. Zero counts are dropped.
    pub fn from_counts(comparator: &Arc<RecordComparator>, counts: &BTreeMap<usize, u64>) -> Self {
        let mut indices = Vec::with_capacity(counts.len());
        let mut patterns = Vec::with_capacity(counts.len());
        let mut values = Vec::with_capacity(counts.len());
        let mut total = 0;

        for (&index, &count) in counts.iter().filter(|(_, &c)| c > 0) {
            indices.push(index);
            patterns.push(comparator.pattern_for(index));
            values.push(count);
            total += count;
        }

        Self {
            comparator: Arc::clone(comparator),
            indices,
            patterns,
            counts: values,
            total,
        }
    }

    pub fn comparator(&self) -> &Arc<RecordComparator> {
        &self.comparator
    }

    /// Number of distinct observed patterns.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Total number of observed pairs.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Count observed for a pattern index, 0 if never seen.
    pub fn count_of(&self, index: usize) -> u64 {
        self.indices
            .binary_search(&index)
            .map_or(0, |i| self.counts[i])
    }

    /// Iterate `(index, pattern, count)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Pattern, u64)> + '_ {
        self.indices
            .iter()
            .zip(&self.patterns)
            .zip(&self.counts)
            .map(|((&index, pattern), &count)| (index, pattern, count))
    }

    pub(crate) fn same_comparator(&self, other: &Tally) -> bool {
        Arc::ptr_eq(&self.comparator, &other.comparator)
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>24}{:>12}", "pattern", "count")?;
        for (_, pattern, count) in self.iter() {
            let levels: Vec<String> = pattern.iter().map(|l| l.to_string()).collect();
            writeln!(f, "{:>24}{:>12}", levels.join(" "), count)?;
        }
        write!(f, "{:>24}{:>12}", "total", self.total)
    }
}

/// Accumulates pattern counts one pair at a time.
#[derive(Debug, Clone)]
pub struct IncrementalTally {
    comparator: Arc<RecordComparator>,
    counts: BTreeMap<usize, u64>,
}

impl IncrementalTally {
    pub fn new(comparator: &Arc<RecordComparator>) -> Self {
        Self {
            comparator: Arc::clone(comparator),
            counts: BTreeMap::new(),
        }
    }

    /// Compare a pair and count its pattern. Returns the pattern index.
    pub fn add_pair(&mut self, a: &Record, b: &Record) -> Result<usize> {
        let index = self.comparator.compare_index(a, b)?;
        self.add_index(index);
        Ok(index)
    }

    /// Count an already computed pattern index.
    ///
    /// # Panics
    /// Panics if `index` is outside the comparator's pattern space.
    pub fn add_index(&mut self, index: usize) {
        assert!(
            index < self.comparator.n_patterns(),
            "pattern index {} out of range 0..{}",
            index,
            self.comparator.n_patterns()
        );
        *self.counts.entry(index).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Freeze the counts gathered so far. The accumulator stays usable.
    pub fn snapshot(&self) -> Tally {
        Tally::from_counts(&self.comparator, &self.counts)
    }
}

/// Count the agreement patterns of every blocked pair.
///
/// `left` is blocked; each record of `right` is compared against the
/// records of `left` sharing its blocking key, with the left record on side A.
pub fn tally(comparator: &Arc<RecordComparator>, left: &[Record], right: &[Record]) -> Result<Tally> {
    let block = BlockIndex::new(left);
    let mut counter = IncrementalTally::new(comparator);

    for r in right {
        for other in block.get(r.blocking_key()) {
            counter.add_pair(other, r)?;
        }
    }

    let tally = counter.snapshot();
    debug!(
        "Counted {} pairs in {} blocks, {} distinct patterns",
        tally.total(),
        block.n_blocks(),
        tally.len()
    );
    Ok(tally)
}

/// Count patterns separately for true matches and true non-matches, using
/// record ids as ground truth. Returns `(matches, nonmatches)`.
///
/// # Errors
/// Returns [`Error::MissingId`] unless every record's schema has an id field.
pub fn tally_truth(
    comparator: &Arc<RecordComparator>,
    left: &[Record],
    right: &[Record],
) -> Result<(Tally, Tally)> {
    if !left.iter().chain(right).all(|r| r.schema().has_id()) {
        return Err(Error::MissingId);
    }

    let block = BlockIndex::new(left);
    let mut matches = IncrementalTally::new(comparator);
    let mut nonmatches = IncrementalTally::new(comparator);

    for r in right {
        for other in block.get(r.blocking_key()) {
            if other.id() == r.id() {
                matches.add_pair(other, r)?;
            } else {
                nonmatches.add_pair(other, r)?;
            }
        }
    }

    let (matches, nonmatches) = (matches.snapshot(), nonmatches.snapshot());
    debug!(
        "Counted {} matching and {} non-matching pairs",
        matches.total(),
        nonmatches.total()
    );
    Ok((matches, nonmatches))
}
