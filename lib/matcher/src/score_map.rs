//! Score-ordered match results

use crate::sink::MatchSink;
use fsmatch_core::{Record, RecordComparator, Result};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// A scored record pair. `a` comes from the blocked (left) collection.
#[derive(Debug, Clone, Copy)]
pub struct MatchRecord<'a> {
    pub a: &'a Record,
    pub b: &'a Record,
    pub score: f64,
}

impl<'a> MatchRecord<'a> {
    pub fn new(a: &'a Record, b: &'a Record, score: f64) -> Self {
        Self { a, b, score }
    }
}

/// One score bucket.
pub type Bucket<'m, 'a> = (f64, &'m [MatchRecord<'a>]);

/// Buckets immediately around a score.
#[derive(Debug, Default)]
pub struct Neighbourhood<'m, 'a> {
    /// The lowest bucket strictly above the score.
    pub above: Option<Bucket<'m, 'a>>,
    /// The bucket at exactly the score.
    pub at: Option<Bucket<'m, 'a>>,
    /// The highest bucket strictly below the score.
    pub below: Option<Bucket<'m, 'a>>,
}

impl<'m, 'a> Neighbourhood<'m, 'a> {
    /// Pairs of all three buckets, highest score first.
    pub fn records(&self) -> impl Iterator<Item = &'m MatchRecord<'a>> + '_ {
        [self.above, self.at, self.below]
            .into_iter()
            .flatten()
            .flat_map(|(_, records)| records.iter())
    }
}

fn bucket<'m, 'a>((score, records): (&'m OrderedFloat<f64>, &'m Vec<MatchRecord<'a>>)) -> Bucket<'m, 'a> {
    (score.0, records.as_slice())
}

/// Match results bucketed by score, iterable in ascending score order.
/// Order within a bucket is unspecified.
#[derive(Debug, Clone)]
pub struct ScoreMap<'a> {
    comparator: Arc<RecordComparator>,
    buckets: BTreeMap<OrderedFloat<f64>, Vec<MatchRecord<'a>>>,
    n_pairs: usize,
}

impl<'a> ScoreMap<'a> {
    pub fn new(comparator: &Arc<RecordComparator>) -> Self {
        Self {
            comparator: Arc::clone(comparator),
            buckets: BTreeMap::new(),
            n_pairs: 0,
        }
    }

    pub fn insert(&mut self, record: MatchRecord<'a>) {
        self.buckets.entry(OrderedFloat(record.score)).or_default().push(record);
        self.n_pairs += 1;
    }

    /// Move every pair of `other` into this map.
    pub fn merge(&mut self, other: ScoreMap<'a>) {
        if other.n_pairs > self.n_pairs && self.buckets.is_empty() {
            self.buckets = other.buckets;
            self.n_pairs = other.n_pairs;
            return;
        }
        for (score, mut records) in other.buckets {
            self.n_pairs += records.len();
            self.buckets.entry(score).or_default().append(&mut records);
        }
    }

    pub fn comparator(&self) -> &Arc<RecordComparator> {
        &self.comparator
    }

    /// Total number of scored pairs.
    pub fn len(&self) -> usize {
        self.n_pairs
    }

    pub fn is_empty(&self) -> bool {
        self.n_pairs == 0
    }

    /// Number of distinct scores.
    pub fn n_scores(&self) -> usize {
        self.buckets.len()
    }

    pub fn min_score(&self) -> Option<f64> {
        self.buckets.keys().next().map(|k| k.0)
    }

    pub fn max_score(&self) -> Option<f64> {
        self.buckets.keys().next_back().map(|k| k.0)
    }

    /// Buckets in ascending score order.
    pub fn buckets(&self) -> impl DoubleEndedIterator<Item = Bucket<'_, 'a>> + '_ {
        self.buckets.iter().map(bucket)
    }

    /// All pairs in ascending score order.
    pub fn iter(&self) -> impl Iterator<Item = &MatchRecord<'a>> + '_ {
        self.buckets.values().flatten()
    }

    /// Buckets with `score >= cutoff`, ascending.
    pub fn at_least(&self, cutoff: f64) -> impl DoubleEndedIterator<Item = Bucket<'_, 'a>> + '_ {
        self.buckets
            .range(OrderedFloat(cutoff)..)
            .map(bucket)
    }

    /// Buckets with `lo <= score < hi`, ascending. Empty if `lo >= hi`.
    pub fn range(&self, lo: f64, hi: f64) -> Box<dyn DoubleEndedIterator<Item = Bucket<'_, 'a>> + '_> {
        if OrderedFloat(lo) >= OrderedFloat(hi) {
            return Box::new(std::iter::empty());
        }
        Box::new(
            self.buckets
                .range(OrderedFloat(lo)..OrderedFloat(hi))
                .map(bucket),
        )
    }

    /// Buckets with `score < lo` or `score >= hi`, ascending.
    pub fn tails(&self, lo: f64, hi: f64) -> impl Iterator<Item = Bucket<'_, 'a>> + '_ {
        let (lo, hi) = (OrderedFloat(lo), OrderedFloat(hi));
        let upper_start = lo.max(hi);
        self.buckets
            .range(..lo)
            .chain(self.buckets.range(upper_start..))
            .map(bucket)
    }

    /// Number of pairs with `score >= cutoff`.
    pub fn count_at_least(&self, cutoff: f64) -> usize {
        self.at_least(cutoff).map(|(_, records)| records.len()).sum()
    }

    /// The nearest-rank `q`-quantile of the scores of all pairs: the
    /// `max(1, ceil(q * n))`-th smallest score. `None` for an empty map or
    /// `q` outside `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.is_empty() || !(0.0..=1.0).contains(&q) {
            return None;
        }

        let rank = ((q * self.n_pairs as f64).ceil() as usize).clamp(1, self.n_pairs);
        let mut seen = 0;
        for (score, records) in self.buckets() {
            seen += records.len();
            if seen >= rank {
                return Some(score);
            }
        }
        self.max_score()
    }

    /// Buckets immediately above, at and below `score`.
    pub fn browse(&self, score: f64) -> Neighbourhood<'_, 'a> {
        let key = OrderedFloat(score);

        Neighbourhood {
            above: self
                .buckets
                .range((Bound::Excluded(key), Bound::Unbounded))
                .next()
                .map(bucket),
            at: self.buckets.get_key_value(&key).map(bucket),
            below: self.buckets.range(..key).next_back().map(bucket),
        }
    }

    /// Send pairs with `score >= cutoff` to `sink`, highest score first.
    /// Returns the number of pairs written.
    pub fn write_matches<S: MatchSink + ?Sized>(&self, sink: &mut S, cutoff: f64) -> Result<usize> {
        sink.begin(&self.comparator.field_names())?;

        let mut written = 0;
        for (score, records) in self.at_least(cutoff).rev() {
            for record in records {
                sink.accept(record.a, record.b, score)?;
                written += 1;
            }
        }

        sink.finish()?;
        Ok(written)
    }
}
