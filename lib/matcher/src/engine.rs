//! Matching engines
//!
//! Every record of the right collection is scored against the records of
//! the blocked left collection sharing its key. The parallel engine bisects
//! the right collection until a slice is below the work threshold, scores
//! leaves into their own [`ScoreMap`] and merges maps as `rayon::join`
//! returns.

use crate::score_map::{MatchRecord, ScoreMap};
use fsmatch_core::{BlockIndex, Error, Record, Result};
use fsmatch_model::MixtureModel;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default number of right-side records below which a task runs sequentially.
pub const WORK_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub work_threshold: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            work_threshold: WORK_THRESHOLD,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.work_threshold < 2 {
            return Err(Error::InvalidConfig(format!(
                "work_threshold must be at least 2, got {}",
                self.work_threshold
            )));
        }
        Ok(())
    }
}

/// What a matching run did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchStats {
    pub comparisons: usize,
    pub distinct_scores: usize,
    pub elapsed: Duration,
}

impl MatchStats {
    fn log(&self) {
        info!(
            "Performed {} comparisons in {:.2?} ({} distinct scores)",
            self.comparisons, self.elapsed, self.distinct_scores
        );
    }
}

/// Scores blocked pairs with a fitted model.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'m> {
    model: &'m MixtureModel,
    config: MatchConfig,
}

impl<'m> Matcher<'m> {
    pub fn new(model: &'m MixtureModel, config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Score every blocked pair on rayon's pool.
    pub fn match_parallel<'a>(&self, block: &BlockIndex<'a>, right: &'a [Record]) -> Result<(ScoreMap<'a>, MatchStats)> {
        let start = Instant::now();
        let map = self.split(block, right)?;
        let stats = self.finish(&map, start);
        Ok((map, stats))
    }

    /// Score every blocked pair on the calling thread.
    pub fn match_sequential<'a>(&self, block: &BlockIndex<'a>, right: &'a [Record]) -> Result<(ScoreMap<'a>, MatchStats)> {
        let start = Instant::now();
        let map = self.leaf(block, right)?;
        let stats = self.finish(&map, start);
        Ok((map, stats))
    }

    fn finish(&self, map: &ScoreMap<'_>, start: Instant) -> MatchStats {
        let stats = MatchStats {
            comparisons: map.len(),
            distinct_scores: map.n_scores(),
            elapsed: start.elapsed(),
        };
        stats.log();
        stats
    }

    fn split<'a>(&self, block: &BlockIndex<'a>, right: &'a [Record]) -> Result<ScoreMap<'a>> {
        if right.len() < self.config.work_threshold {
            return self.leaf(block, right);
        }

        let (lo, hi) = right.split_at(right.len() / 2);
        let (lo, hi) = rayon::join(|| self.split(block, lo), || self.split(block, hi));

        let mut map = lo?;
        map.merge(hi?);
        Ok(map)
    }

    fn leaf<'a>(&self, block: &BlockIndex<'a>, right: &'a [Record]) -> Result<ScoreMap<'a>> {
        let mut map = ScoreMap::new(self.model.comparator());

        for r in right {
            for &other in block.get(r.blocking_key()) {
                let score = self.model.match_score(other, r)?;
                map.insert(MatchRecord::new(other, r, score));
            }
        }

        debug!("Scored {} records into {} pairs", right.len(), map.len());
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsmatch_core::{FieldComparator, RecordComparator, RecordSchema};
    use std::sync::Arc;

    fn model(schema: &Arc<RecordSchema>) -> MixtureModel {
        let cmp = RecordComparator::builder(schema, schema)
            .compare("name", FieldComparator::exact())
            .unwrap()
            .handle_blanks(false)
            .build()
            .unwrap();
        MixtureModel::new(&cmp, vec![vec![vec![0.1, 0.9]], vec![vec![0.9, 0.1]]], 1).unwrap()
    }

    fn people(schema: &Arc<RecordSchema>, n: usize, keys: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                schema
                    .new_record(&[format!("{}", i % keys), format!("name{}", i % 7)])
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(MatchConfig::default().work_threshold, 1000);
        assert!(MatchConfig { work_threshold: 1 }.validate().is_err());
        assert!(MatchConfig { work_threshold: 2 }.validate().is_ok());
    }

    #[test]
    fn test_parallel_agrees_with_sequential() {
        let schema = RecordSchema::new(&["zip", "name"], &["zip"], None, None).unwrap();
        let model = model(&schema);
        let left = people(&schema, 40, 5);
        let right = people(&schema, 57, 6);
        let block = BlockIndex::new(&left);

        let matcher = Matcher::new(&model, MatchConfig { work_threshold: 2 }).unwrap();
        let (parallel, stats) = matcher.match_parallel(&block, &right).unwrap();
        let (sequential, _) = matcher.match_sequential(&block, &right).unwrap();

        assert_eq!(parallel.len(), block.n_pairs(&right));
        assert_eq!(stats.comparisons, parallel.len());
        assert_eq!(parallel.len(), sequential.len());

        let a: Vec<(f64, usize)> = parallel.buckets().map(|(s, r)| (s, r.len())).collect();
        let b: Vec<(f64, usize)> = sequential.buckets().map(|(s, r)| (s, r.len())).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scores_agreeing_pairs_higher() {
        let schema = RecordSchema::new(&["zip", "name"], &["zip"], None, None).unwrap();
        let model = model(&schema);
        let left = vec![
            schema.new_record(&["1", "ann"]).unwrap(),
            schema.new_record(&["1", "bob"]).unwrap(),
        ];
        let right = vec![schema.new_record(&["1", "ann"]).unwrap()];
        let block = BlockIndex::new(&left);

        let matcher = Matcher::new(&model, MatchConfig::default()).unwrap();
        let (map, _) = matcher.match_parallel(&block, &right).unwrap();

        assert_eq!(map.len(), 2);
        let best = map.buckets().next_back().unwrap().1;
        assert_eq!(best[0].a.field(0).as_str(), "ann");
        assert_eq!(best[0].b.field(0).as_str(), "ann");
    }

    #[test]
    fn test_leaf_errors_abort_the_run() {
        let schema = RecordSchema::new(&["zip", "age"], &["zip"], None, None).unwrap();
        let cmp = RecordComparator::builder(&schema, &schema)
            .compare("age", FieldComparator::standard_prorated())
            .unwrap()
            .build()
            .unwrap();
        let uniform = vec![0.2; 5];
        let model = MixtureModel::new(&cmp, vec![vec![uniform.clone()], vec![uniform]], 1).unwrap();

        let mut right: Vec<Record> = (0..20)
            .map(|i| schema.new_record(&["1".to_string(), format!("{}", 30 + i)]).unwrap())
            .collect();
        right.push(schema.new_record(&["1", "unknown"]).unwrap());
        let left = vec![schema.new_record(&["1", "33"]).unwrap()];
        let block = BlockIndex::new(&left);

        let matcher = Matcher::new(&model, MatchConfig { work_threshold: 4 }).unwrap();
        assert!(matches!(
            matcher.match_parallel(&block, &right),
            Err(Error::NotNumeric { .. })
        ));
    }
}
