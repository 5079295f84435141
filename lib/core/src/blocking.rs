//! Blocking index
//!
//! Records are only compared when they share a blocking key. The index maps
//! each key to the records of one collection carrying it.

use crate::Record;
use ahash::AHashMap;

/// Groups borrowed records by blocking key.
#[derive(Debug, Default)]
pub struct BlockIndex<'a> {
    blocks: AHashMap<&'a str, Vec<&'a Record>>,
    n_records: usize,
}

impl<'a> BlockIndex<'a> {
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut index = Self::default();
        for record in records {
            index.insert(record);
        }
        index
    }

    pub fn insert(&mut self, record: &'a Record) {
        self.blocks.entry(record.blocking_key()).or_default().push(record);
        self.n_records += 1;
    }

    /// Records sharing `key`, in insertion order. Empty if none do.
    pub fn get(&self, key: &str) -> &[&'a Record] {
        self.blocks.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn n_records(&self) -> usize {
        self.n_records
    }

    pub fn is_empty(&self) -> bool {
        self.n_records == 0
    }

    /// Number of pairs `right` would produce against this index.
    pub fn n_pairs<'b, I>(&self, right: I) -> usize
    where
        I: IntoIterator<Item = &'b Record>,
    {
        right.into_iter().map(|r| self.get(r.blocking_key()).len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordSchema;

    #[test]
    fn test_grouping() {
        let schema = RecordSchema::new(&["zip", "name"], &["zip"], None, None).unwrap();
        let records: Vec<Record> = [("1", "a"), ("2", "b"), ("1", "c"), ("3", "d")]
            .iter()
            .map(|(zip, name)| schema.new_record(&[*zip, *name]).unwrap())
            .collect();

        let index = BlockIndex::new(&records);
        assert_eq!(index.n_blocks(), 3);
        assert_eq!(index.n_records(), 4);

        let names: Vec<&str> = index.get("1").iter().map(|r| r.field(0).as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(index.get("9").is_empty());

        let probe = vec![
            schema.new_record(&["1", "x"]).unwrap(),
            schema.new_record(&["9", "y"]).unwrap(),
            schema.new_record(&["2", "z"]).unwrap(),
        ];
        assert_eq!(index.n_pairs(&probe), 3);
    }

    #[test]
    fn test_empty_index() {
        let index = BlockIndex::new(std::iter::empty());
        assert!(index.is_empty());
        assert_eq!(index.n_blocks(), 0);
    }
}
