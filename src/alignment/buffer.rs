use std::collections::{BTreeMap, VecDeque};

use crate::state::FeatureRow;

/// Most recent `capacity` frames, one queue per feature column.
///
/// Every column always holds `len` values. A column first seen mid-stream is backfilled with
/// zeros; a column missing from a pushed row gets a zero for that frame.
#[derive(Debug, Clone)]
pub struct SlidingWindowBuffer {
    capacity: usize,
    len: usize,
    columns: BTreeMap<String, VecDeque<f32>>,
}

impl SlidingWindowBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            len: 0,
            columns: BTreeMap::new(),
        }
    }

    /// Append the newest frame, evicting the oldest once full.
    pub fn push(&mut self, row: &FeatureRow) {
        for name in row.keys() {
            if !self.columns.contains_key(name) {
                self.columns
                    .insert(name.clone(), VecDeque::from(vec![0.0; self.len]));
            }
        }

        let full = self.len == self.capacity;
        for (name, column) in self.columns.iter_mut() {
            if full {
                column.pop_front();
            }
            column.push_back(row.get(name).copied().unwrap_or(0.0));
        }
        if !full {
            self.len += 1;
        }
    }

    /// Overwrite values of the newest frame. Columns not yet in the buffer are ignored.
    pub fn amend_newest(&mut self, values: &FeatureRow) {
        for (name, &value) in values {
            if let Some(slot) = self.columns.get_mut(name).and_then(VecDeque::back_mut) {
                *slot = value;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    pub fn get(&self, feature: &str, index: usize) -> Option<f32> {
        self.columns.get(feature)?.get(index).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[(&str, f32)]) -> FeatureRow {
        values
            .iter()
            .map(|&(name, value)| (name.to_string(), value))
            .collect()
    }

    #[test]
    fn test_push_evicts_oldest_frame() {
        let mut buffer = SlidingWindowBuffer::new(3);
        for i in 0..5 {
            buffer.push(&row(&[("frame", i as f32)]));
        }
        assert!(buffer.is_full());
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.get("frame", 0), Some(2.0));
        assert_eq!(buffer.get("frame", 2), Some(4.0));
        assert_eq!(buffer.get("frame", 3), None);
    }

    #[test]
    fn test_columns_stay_equal_length() {
        let mut buffer = SlidingWindowBuffer::new(4);
        buffer.push(&row(&[("a", 1.0)]));
        buffer.push(&row(&[("a", 2.0), ("b", 5.0)]));
        buffer.push(&row(&[("b", 6.0)]));

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.get("b", 0), Some(0.0));
        assert_eq!(buffer.get("b", 2), Some(6.0));
        assert_eq!(buffer.get("a", 2), Some(0.0));
        assert_eq!(buffer.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_amend_touches_only_the_newest_frame() {
        let mut buffer = SlidingWindowBuffer::new(3);
        buffer.amend_newest(&row(&[("a", 9.0)]));
        assert!(buffer.is_empty());

        buffer.push(&row(&[("a", 1.0), ("b", 1.0)]));
        buffer.push(&row(&[("a", 2.0), ("b", 2.0)]));
        buffer.amend_newest(&row(&[("a", 7.0), ("c", 7.0)]));

        assert_eq!(buffer.get("a", 0), Some(1.0));
        assert_eq!(buffer.get("a", 1), Some(7.0));
        assert_eq!(buffer.get("b", 1), Some(2.0));
        assert_eq!(buffer.get("c", 1), None);
    }
}
