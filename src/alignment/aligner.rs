//! Frame offset alignment
//!
//! A window of length `L` is cut from a backing sequence so that column `f` at aligned position
//! `t` reads raw index `start + reference + offset(f) + t`. The reference is `-min_offset`, which
//! puts the most negative offset at raw index `start`. A window therefore needs
//! `L + (max_offset - min_offset)` frames of backing data.
//!
//! Batch mode slices a recorded episode at a chosen start. Streaming mode reads the most recent
//! frames of a [`SlidingWindowBuffer`] and zero-fills on the left while history is short.

use std::collections::BTreeMap;

use rand::Rng;

use crate::errors::AlignError;
use crate::state::FeatureTable;

use super::buffer::SlidingWindowBuffer;
use super::offsets::FeatureOffsetSpec;

/// Column-oriented frame data the aligner can read from.
pub trait FrameSeries {
    fn len(&self) -> usize;

    fn feature_names(&self) -> Vec<String>;

    fn value(&self, feature: &str, index: usize) -> Option<f32>;
}

impl FrameSeries for FeatureTable {
    fn len(&self) -> usize {
        FeatureTable::len(self)
    }

    fn feature_names(&self) -> Vec<String> {
        self.names().map(str::to_string).collect()
    }

    fn value(&self, feature: &str, index: usize) -> Option<f32> {
        self.column(feature)?.get(index).copied()
    }
}

impl FrameSeries for SlidingWindowBuffer {
    fn len(&self) -> usize {
        SlidingWindowBuffer::len(self)
    }

    fn feature_names(&self) -> Vec<String> {
        self.names().map(str::to_string).collect()
    }

    fn value(&self, feature: &str, index: usize) -> Option<f32> {
        self.get(feature, index)
    }
}

/// Equal-length aligned columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedWindow {
    len: usize,
    columns: BTreeMap<String, Vec<f32>>,
}

impl AlignedWindow {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column(&self, name: &str) -> Option<&[f32]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Where a batch window starts within a recorded episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStart {
    /// Uniform over every start that leaves enough frames.
    Random,
    /// For deterministic replay and debugging.
    Fixed(usize),
}

#[derive(Debug, Clone)]
pub struct FrameOffsetAligner {
    offsets: FeatureOffsetSpec,
    output_len: usize,
}

impl FrameOffsetAligner {
    pub fn new(offsets: FeatureOffsetSpec, output_len: usize) -> Self {
        Self {
            offsets,
            output_len,
        }
    }

    pub fn offsets(&self) -> &FeatureOffsetSpec {
        &self.offsets
    }

    pub fn output_len(&self) -> usize {
        self.output_len
    }

    /// Backing frames needed for one window.
    pub fn required_len(&self) -> usize {
        self.offsets.required_len(self.output_len)
    }

    /// Batch mode: cut the window starting at raw index `start`.
    pub fn align<S: FrameSeries + ?Sized>(
        &self,
        series: &S,
        start: usize,
    ) -> Result<AlignedWindow, AlignError> {
        let required = start + self.required_len();
        if series.len() < required {
            return Err(AlignError::InsufficientHistory {
                required,
                available: series.len(),
            });
        }

        Ok(self.collect(series, |raw| Some(start + raw)))
    }

    /// Streaming mode: align against the newest frames, zero-filling missing history on the left.
    pub fn align_streaming<S: FrameSeries + ?Sized>(&self, series: &S) -> AlignedWindow {
        let required = self.required_len();
        let available = series.len();

        if available >= required {
            let start = available - required;
            self.collect(series, |raw| Some(start + raw))
        } else {
            let padding = required - available;
            self.collect(series, |raw| raw.checked_sub(padding))
        }
    }

    /// Pick a batch start index for an episode of `episode_len` frames.
    pub fn sample_start<R: Rng + ?Sized>(
        &self,
        episode_len: usize,
        start: SampleStart,
        rng: &mut R,
    ) -> Result<usize, AlignError> {
        let required = self.required_len();
        let Some(last_start) = episode_len.checked_sub(required) else {
            return Err(AlignError::InsufficientHistory {
                required,
                available: episode_len,
            });
        };

        match start {
            SampleStart::Random => Ok(rng.random_range(0..=last_start)),
            SampleStart::Fixed(index) if index <= last_start => Ok(index),
            SampleStart::Fixed(index) => Err(AlignError::InsufficientHistory {
                required: index + required,
                available: episode_len,
            }),
        }
    }

    /// `to_series` maps a window-relative raw index to a series index, `None` meaning padding.
    fn collect<S, F>(&self, series: &S, to_series: F) -> AlignedWindow
    where
        S: FrameSeries + ?Sized,
        F: Fn(usize) -> Option<usize>,
    {
        let reference = self.offsets.reference() as i64;
        let mut columns = BTreeMap::new();

        for name in series.feature_names() {
            let base = reference + i64::from(self.offsets.offset(&name));
            let values = (0..self.output_len)
                .map(|t| {
                    let raw = (base + t as i64) as usize;
                    to_series(raw)
                        .and_then(|index| series.value(&name, index))
                        .unwrap_or(0.0)
                })
                .collect();
            columns.insert(name, values);
        }

        AlignedWindow {
            len: self.output_len,
            columns,
        }
    }
}
