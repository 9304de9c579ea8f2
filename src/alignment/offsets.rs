use std::collections::BTreeMap;

/// Signed frame offset per feature column. Columns without an entry read the current frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureOffsetSpec {
    offsets: BTreeMap<String, i32>,
}

impl FeatureOffsetSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, feature: impl Into<String>, offset: i32) -> Self {
        self.insert(feature, offset);
        self
    }

    pub fn insert(&mut self, feature: impl Into<String>, offset: i32) {
        self.offsets.insert(feature.into(), offset);
    }

    pub fn offset(&self, feature: &str) -> i32 {
        self.offsets.get(feature).copied().unwrap_or(0)
    }

    /// Most negative offset, never above zero since unlisted columns sit at zero.
    pub fn min_offset(&self) -> i32 {
        self.offsets.values().copied().fold(0, i32::min)
    }

    pub fn max_offset(&self) -> i32 {
        self.offsets.values().copied().fold(0, i32::max)
    }

    pub fn span(&self) -> usize {
        (self.max_offset() - self.min_offset()) as usize
    }

    /// Raw index read at aligned position 0 by a column with offset 0.
    pub fn reference(&self) -> usize {
        (-self.min_offset()) as usize
    }

    /// Frames needed to produce a window of `output_len`.
    pub fn required_len(&self, output_len: usize) -> usize {
        output_len + self.span()
    }

    /// Observations answered without the policy at the start of live play, so every window it
    /// sees has real data at each offset.
    pub fn warmup_frames(&self) -> usize {
        self.reference()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.offsets.iter().map(|(name, &offset)| (name.as_str(), offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_spec_needs_no_history() {
        let spec = FeatureOffsetSpec::new();
        assert_eq!(spec.span(), 0);
        assert_eq!(spec.reference(), 0);
        assert_eq!(spec.required_len(256), 256);
        assert_eq!(spec.offset("p1_percent"), 0);
    }

    #[test]
    fn test_span_includes_implicit_zero() {
        let spec = FeatureOffsetSpec::new()
            .with("p1_button_a", -1)
            .with("p1_main_stick_x", -3);
        assert_eq!(spec.min_offset(), -3);
        assert_eq!(spec.max_offset(), 0);
        assert_eq!(spec.span(), 3);
        assert_eq!(spec.reference(), 3);
        assert_eq!(spec.warmup_frames(), 3);

        let future = FeatureOffsetSpec::new().with("p1_action", 2);
        assert_eq!(future.min_offset(), 0);
        assert_eq!(future.span(), 2);
        assert_eq!(future.required_len(10), 12);
    }
}
