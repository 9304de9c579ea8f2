mod aligner;
mod buffer;
mod offsets;
mod sample;

pub use aligner::{AlignedWindow, FrameOffsetAligner, FrameSeries, SampleStart};
pub use buffer::SlidingWindowBuffer;
pub use offsets::FeatureOffsetSpec;
pub use sample::{SampleBuilder, TrainingSample};
