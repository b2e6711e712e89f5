mod change_detector;
mod feed_transformer;

pub use change_detector::{ChangeDetector, ChangeVerdict};
pub use feed_transformer::{FeedTransform, FeedTransformer, TransformOutcome};
