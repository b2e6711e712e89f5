use super::FeedId;

/// Decompressed bytes of one feed, alive for a single fetch/transform cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedContent {
    feed: FeedId,
    bytes: Vec<u8>,
}

impl FeedContent {
    pub fn new(feed: FeedId, bytes: Vec<u8>) -> Self {
        Self { feed, bytes }
    }

    pub fn feed(&self) -> FeedId {
        self.feed
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
