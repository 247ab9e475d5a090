//! Error types for the slideshow core library.

/// Top-level error enum for the slideshow core.
#[derive(Debug, thiserror::Error)]
pub enum SlideshowError {
    /// The selection index is empty: nothing passes the current filter.
    ///
    /// Fatal until the configuration or the photo source changes.  Carries
    /// the active filter description and the index size so the caller can
    /// render an explanation instead of terminating silently.
    #[error("no eligible photos (filter: {filter}, index size: {index_size})")]
    NoEligiblePhotos { filter: String, index_size: usize },

    /// Every candidate is excluded by the recency/year constraints even
    /// after relaxation.  Transient: the pool recovers as the window rolls.
    #[error("selection pool exhausted after relaxation (index size: {index_size})")]
    PoolExhausted { index_size: usize },

    /// `previous()` was called at the start of history.
    #[error("no earlier entry in history")]
    NoHistory,

    /// The download signal or the photo source could not be read during a
    /// refresh check.  Recovered by skipping the tick and retrying on the
    /// next interval; never propagated into the display path.
    #[error("refresh check failed: {0}")]
    RefreshIo(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SlideshowResult<T> = Result<T, SlideshowError>;
