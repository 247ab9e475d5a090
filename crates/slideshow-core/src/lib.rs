//! Slideshow core library — selection engine for a filtered photo slideshow.
//!
//! This crate owns everything between the photo library binding and the
//! display surface: metadata filtering, the in-memory selection index,
//! anti-repetition random sampling, portrait pairing, navigation history,
//! and the background cache refresh driven by a download signal file.
//! Rendering and the library binding itself stay outside; they plug in
//! through the `PhotoSource` and `ChangeSignal` traits.

pub mod config;
pub mod controller;
pub mod errors;
pub mod filter;
pub mod history;
pub mod models;
pub mod refresh;
pub mod selection;

pub use config::{FilterCriteria, FilterLogic, SlideshowConfig};
pub use controller::SlideshowController;
pub use errors::{SlideshowError, SlideshowResult};
pub use history::HistoryNavigator;
pub use models::{
    DownloadSignal, GeoCoordinate, HistoryEntry, MediaKind, Orientation, PhotoId, PhotoRecord,
    SlideEntry,
};
pub use refresh::{ChangeSignal, PhotoSource, RefreshHandle, RefreshOutcome, SignalFile};
pub use selection::{AntiRepetitionSampler, RecencyWindow, SelectionIndex, YearBudget};
