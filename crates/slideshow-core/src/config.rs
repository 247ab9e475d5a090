//! Slideshow configuration: filter criteria plus the selection/refresh knobs.
//!
//! Loaded once at startup, validated, and passed explicitly into each
//! component.  Nothing here is mutated at runtime; a criteria change goes
//! through `SlideshowController::apply_criteria`, which rebuilds the core.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{SlideshowError, SlideshowResult};

// ---------------------------------------------------------------------------
// Filter criteria
// ---------------------------------------------------------------------------

/// Combinator for a filter category and for the overall combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterLogic {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Default for FilterLogic {
    fn default() -> Self {
        FilterLogic::Or
    }
}

/// Closed set of typed filter categories with explicit combinators.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// People name fragments; matched case-insensitively against labels.
    pub people_names: Vec<String>,
    pub people_logic: FilterLogic,
    /// Minimum number of people labels required when the people test gates.
    pub min_people_count: usize,
    /// Place substrings matched against the photo's place label.
    pub places: Vec<String>,
    pub places_logic: FilterLogic,
    /// Keyword fragments matched against the photo's keywords.
    pub keywords: Vec<String>,
    /// Joins the three category results (vacuous categories do not gate).
    pub overall_logic: FilterLogic,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            people_names: Vec::new(),
            people_logic: FilterLogic::Or,
            min_people_count: 1,
            places: Vec::new(),
            places_logic: FilterLogic::Or,
            keywords: Vec::new(),
            overall_logic: FilterLogic::Or,
        }
    }
}

impl FilterCriteria {
    /// True when no category is configured: every still photo is accepted.
    pub fn is_empty(&self) -> bool {
        self.people_names.is_empty() && self.places.is_empty() && self.keywords.is_empty()
    }

    /// Human-readable summary, used in error context and log events.
    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "unfiltered".to_string();
        }
        let mut parts = Vec::new();
        if !self.people_names.is_empty() {
            parts.push(format!(
                "people {:?} ({:?}, min {})",
                self.people_names, self.people_logic, self.min_people_count
            ));
        }
        if !self.places.is_empty() {
            parts.push(format!("places {:?} ({:?})", self.places, self.places_logic));
        }
        if !self.keywords.is_empty() {
            parts.push(format!("keywords {:?}", self.keywords));
        }
        format!("{} [{:?}]", parts.join(", "), self.overall_logic)
    }
}

// ---------------------------------------------------------------------------
// SlideshowConfig
// ---------------------------------------------------------------------------

/// Full configuration for the selection core.
///
/// Serde defaults mirror the shipped defaults of the original configuration
/// file, so a partial JSON document yields a working setup.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideshowConfig {
    pub filter: FilterCriteria,
    /// Size of the recency window forbidding immediate repeats.
    pub max_recent_photos: usize,
    /// Ceiling fraction of total draws any single capture year may take.
    pub max_year_percentage: f64,
    /// Capacity of the navigation history buffer.
    pub photo_history_cache_size: usize,
    /// Seconds between background checks of the download signal.
    pub cache_refresh_check_interval: u64,
    /// Hard cap on the selection index; extension past it is a logged no-op.
    pub max_photos_limit: usize,
    /// Show two portrait photos side by side when a partner is available.
    pub portrait_pairing: bool,
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            filter: FilterCriteria {
                overall_logic: FilterLogic::And,
                ..FilterCriteria::default()
            },
            max_recent_photos: 50,
            max_year_percentage: 0.3,
            photo_history_cache_size: 100,
            cache_refresh_check_interval: 3600,
            max_photos_limit: 500,
            portrait_pairing: true,
        }
    }
}

impl SlideshowConfig {
    /// Validate value ranges.  Returns the first violation found.
    pub fn validate(&self) -> SlideshowResult<()> {
        if self.max_recent_photos == 0 {
            return Err(SlideshowError::Config(
                "max_recent_photos must be positive".into(),
            ));
        }
        if !(self.max_year_percentage > 0.0 && self.max_year_percentage <= 1.0) {
            return Err(SlideshowError::Config(format!(
                "max_year_percentage must be in (0, 1], got {}",
                self.max_year_percentage
            )));
        }
        if self.photo_history_cache_size == 0 {
            return Err(SlideshowError::Config(
                "photo_history_cache_size must be positive".into(),
            ));
        }
        if self.cache_refresh_check_interval == 0 {
            return Err(SlideshowError::Config(
                "cache_refresh_check_interval must be positive".into(),
            ));
        }
        if self.max_photos_limit == 0 {
            return Err(SlideshowError::Config(
                "max_photos_limit must be positive".into(),
            ));
        }
        if self.filter.min_people_count == 0 {
            return Err(SlideshowError::Config(
                "min_people_count must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parse a configuration document, validating ranges.
    pub fn from_json_str(json: &str) -> SlideshowResult<Self> {
        let config: SlideshowConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, validating ranges.
    pub fn from_json_file(path: &Path) -> SlideshowResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
