//! Anti-repetition sampling over the selection index.
//!
//! A draw excludes the recency window (short-term memory) and any capture
//! year over its budget share (long-term memory).  Constraints are relaxed
//! progressively when they exhaust the pool: recency-empty pools drop the
//! recency constraint first, while pools emptied only by the year caps lift
//! those caps most-over-budget year first.  Every relaxation is logged.

use std::collections::{HashMap, HashSet, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::config::FilterCriteria;
use crate::errors::{SlideshowError, SlideshowResult};
use crate::models::{PhotoId, PhotoRecord};
use crate::selection::index::SelectionIndex;

/// Random probes attempted before falling back to an exact candidate scan.
const PROBE_LIMIT: usize = 32;

/// Year budgets are meaningless over a handful of draws (the first draw puts
/// one year at 100%), so they only gate once this many draws have happened.
const MIN_DRAWS_FOR_YEAR_BUDGET: u64 = 20;

// ---------------------------------------------------------------------------
// RecencyWindow
// ---------------------------------------------------------------------------

/// Bounded queue of the most recently shown identifiers.
pub struct RecencyWindow {
    window: VecDeque<PhotoId>,
    capacity: usize,
}

impl RecencyWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, id: &PhotoId) -> bool {
        self.window.contains(id)
    }

    /// Record a shown identifier, evicting the oldest entry when full.
    pub fn push(&mut self, id: PhotoId) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(id);
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

// ---------------------------------------------------------------------------
// YearBudget
// ---------------------------------------------------------------------------

/// Per-capture-year draw counters tracked against a ceiling fraction.
pub struct YearBudget {
    counts: HashMap<i32, u64>,
    total: u64,
    max_fraction: f64,
}

impl YearBudget {
    pub fn new(max_fraction: f64) -> Self {
        Self {
            counts: HashMap::new(),
            total: 0,
            max_fraction,
        }
    }

    /// Would drawing this year again push it past its budget share?
    pub fn is_over_budget(&self, year: i32) -> bool {
        if self.total < MIN_DRAWS_FOR_YEAR_BUDGET {
            return false;
        }
        let count = self.counts.get(&year).copied().unwrap_or(0);
        (count + 1) as f64 > self.max_fraction * (self.total + 1) as f64
    }

    /// How far past its share the year currently is (ordering key for
    /// deterministic relaxation; higher = relaxed first).
    fn overshoot(&self, year: i32) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count = self.counts.get(&year).copied().unwrap_or(0);
        count as f64 / self.total as f64 - self.max_fraction
    }

    pub fn record(&mut self, year: Option<i32>) {
        if let Some(year) = year {
            *self.counts.entry(year).or_insert(0) += 1;
        }
        self.total += 1;
    }

    pub fn total_draws(&self) -> u64 {
        self.total
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.total = 0;
    }
}

// ---------------------------------------------------------------------------
// AntiRepetitionSampler
// ---------------------------------------------------------------------------

pub struct AntiRepetitionSampler {
    recency: RecencyWindow,
    years: YearBudget,
    rng: StdRng,
}

impl AntiRepetitionSampler {
    pub fn new(max_recent_photos: usize, max_year_percentage: f64) -> Self {
        Self::with_rng(
            max_recent_photos,
            max_year_percentage,
            StdRng::from_os_rng(),
        )
    }

    /// Construct with an explicit RNG (deterministic tests and benches).
    pub fn with_rng(max_recent_photos: usize, max_year_percentage: f64, rng: StdRng) -> Self {
        Self {
            recency: RecencyWindow::new(max_recent_photos),
            years: YearBudget::new(max_year_percentage),
            rng,
        }
    }

    pub fn recency(&self) -> &RecencyWindow {
        &self.recency
    }

    /// Register a displayed photo into the recency window and year budget.
    ///
    /// `draw` does this for its own result; pair partners picked outside the
    /// sampler must be registered here once actually displayed.
    pub fn register(&mut self, id: PhotoId, capture_year: Option<i32>) {
        self.recency.push(id);
        self.years.record(capture_year);
    }

    /// Reset all anti-repetition state (full rebuild path).
    pub fn clear(&mut self) {
        self.recency.clear();
        self.years.clear();
    }

    /// Draw the next identifier from the index.
    ///
    /// Uniform random by position, O(1) expected via bounded rejection
    /// sampling; falls back to an exact scan with progressive relaxation
    /// when the constrained pool runs dry.
    pub fn draw(
        &mut self,
        index: &SelectionIndex,
        criteria: &FilterCriteria,
    ) -> SlideshowResult<PhotoId> {
        let size = index.len();
        if size == 0 {
            return Err(SlideshowError::NoEligiblePhotos {
                filter: criteria.describe(),
                index_size: 0,
            });
        }

        // Fast path: random probes under the full constraints.
        for _ in 0..PROBE_LIMIT {
            let position = self.rng.random_range(0..size);
            if let Some(record) = index.get(position) {
                if self.admissible(record) {
                    return Ok(self.commit(record));
                }
            }
        }

        self.draw_exact(index)
    }

    fn admissible(&self, record: &PhotoRecord) -> bool {
        if self.recency.contains(&record.id) {
            return false;
        }
        match record.capture_year() {
            Some(year) => !self.years.is_over_budget(year),
            None => true,
        }
    }

    /// Exact scan with the relaxation ladder.
    fn draw_exact(&mut self, index: &SelectionIndex) -> SlideshowResult<PhotoId> {
        let not_recent: Vec<usize> = (0..index.len())
            .filter(|&pos| {
                index
                    .get(pos)
                    .map(|record| !self.recency.contains(&record.id))
                    .unwrap_or(false)
            })
            .collect();

        if !not_recent.is_empty() {
            // Strict: recency and year budget both enforced.
            let strict: Vec<usize> = not_recent
                .iter()
                .copied()
                .filter(|&pos| {
                    index
                        .get(pos)
                        .and_then(|record| record.capture_year())
                        .map(|year| !self.years.is_over_budget(year))
                        .unwrap_or(true)
                })
                .collect();
            if let Some(&pos) = self.pick(&strict) {
                let record = index.get(pos).ok_or(SlideshowError::PoolExhausted {
                    index_size: index.len(),
                })?;
                return Ok(self.commit(record));
            }

            // Only the year caps empty the pool: lift them one year at a
            // time, most-over-budget first, until a candidate survives.
            let mut over_years: Vec<i32> = not_recent
                .iter()
                .filter_map(|&pos| index.get(pos).and_then(|record| record.capture_year()))
                .filter(|&year| self.years.is_over_budget(year))
                .collect::<HashSet<i32>>()
                .into_iter()
                .collect();
            over_years.sort_by(|a, b| {
                self.years
                    .overshoot(*b)
                    .partial_cmp(&self.years.overshoot(*a))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(b))
            });

            let mut lifted: HashSet<i32> = HashSet::new();
            for year in over_years {
                lifted.insert(year);
                let relaxed: Vec<usize> = not_recent
                    .iter()
                    .copied()
                    .filter(|&pos| {
                        index
                            .get(pos)
                            .and_then(|record| record.capture_year())
                            .map(|y| lifted.contains(&y) || !self.years.is_over_budget(y))
                            .unwrap_or(true)
                    })
                    .collect();
                if let Some(&pos) = self.pick(&relaxed) {
                    warn!(years = ?lifted, "year budget relaxed for this draw");
                    let record = index.get(pos).ok_or(SlideshowError::PoolExhausted {
                        index_size: index.len(),
                    })?;
                    return Ok(self.commit(record));
                }
            }
        }

        // Every candidate is in the recency window: drop the recency
        // constraint, keeping the year caps where possible.
        warn!(
            recent = self.recency.len(),
            index_size = index.len(),
            "recency window relaxed for this draw"
        );
        let within_budget: Vec<usize> = (0..index.len())
            .filter(|&pos| {
                index
                    .get(pos)
                    .and_then(|record| record.capture_year())
                    .map(|year| !self.years.is_over_budget(year))
                    .unwrap_or(true)
            })
            .collect();
        if let Some(&pos) = self.pick(&within_budget) {
            let record = index.get(pos).ok_or(SlideshowError::PoolExhausted {
                index_size: index.len(),
            })?;
            return Ok(self.commit(record));
        }

        // Both constraints dropped: any entry at all.
        warn!(index_size = index.len(), "all sampling constraints relaxed");
        let all: Vec<usize> = (0..index.len()).collect();
        match self.pick(&all) {
            Some(&pos) => {
                let record = index.get(pos).ok_or(SlideshowError::PoolExhausted {
                    index_size: index.len(),
                })?;
                Ok(self.commit(record))
            }
            None => Err(SlideshowError::PoolExhausted {
                index_size: index.len(),
            }),
        }
    }

    fn pick<'a>(&mut self, candidates: &'a [usize]) -> Option<&'a usize> {
        if candidates.is_empty() {
            None
        } else {
            candidates.get(self.rng.random_range(0..candidates.len()))
        }
    }

    fn commit(&mut self, record: &PhotoRecord) -> PhotoId {
        let id = record.id.clone();
        self.register(id.clone(), record.capture_year());
        id
    }
}
