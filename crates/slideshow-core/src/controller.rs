//! Engine facade wiring the selection index, sampler, history, and refresh
//! components behind a single lock.
//!
//! All shared state lives in one `CoreState` under a `parking_lot` mutex.
//! Display operations (`next`, `previous`) and refresh checks take the lock
//! for the duration of the operation, so a background extension and a draw
//! never interleave.  Locks are never held across calls into the photo
//! source when avoidable.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::{FilterCriteria, SlideshowConfig};
use crate::errors::{SlideshowError, SlideshowResult};
use crate::history::HistoryNavigator;
use crate::models::{PhotoId, PhotoRecord, SlideEntry};
use crate::refresh::{self, ChangeSignal, PhotoSource, RefreshHandle, RefreshOutcome};
use crate::selection::index::SelectionIndex;
use crate::selection::pairing;
use crate::selection::sampler::AntiRepetitionSampler;

/// Mutable engine state guarded by the controller's mutex.
pub(crate) struct CoreState {
    pub(crate) index: SelectionIndex,
    pub(crate) sampler: AntiRepetitionSampler,
    pub(crate) history: HistoryNavigator,
    pub(crate) criteria: FilterCriteria,
    /// Timestamp of the last download signal acted upon.
    pub(crate) last_marker: Option<DateTime<Utc>>,
    /// Separate RNG for partner probing; the sampler keeps its own.
    pub(crate) pair_rng: StdRng,
}

pub struct SlideshowController {
    config: SlideshowConfig,
    state: Arc<Mutex<CoreState>>,
    source: Arc<dyn PhotoSource>,
    signal: Arc<dyn ChangeSignal>,
}

impl SlideshowController {
    /// Build the engine: validate the configuration, load the library
    /// through `source`, then run one synchronous refresh check so a signal
    /// written while the engine was down is picked up before display starts.
    pub fn new(
        config: SlideshowConfig,
        source: Arc<dyn PhotoSource>,
        signal: Arc<dyn ChangeSignal>,
    ) -> SlideshowResult<Self> {
        config.validate()?;

        let records = source.photos_since(None)?;
        let mut index = SelectionIndex::new(config.max_photos_limit);
        index.rebuild(records, &config.filter);
        if index.is_empty() {
            warn!(
                filter = %config.filter.describe(),
                "no photos pass the filter at startup"
            );
        }

        let mut state = CoreState {
            index,
            sampler: AntiRepetitionSampler::new(
                config.max_recent_photos,
                config.max_year_percentage,
            ),
            history: HistoryNavigator::new(config.photo_history_cache_size),
            criteria: config.filter.clone(),
            last_marker: None,
            pair_rng: StdRng::from_os_rng(),
        };

        {
            let CoreState {
                index,
                criteria,
                last_marker,
                ..
            } = &mut state;
            match refresh::run_check(index, last_marker, criteria, source.as_ref(), signal.as_ref())
            {
                Ok(RefreshOutcome::Extended(added)) => {
                    info!(added, "startup refresh check extended the index")
                }
                Ok(RefreshOutcome::Unchanged) => {}
                Err(err) => warn!(error = %err, "startup refresh check failed"),
            }
        }

        info!(
            photos = state.index.len(),
            pairing = config.portrait_pairing,
            "slideshow engine ready"
        );
        Ok(Self {
            config,
            state: Arc::new(Mutex::new(state)),
            source,
            signal,
        })
    }

    /// Advance the slideshow: replay forward history, or draw a fresh entry
    /// at the live edge.  A fresh portrait draw is paired opportunistically
    /// when pairing is enabled.
    pub fn next(&self) -> SlideshowResult<SlideEntry> {
        let mut core = self.state.lock();
        let CoreState {
            index,
            sampler,
            history,
            criteria,
            pair_rng,
            ..
        } = &mut *core;
        let pairing_enabled = self.config.portrait_pairing;

        history.next(|| {
            let id = sampler.draw(index, criteria)?;
            let record = index
                .get_by_id(&id)
                .ok_or(SlideshowError::PoolExhausted {
                    index_size: index.len(),
                })?;

            if pairing_enabled && record.is_portrait() {
                if let Some(partner) =
                    pairing::find_partner(index, sampler.recency(), record, pair_rng)
                {
                    let partner_year = index
                        .get_by_id(&partner)
                        .and_then(|record| record.capture_year());
                    sampler.register(partner.clone(), partner_year);
                    debug!(seed = %id, partner = %partner, "portrait pair formed");
                    return Ok(SlideEntry::Pair(id, partner));
                }
            }
            Ok(SlideEntry::Single(id))
        })
    }

    /// Step back to the previously shown entry.
    pub fn previous(&self) -> SlideshowResult<SlideEntry> {
        self.state.lock().history.previous()
    }

    /// Entry currently under the history cursor.
    pub fn current(&self) -> Option<SlideEntry> {
        self.state
            .lock()
            .history
            .current()
            .map(|entry| entry.entry.clone())
    }

    /// Run one refresh check synchronously (the foreground variant of what
    /// the background worker does on its interval).
    pub fn check_for_new_photos(&self) -> SlideshowResult<RefreshOutcome> {
        let mut core = self.state.lock();
        let CoreState {
            index,
            criteria,
            last_marker,
            ..
        } = &mut *core;
        refresh::run_check(
            index,
            last_marker,
            criteria,
            self.source.as_ref(),
            self.signal.as_ref(),
        )
    }

    /// Reload the full library under the current criteria.
    ///
    /// Anti-repetition state and history are dropped along with the old
    /// index, since recorded identifiers may no longer exist.  The lock is
    /// held across the fetch: a refresh check that lands between the fetch
    /// and the rebuild would leave the marker claiming photos the rebuilt
    /// index never saw.
    pub fn rebuild(&self) -> SlideshowResult<usize> {
        let mut core = self.state.lock();
        let records = self.source.photos_since(None)?;
        let criteria = core.criteria.clone();
        core.index.rebuild(records, &criteria);
        core.sampler.clear();
        core.history.clear();
        Ok(core.index.len())
    }

    /// Swap the filter criteria and rebuild the selection index.  Holds the
    /// lock across the fetch, like `rebuild`.
    pub fn apply_criteria(&self, criteria: FilterCriteria) -> SlideshowResult<usize> {
        info!(filter = %criteria.describe(), "applying new filter criteria");
        let mut core = self.state.lock();
        let records = self.source.photos_since(None)?;
        core.criteria = criteria;
        let criteria = core.criteria.clone();
        core.index.rebuild(records, &criteria);
        core.sampler.clear();
        core.history.clear();
        Ok(core.index.len())
    }

    /// Start the background refresh worker on the configured interval.
    pub fn spawn_refresh(&self) -> SlideshowResult<RefreshHandle> {
        refresh::spawn_worker(
            Arc::clone(&self.state),
            Arc::clone(&self.source),
            Arc::clone(&self.signal),
            Duration::from_secs(self.config.cache_refresh_check_interval),
        )
    }

    /// Full record for a drawn identifier (for rendering).
    pub fn photo(&self, id: &PhotoId) -> Option<PhotoRecord> {
        self.state.lock().index.get_by_id(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().index.is_empty()
    }

    pub fn config(&self) -> &SlideshowConfig {
        &self.config
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.state.lock().criteria.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DownloadSignal, MediaKind, Orientation};

    fn record(id: &str, width: u32, height: u32) -> PhotoRecord {
        PhotoRecord {
            id: PhotoId::from(id),
            filename: format!("{id}.jpg"),
            path: format!("/photos/{id}.jpg").into(),
            width,
            height,
            orientation: Orientation::from_dimensions(width, height),
            media_kind: MediaKind::Image,
            captured_at: None,
            coordinate: None,
            people: Vec::new(),
            keywords: Vec::new(),
            place: None,
        }
    }

    fn landscape(id: &str) -> PhotoRecord {
        record(id, 4000, 3000)
    }

    fn portrait(id: &str) -> PhotoRecord {
        record(id, 3000, 4000)
    }

    struct FakeSource {
        records: Mutex<Vec<PhotoRecord>>,
    }

    impl FakeSource {
        fn new(records: Vec<PhotoRecord>) -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(records),
            })
        }

        fn add(&self, record: PhotoRecord) {
            self.records.lock().push(record);
        }
    }

    impl PhotoSource for FakeSource {
        fn photos_since(
            &self,
            _marker: Option<DateTime<Utc>>,
        ) -> SlideshowResult<Vec<PhotoRecord>> {
            Ok(self.records.lock().clone())
        }
    }

    struct FakeSignal {
        current: Mutex<Option<DownloadSignal>>,
    }

    impl FakeSignal {
        fn empty() -> Arc<Self> {
            Arc::new(Self {
                current: Mutex::new(None),
            })
        }

        fn announce(&self, timestamp: DateTime<Utc>, photos_added: u64) {
            *self.current.lock() = Some(DownloadSignal {
                last_download_timestamp: timestamp,
                photos_added,
                total_photos: 0,
                download_session_id: format!("session_{}", timestamp.timestamp()),
            });
        }
    }

    impl ChangeSignal for FakeSignal {
        fn current(&self) -> SlideshowResult<Option<DownloadSignal>> {
            Ok(self.current.lock().clone())
        }
    }

    fn config(pairing: bool) -> SlideshowConfig {
        SlideshowConfig {
            max_recent_photos: 2,
            photo_history_cache_size: 10,
            portrait_pairing: pairing,
            ..SlideshowConfig::default()
        }
    }

    fn controller(
        records: Vec<PhotoRecord>,
        pairing: bool,
    ) -> (SlideshowController, Arc<FakeSource>, Arc<FakeSignal>) {
        let source = FakeSource::new(records);
        let signal = FakeSignal::empty();
        let controller = SlideshowController::new(
            config(pairing),
            Arc::clone(&source) as Arc<dyn PhotoSource>,
            Arc::clone(&signal) as Arc<dyn ChangeSignal>,
        )
        .unwrap();
        (controller, source, signal)
    }

    #[test]
    fn test_next_then_previous_replays() {
        let (controller, _, _) = controller(
            vec![landscape("a"), landscape("b"), landscape("c")],
            false,
        );
        let first = controller.next().unwrap();
        let second = controller.next().unwrap();
        assert_ne!(first, second);
        assert_eq!(controller.previous().unwrap(), first);
        // Forward again replays the recorded entry instead of redrawing.
        assert_eq!(controller.next().unwrap(), second);
    }

    #[test]
    fn test_previous_without_history_errors() {
        let (controller, _, _) = controller(vec![landscape("a")], false);
        assert!(matches!(
            controller.previous(),
            Err(SlideshowError::NoHistory)
        ));
    }

    #[test]
    fn test_all_portrait_pool_pairs() {
        let records = (0..5).map(|i| portrait(&format!("p{i}"))).collect();
        let (controller, _, _) = controller(records, true);
        match controller.next().unwrap() {
            SlideEntry::Pair(a, b) => assert_ne!(a, b),
            SlideEntry::Single(id) => panic!("expected a pair, got single {id}"),
        }
    }

    #[test]
    fn test_pairing_disabled_yields_singles() {
        let records = (0..5).map(|i| portrait(&format!("p{i}"))).collect();
        let (controller, _, _) = controller(records, false);
        for _ in 0..10 {
            assert!(matches!(controller.next().unwrap(), SlideEntry::Single(_)));
        }
    }

    #[test]
    fn test_pair_partner_enters_recency_window() {
        let records = (0..5).map(|i| portrait(&format!("p{i}"))).collect();
        let (controller, _, _) = controller(records, true);
        let SlideEntry::Pair(seed, partner) = controller.next().unwrap() else {
            panic!("expected a pair");
        };
        let core = controller.state.lock();
        assert!(core.sampler.recency().contains(&seed));
        assert!(core.sampler.recency().contains(&partner));
    }

    #[test]
    fn test_empty_index_draw_is_no_eligible_photos() {
        let (controller, _, _) = controller(Vec::new(), false);
        assert!(matches!(
            controller.next(),
            Err(SlideshowError::NoEligiblePhotos { .. })
        ));
    }

    #[test]
    fn test_unchanged_signal_does_not_extend() {
        let (controller, source, signal) = controller(vec![landscape("a")], false);
        signal.announce(Utc::now(), 1);
        source.add(landscape("b"));
        assert_eq!(
            controller.check_for_new_photos().unwrap(),
            RefreshOutcome::Extended(1)
        );
        // Same signal, another library addition: marker unchanged, no pull.
        source.add(landscape("c"));
        assert_eq!(
            controller.check_for_new_photos().unwrap(),
            RefreshOutcome::Unchanged
        );
        assert_eq!(controller.len(), 2);
    }

    #[test]
    fn test_new_signal_appends_exactly_new_records() {
        let (controller, source, signal) = controller(vec![landscape("a")], false);
        assert_eq!(controller.len(), 1);

        source.add(landscape("b"));
        source.add(landscape("c"));
        signal.announce(Utc::now(), 2);
        assert_eq!(
            controller.check_for_new_photos().unwrap(),
            RefreshOutcome::Extended(2)
        );
        assert_eq!(controller.len(), 3);
        assert!(controller.photo(&PhotoId::from("c")).is_some());
    }

    #[test]
    fn test_startup_signal_sets_marker() {
        let source = FakeSource::new(vec![landscape("a")]);
        let signal = FakeSignal::empty();
        signal.announce(Utc::now(), 1);
        let controller = SlideshowController::new(
            config(false),
            Arc::clone(&source) as Arc<dyn PhotoSource>,
            Arc::clone(&signal) as Arc<dyn ChangeSignal>,
        )
        .unwrap();
        // The startup check consumed the pre-existing signal.
        assert_eq!(
            controller.check_for_new_photos().unwrap(),
            RefreshOutcome::Unchanged
        );
    }

    #[test]
    fn test_apply_criteria_rebuilds_and_clears_history() {
        let mut tagged = landscape("tagged");
        tagged.people = vec!["Ally Smith".into()];
        let (controller, _, _) = controller(vec![landscape("plain"), tagged], false);
        controller.next().unwrap();
        controller.next().unwrap();

        let remaining = controller
            .apply_criteria(FilterCriteria {
                people_names: vec!["Ally".into()],
                min_people_count: 1,
                ..FilterCriteria::default()
            })
            .unwrap();
        assert_eq!(remaining, 1);
        assert!(matches!(
            controller.previous(),
            Err(SlideshowError::NoHistory)
        ));
        match controller.next().unwrap() {
            SlideEntry::Single(id) => assert_eq!(id.as_str(), "tagged"),
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_refresh_and_rebuild_lose_no_photos() {
        // Refresh checks advance the marker while rebuilds replace the
        // index; no interleaving may strand a photo behind the marker.
        let (controller, source, signal) = controller(vec![landscape("p0")], false);
        let base = Utc::now();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..20i64 {
                    source.add(landscape(&format!("n{i}")));
                    signal.announce(base + chrono::Duration::seconds(i + 1), 1);
                    let _ = controller.check_for_new_photos();
                }
            });
            for _ in 0..20 {
                controller.rebuild().unwrap();
            }
        });
        assert_eq!(controller.len(), 21);
    }

    #[test]
    fn test_rebuild_picks_up_library_changes() {
        let (controller, source, _) = controller(vec![landscape("a")], false);
        source.add(landscape("b"));
        assert_eq!(controller.rebuild().unwrap(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let source = FakeSource::new(vec![landscape("a")]);
        let signal = FakeSignal::empty();
        let mut config = config(false);
        config.max_recent_photos = 0;
        assert!(matches!(
            SlideshowController::new(
                config,
                source as Arc<dyn PhotoSource>,
                signal as Arc<dyn ChangeSignal>,
            ),
            Err(SlideshowError::Config(_))
        ));
    }

    #[test]
    fn test_spawn_refresh_shuts_down_cleanly() {
        let (controller, _, _) = controller(vec![landscape("a")], false);
        let handle = controller.spawn_refresh().unwrap();
        handle.shutdown();
    }
}
