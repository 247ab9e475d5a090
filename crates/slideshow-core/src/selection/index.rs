//! Ordered index of photos that pass the active filter criteria.
//!
//! Invariants: every entry was accepted by the filter at insertion time, no
//! identifier appears twice, and positions are stable across `extend`; the
//! index only grows by appending until an explicit `rebuild` replaces it.

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::FilterCriteria;
use crate::filter;
use crate::models::{PhotoId, PhotoRecord};

pub struct SelectionIndex {
    photos: IndexMap<PhotoId, PhotoRecord>,
    max_photos: usize,
}

impl SelectionIndex {
    pub fn new(max_photos: usize) -> Self {
        Self {
            photos: IndexMap::new(),
            max_photos,
        }
    }

    /// Replace the index with the records passing `criteria`.
    ///
    /// Atomic from the caller's perspective: the old contents are dropped
    /// only after the new set is built.  Invalidates all outstanding
    /// positions; the controller clears the sampler and history alongside.
    pub fn rebuild(&mut self, records: Vec<PhotoRecord>, criteria: &FilterCriteria) {
        let scanned = records.len();
        let accepted: Vec<PhotoRecord> = records
            .into_par_iter()
            .filter(|record| filter::accepts(record, criteria))
            .collect();

        let mut photos = IndexMap::with_capacity(accepted.len().min(self.max_photos));
        for record in accepted {
            if photos.len() >= self.max_photos {
                warn!(
                    limit = self.max_photos,
                    "photo limit reached during rebuild, truncating"
                );
                break;
            }
            photos.insert(record.id.clone(), record);
        }

        info!(
            scanned,
            accepted = photos.len(),
            filter = %criteria.describe(),
            "selection index rebuilt"
        );
        self.photos = photos;
    }

    /// Append records that pass `criteria` and are not already present.
    ///
    /// Returns the number of records actually added.  Once the photo limit
    /// is reached the call degrades to a logged no-op.
    pub fn extend(&mut self, records: Vec<PhotoRecord>, criteria: &FilterCriteria) -> usize {
        let mut added = 0;
        for record in records {
            if self.photos.len() >= self.max_photos {
                warn!(
                    limit = self.max_photos,
                    "photo limit reached, skipping remaining new photos"
                );
                break;
            }
            if self.photos.contains_key(&record.id) {
                continue;
            }
            if !filter::accepts(&record, criteria) {
                continue;
            }
            self.photos.insert(record.id.clone(), record);
            added += 1;
        }
        if added > 0 {
            info!(added, total = self.photos.len(), "selection index extended");
        } else {
            debug!(total = self.photos.len(), "extension added no new photos");
        }
        added
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// Record at a stable position.
    pub fn get(&self, position: usize) -> Option<&PhotoRecord> {
        self.photos.get_index(position).map(|(_, record)| record)
    }

    pub fn get_by_id(&self, id: &PhotoId) -> Option<&PhotoRecord> {
        self.photos.get(id)
    }

    pub fn contains(&self, id: &PhotoId) -> bool {
        self.photos.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhotoRecord> {
        self.photos.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaKind, Orientation};

    fn record(id: &str) -> PhotoRecord {
        PhotoRecord {
            id: PhotoId::from(id),
            filename: format!("{id}.jpg"),
            path: format!("/photos/{id}.jpg").into(),
            width: 4000,
            height: 3000,
            orientation: Orientation::Landscape,
            media_kind: MediaKind::Image,
            captured_at: None,
            coordinate: None,
            people: Vec::new(),
            keywords: Vec::new(),
            place: None,
        }
    }

    fn unfiltered() -> FilterCriteria {
        FilterCriteria {
            min_people_count: 1,
            ..FilterCriteria::default()
        }
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut index = SelectionIndex::new(500);
        index.rebuild(vec![record("a"), record("b")], &unfiltered());
        assert_eq!(index.len(), 2);
        index.rebuild(vec![record("c")], &unfiltered());
        assert_eq!(index.len(), 1);
        assert!(index.contains(&PhotoId::from("c")));
        assert!(!index.contains(&PhotoId::from("a")));
    }

    #[test]
    fn test_extend_dedups_and_preserves_positions() {
        let mut index = SelectionIndex::new(500);
        index.rebuild(vec![record("a"), record("b")], &unfiltered());
        let added = index.extend(vec![record("b"), record("c"), record("c")], &unfiltered());
        assert_eq!(added, 1);
        assert_eq!(index.len(), 3);
        // Existing positions unchanged by extension.
        assert_eq!(index.get(0).unwrap().id.as_str(), "a");
        assert_eq!(index.get(1).unwrap().id.as_str(), "b");
        assert_eq!(index.get(2).unwrap().id.as_str(), "c");
    }

    #[test]
    fn test_extend_size_counts_distinct_accepted() {
        // Disjoint batches: size equals the total distinct accepted records.
        let mut index = SelectionIndex::new(500);
        index.extend(vec![record("a"), record("b")], &unfiltered());
        index.extend(vec![record("c")], &unfiltered());
        index.extend(vec![record("a")], &unfiltered());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_extend_filters_new_records() {
        let mut index = SelectionIndex::new(500);
        let mut video = record("v");
        video.media_kind = MediaKind::Video;
        let added = index.extend(vec![record("a"), video], &unfiltered());
        assert_eq!(added, 1);
        assert!(!index.contains(&PhotoId::from("v")));
    }

    #[test]
    fn test_max_photos_limit_is_noop_cap() {
        let mut index = SelectionIndex::new(2);
        index.rebuild(vec![record("a"), record("b"), record("c")], &unfiltered());
        assert_eq!(index.len(), 2);
        let added = index.extend(vec![record("d")], &unfiltered());
        assert_eq!(added, 0);
        assert_eq!(index.len(), 2);
    }
}
