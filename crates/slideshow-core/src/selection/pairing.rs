//! Opportunistic pairing of portrait photos for side-by-side display.
//!
//! Pairing never mutates the selection index and never re-enters the
//! anti-repetition draw: the partner is picked directly from a bounded
//! random search and registered into the recency window by the caller once
//! the pair is actually displayed.

use rand::rngs::StdRng;
use rand::Rng;

use crate::models::{PhotoId, PhotoRecord};
use crate::selection::index::SelectionIndex;
use crate::selection::sampler::RecencyWindow;

/// Random candidates probed before giving up on finding a partner.
const SEARCH_BOUND: usize = 10;

/// Find a display partner for a portrait seed.
///
/// Compatibility requires portrait orientation on a still image; among the
/// probed candidates the closest aspect ratio wins as a best-effort
/// preference.  Returns `None` when no partner turns up within the search
/// bound, in which case the seed is shown alone.
pub fn find_partner(
    index: &SelectionIndex,
    recency: &RecencyWindow,
    seed: &PhotoRecord,
    rng: &mut StdRng,
) -> Option<PhotoId> {
    // Only still images pair; a motion seed never reaches here, but guard
    // against non-portrait seeds from miswired callers.
    if !seed.is_portrait() || seed.media_kind.is_motion() {
        return None;
    }
    let size = index.len();
    if size < 2 {
        return None;
    }

    let mut best: Option<(PhotoId, f64)> = None;
    let seed_ratio = seed.aspect_ratio();
    for _ in 0..SEARCH_BOUND {
        let position = rng.random_range(0..size);
        let Some(candidate) = index.get(position) else {
            continue;
        };
        if candidate.id == seed.id
            || !candidate.is_portrait()
            || candidate.media_kind.is_motion()
            || recency.contains(&candidate.id)
        {
            continue;
        }
        let distance = (candidate.aspect_ratio() - seed_ratio).abs();
        match &best {
            Some((_, best_distance)) if *best_distance <= distance => {}
            _ => best = Some((candidate.id.clone(), distance)),
        }
    }
    best.map(|(id, _)| id)
}
