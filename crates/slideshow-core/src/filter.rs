//! Inclusion predicate over photo metadata.
//!
//! `accepts` is pure and deterministic: no I/O, no hidden state.  Each filter
//! category yields `None` when unconfigured (vacuous), so it never gates the
//! overall combination.

use crate::config::{FilterCriteria, FilterLogic};
use crate::models::PhotoRecord;

/// Evaluate a record against the criteria.
///
/// Motion files never pass, regardless of criteria.  With empty criteria
/// every still photo is accepted.
pub fn accepts(record: &PhotoRecord, criteria: &FilterCriteria) -> bool {
    if record.media_kind.is_motion() {
        return false;
    }

    let results = [
        people_test(record, criteria),
        places_test(record, criteria),
        keywords_test(record, criteria),
    ];
    let gating: Vec<bool> = results.iter().filter_map(|r| *r).collect();
    if gating.is_empty() {
        return true;
    }
    match criteria.overall_logic {
        FilterLogic::And => gating.iter().all(|&passed| passed),
        FilterLogic::Or => gating.iter().any(|&passed| passed),
    }
}

/// Case-insensitive substring containment.
fn contains_fragment(haystack: &str, fragment: &str) -> bool {
    haystack.to_lowercase().contains(&fragment.to_lowercase())
}

/// People test: configured name fragments against the record's people labels,
/// plus the minimum label count.  `None` when no names are configured.
fn people_test(record: &PhotoRecord, criteria: &FilterCriteria) -> Option<bool> {
    if criteria.people_names.is_empty() {
        return None;
    }
    if record.people.len() < criteria.min_people_count {
        return Some(false);
    }
    let name_matches = |name: &String| {
        record
            .people
            .iter()
            .any(|label| contains_fragment(label, name))
    };
    let passed = match criteria.people_logic {
        FilterLogic::And => criteria.people_names.iter().all(name_matches),
        FilterLogic::Or => criteria.people_names.iter().any(name_matches),
    };
    Some(passed)
}

/// Places test: configured substrings against the record's place label.
/// `None` when no places are configured.
fn places_test(record: &PhotoRecord, criteria: &FilterCriteria) -> Option<bool> {
    if criteria.places.is_empty() {
        return None;
    }
    let Some(place) = record.place.as_deref() else {
        return Some(false);
    };
    let passed = match criteria.places_logic {
        FilterLogic::And => criteria
            .places
            .iter()
            .all(|fragment| contains_fragment(place, fragment)),
        FilterLogic::Or => criteria
            .places
            .iter()
            .any(|fragment| contains_fragment(place, fragment)),
    };
    Some(passed)
}

/// Keyword test: any configured fragment against the record's keywords.
/// `None` when no keywords are configured.
fn keywords_test(record: &PhotoRecord, criteria: &FilterCriteria) -> Option<bool> {
    if criteria.keywords.is_empty() {
        return None;
    }
    let passed = criteria.keywords.iter().any(|fragment| {
        record
            .keywords
            .iter()
            .any(|keyword| contains_fragment(keyword, fragment))
    });
    Some(passed)
}
