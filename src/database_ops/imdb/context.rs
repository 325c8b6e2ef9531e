use std::collections::{HashMap, HashSet};

use super::rows::AttributeKey;
use crate::database_ops::dictionary::{CategoryId, Dictionary};
use crate::normalization::EntityId;

pub const UNKNOWN_TITLE_TYPE: &str = "Unknown";
pub const UNKNOWN_TITLE_TYPE_ID: CategoryId = 0;

/// Ordering used when an akas or principals row leaves it blank.
pub const DEFAULT_ORDERING: i32 = 1;

pub const DIRECTOR: &str = "Director";
pub const WRITER: &str = "Writer";

/// Ids already handed to the sink. Grows for the whole run and is never pruned,
/// so a later source can only add stubs for ids nobody emitted yet.
#[derive(Debug, Default)]
pub struct EmittedSet {
    ids: HashSet<EntityId>,
}

impl EmittedSet {
    /// Returns `true` when `id` was not emitted before.
    pub fn insert(&mut self, id: EntityId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Which (title, person) pairs already have a credit, and the highest ordinal
/// used per title.
///
/// Credits are recorded when they are handed to the loader, not when their
/// batch commits. A batch skipped after its retry leaves its credits recorded,
/// so the crew gap fill will not re-add those people for that title.
#[derive(Debug, Default)]
pub struct CreditIndex {
    pairs: HashSet<(EntityId, EntityId)>,
    ordinals: HashSet<(EntityId, i32)>,
    max_ordinal: HashMap<EntityId, i32>,
}

impl CreditIndex {
    /// Claim `(title_id, ordinal)` for `person_id`. Returns `false` and
    /// records nothing when the ordinal is already taken, since the insert
    /// would be discarded on conflict.
    pub fn record(&mut self, title_id: EntityId, person_id: EntityId, ordinal: i32) -> bool {
        if !self.ordinals.insert((title_id, ordinal)) {
            return false;
        }
        self.pairs.insert((title_id, person_id));
        let max = self.max_ordinal.entry(title_id).or_insert(ordinal);
        if ordinal > *max {
            *max = ordinal;
        }
        true
    }

    pub fn contains(&self, title_id: EntityId, person_id: EntityId) -> bool {
        self.pairs.contains(&(title_id, person_id))
    }

    /// Highest ordinal recorded for `title_id`, 0 when it has no credits yet.
    pub fn max_ordinal(&self, title_id: EntityId) -> i32 {
        self.max_ordinal.get(&title_id).copied().unwrap_or(0)
    }

}

/// All state shared between phases of one run. Built fresh per run and
/// dropped when the run ends.
#[derive(Debug, Default)]
pub struct RunContext {
    pub professions: Dictionary<String>,
    pub genres: Dictionary<String>,
    pub title_types: Dictionary<String>,
    pub attributes: Dictionary<AttributeKey>,
    pub persons: EmittedSet,
    pub titles: EmittedSet,
    pub credits: CreditIndex,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Title type id for a normalized label, falling back to the sentinel.
    pub fn title_type_or_unknown(&self, label: Option<&str>) -> CategoryId {
        label
            .and_then(|l| self.title_types.get(l))
            .unwrap_or(UNKNOWN_TITLE_TYPE_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_index_tracks_max_ordinal() {
        let mut idx = CreditIndex::default();
        idx.record(1, 10, 2);
        idx.record(1, 11, 5);
        idx.record(1, 12, 3);
        assert_eq!(idx.max_ordinal(1), 5);
        assert_eq!(idx.max_ordinal(2), 0);
        assert!(idx.contains(1, 11));
        assert!(!idx.contains(2, 11));
    }

    #[test]
    fn taken_ordinal_is_not_recorded_again() {
        let mut idx = CreditIndex::default();
        assert!(idx.record(1, 10, 2));
        assert!(!idx.record(1, 11, 2));
        assert!(!idx.contains(1, 11));
        assert!(idx.record(2, 11, 2));
    }

    #[test]
    fn emitted_set_reports_first_insert_only() {
        let mut set = EmittedSet::default();
        assert!(set.insert(7));
        assert!(!set.insert(7));
        assert!(set.contains(7));
        assert_eq!(set.len(), 1);
    }
}
