use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

pub type CategoryId = i32;

/// Collects distinct labels for one category table and assigns surrogate ids.
///
/// Ids are assigned in sorted label order, counting up from one past the
/// largest pinned id (or from 1 when nothing is pinned). Pinned entries keep
/// their id no matter where their label sorts, so a sentinel such as
/// `Unknown = 0` is stable across inputs.
#[derive(Debug, Clone)]
pub struct DictionaryBuilder<K: Ord> {
    labels: BTreeSet<K>,
    pinned: BTreeMap<K, CategoryId>,
}

impl<K: Ord + Hash + Clone> Default for DictionaryBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Hash + Clone> DictionaryBuilder<K> {
    pub fn new() -> Self {
        Self {
            labels: BTreeSet::new(),
            pinned: BTreeMap::new(),
        }
    }

    /// Reserve a fixed id for a schema-mandated entry.
    pub fn pin(mut self, label: K, id: CategoryId) -> Self {
        self.pinned.insert(label, id);
        self
    }

    pub fn insert(&mut self, label: K) {
        self.labels.insert(label);
    }

    pub fn build(self) -> Dictionary<K> {
        let mut next = self.pinned.values().max().map_or(1, |max| max + 1);
        let mut entries: Vec<(CategoryId, K)> =
            self.pinned.iter().map(|(label, id)| (*id, label.clone())).collect();
        for label in self.labels {
            if self.pinned.contains_key(&label) {
                continue;
            }
            entries.push((next, label));
            next += 1;
        }
        entries.sort_by_key(|(id, _)| *id);
        let ids = entries.iter().map(|(id, label)| (label.clone(), *id)).collect();
        Dictionary { ids, entries }
    }
}

/// Label -> id lookup built once per run. Entries are never removed.
#[derive(Debug, Clone)]
pub struct Dictionary<K> {
    ids: HashMap<K, CategoryId>,
    entries: Vec<(CategoryId, K)>,
}

impl<K: Hash + Eq> Default for Dictionary<K> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Hash + Eq> Dictionary<K> {
    pub fn get<Q>(&self, label: &Q) -> Option<CategoryId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.ids.get(label).copied()
    }

    /// Entries ordered by id.
    pub fn entries(&self) -> impl Iterator<Item = (CategoryId, &K)> + '_ {
        self.entries.iter().map(|(id, label)| (*id, label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(labels: &[&str]) -> Dictionary<String> {
        let mut builder = DictionaryBuilder::new();
        for l in labels {
            builder.insert((*l).to_string());
        }
        builder.build()
    }

    #[test]
    fn assigns_sequential_ids_in_sorted_order() {
        let dict = build(&["Writer", "Actor", "Director", "Actor"]);
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.get("Actor"), Some(1));
        assert_eq!(dict.get("Director"), Some(2));
        assert_eq!(dict.get("Writer"), Some(3));
        assert_eq!(dict.get("Producer"), None);
    }

    #[test]
    fn mapping_is_independent_of_input_order() {
        let a = build(&["Short", "Drama", "Comedy", "Animation"]);
        let b = build(&["Animation", "Comedy", "Short", "Drama"]);
        let left: Vec<_> = a.entries().map(|(id, l)| (id, l.clone())).collect();
        let right: Vec<_> = b.entries().map(|(id, l)| (id, l.clone())).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn sentinel_keeps_pinned_id() {
        for labels in [["Movie", "Unknown", "Short"], ["Unknown", "Short", "Movie"]] {
            let mut builder = DictionaryBuilder::new().pin("Unknown".to_string(), 0);
            for l in labels {
                builder.insert(l.to_string());
            }
            let dict = builder.build();
            assert_eq!(dict.get("Unknown"), Some(0));
            assert_eq!(dict.get("Movie"), Some(1));
            assert_eq!(dict.get("Short"), Some(2));
            assert_eq!(dict.len(), 3);
        }
    }

    #[test]
    fn sentinel_survives_empty_input() {
        let dict = DictionaryBuilder::<String>::new()
            .pin("Unknown".to_string(), 0)
            .build();
        assert_eq!(dict.entries().collect::<Vec<_>>(), vec![(0, &"Unknown".to_string())]);
    }

    #[test]
    fn counting_resumes_after_highest_pin() {
        let mut builder = DictionaryBuilder::new()
            .pin("Movie".to_string(), 1)
            .pin("TV Show".to_string(), 2);
        builder.insert("Anime".to_string());
        let dict = builder.build();
        assert_eq!(dict.get("Anime"), Some(3));
        assert_eq!(dict.get("TV Show"), Some(2));
    }

    #[test]
    fn tuple_keys_are_supported() {
        let mut builder = DictionaryBuilder::new();
        builder.insert(("Title types".to_string(), "dvd".to_string()));
        builder.insert(("Title attribute".to_string(), "literal title".to_string()));
        let dict = builder.build();
        assert_eq!(
            dict.get(&("Title attribute".to_string(), "literal title".to_string())),
            Some(1)
        );
    }
}
