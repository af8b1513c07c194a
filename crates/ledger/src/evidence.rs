use evidence_protocol::normalize_identity;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Filenames committed as evidence, keyed by normalized identity. The literal kept for
/// each key is the first variant ever inserted. There is no removal operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceSet {
    by_key: BTreeMap<String, String>,
}

impl EvidenceSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless an equivalent filename is already present. Returns whether it was new.
    pub fn insert(&mut self, name: &str) -> bool {
        let key = normalize_identity(name);
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.by_key.insert(key, name.to_string());
        true
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_key.contains_key(&normalize_identity(name))
    }

    /// The candidates that would be new, in input order, with equivalent variants inside
    /// the batch collapsed to their first occurrence.
    #[must_use]
    pub fn new_items<'a, I>(&self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = BTreeSet::new();
        candidates
            .into_iter()
            .filter(|name| {
                let key = normalize_identity(name);
                !self.by_key.contains_key(&key) && seen.insert(key)
            })
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Normalized identities of every member.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(String::as_str)
    }

    /// Stored literals, sorted.
    #[must_use]
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_key.values().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Serialize for EvidenceSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_variant_is_kept() {
        let mut set = EvidenceSet::new();
        assert!(set.insert("A.pdf"));
        assert!(!set.insert("a.pdf "));
        assert!(set.contains(" A.PDF"));
        assert_eq!(set.sorted(), vec!["A.pdf"]);
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["a.pdf"]);
    }

    #[test]
    fn new_items_skips_present_and_batch_duplicates() {
        let mut set = EvidenceSet::new();
        set.insert("x");
        let added = set.new_items(["X", "Y", "y ", "Z"]);
        assert_eq!(added, vec!["Y", "Z"]);
    }

    #[test]
    fn union_is_order_independent() {
        let mut a = EvidenceSet::new();
        a.insert("A.pdf");
        let mut b = EvidenceSet::new();
        b.insert("B.pdf");
        b.insert("a.pdf");

        let mut ab = a.clone();
        for name in b.sorted() {
            ab.insert(name);
        }
        let mut ba = b.clone();
        for name in a.sorted() {
            ba.insert(name);
        }
        assert_eq!(ab.len(), 2);
        assert_eq!(
            ab.keys().collect::<Vec<_>>(),
            ba.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn serializes_as_sorted_list() {
        let mut set = EvidenceSet::new();
        set.insert("b.txt");
        set.insert("a.txt");
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            serde_json::json!(["a.txt", "b.txt"])
        );
    }
}
