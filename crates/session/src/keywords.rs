use serde::Serialize;
use std::collections::HashSet;

/// Keywords typed by the participant plus the suggestions they opted into.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeywordSet {
    base: Vec<String>,
    offered: Vec<String>,
    chosen: Vec<String>,
}

impl KeywordSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the base keywords. Commas count as separators alongside whitespace.
    pub fn set_base(&mut self, text: &str) -> &[String] {
        self.base = dedup(text.replace(',', " ").split_whitespace().map(str::to_string));
        &self.base
    }

    /// Record a fresh batch of suggestions. All of them start out chosen.
    pub fn offer(&mut self, suggestions: Vec<String>) {
        self.offered = dedup(suggestions);
        self.chosen = self.offered.clone();
    }

    /// Narrow the chosen suggestions. Words that were never offered are ignored; order
    /// follows the offered list.
    pub fn choose<S: AsRef<str>>(&mut self, picks: &[S]) -> &[String] {
        let picks: HashSet<&str> = picks.iter().map(|pick| pick.as_ref()).collect();
        self.chosen = self
            .offered
            .iter()
            .filter(|word| picks.contains(word.as_str()))
            .cloned()
            .collect();
        &self.chosen
    }

    #[must_use]
    pub fn base(&self) -> &[String] {
        &self.base
    }

    #[must_use]
    pub fn offered(&self) -> &[String] {
        &self.offered
    }

    #[must_use]
    pub fn chosen(&self) -> &[String] {
        &self.chosen
    }

    /// Base keywords followed by chosen suggestions, exact-match deduplicated.
    #[must_use]
    pub fn combined(&self) -> Vec<String> {
        dedup(self.base.iter().chain(&self.chosen).cloned())
    }
}

fn dedup(words: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    words
        .into_iter()
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn base_accepts_commas_and_spaces() {
        let mut set = KeywordSet::new();
        let base = set.set_base(" land,policy  land, , 2023 ");
        assert_eq!(base, ["land", "policy", "2023"]);
    }

    #[test]
    fn suggestions_default_to_all_chosen() {
        let mut set = KeywordSet::new();
        set.set_base("land");
        set.offer(vec!["zoning".into(), "land".into(), "zoning".into()]);
        assert_eq!(set.offered(), ["zoning", "land"]);
        assert_eq!(set.combined(), vec!["land", "zoning"]);
    }

    #[test]
    fn choose_keeps_only_offered_words_in_offered_order() {
        let mut set = KeywordSet::new();
        set.offer(vec!["a1".into(), "b2".into(), "c3".into()]);
        assert_eq!(set.choose(&["c3", "zz", "a1"]), ["a1", "c3"]);
        assert_eq!(set.choose::<&str>(&[]), [] as [String; 0]);
    }
}
