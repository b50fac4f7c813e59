//! The set of offer ids a marketplace campaign knows about.

use bridge_traits::marketplace::CatalogOfferId;
use std::collections::HashSet;

/// Distinct catalog offer ids in first-seen order.
///
/// Iteration order is the order ids were first returned by the listing
/// endpoint, which keeps the zero-stock tail of a reconciliation stable
/// between runs over the same catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogOfferSet {
    ordered: Vec<CatalogOfferId>,
    index: HashSet<CatalogOfferId>,
}

impl CatalogOfferSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `offer_id`; returns `false` when it was already present.
    pub fn insert(&mut self, offer_id: CatalogOfferId) -> bool {
        if self.index.contains(&offer_id) {
            return false;
        }
        self.index.insert(offer_id.clone());
        self.ordered.push(offer_id);
        true
    }

    pub fn contains(&self, offer_id: &str) -> bool {
        self.index.contains(offer_id)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogOfferId> {
        self.ordered.iter()
    }
}

impl Extend<CatalogOfferId> for CatalogOfferSet {
    fn extend<I: IntoIterator<Item = CatalogOfferId>>(&mut self, iter: I) {
        for offer_id in iter {
            self.insert(offer_id);
        }
    }
}

impl FromIterator<CatalogOfferId> for CatalogOfferSet {
    fn from_iter<I: IntoIterator<Item = CatalogOfferId>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> FromIterator<&'a str> for CatalogOfferSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_collapsed_in_first_seen_order() {
        let set: CatalogOfferSet = ["B", "A", "B", "C", "A"].into_iter().collect();

        assert_eq!(set.len(), 3);
        let ids: Vec<&str> = set.iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_insert_reports_novelty() {
        let mut set = CatalogOfferSet::new();
        assert!(set.insert("A".to_string()));
        assert!(!set.insert("A".to_string()));
        assert!(set.contains("A"));
        assert!(!set.contains("B"));
    }
}
