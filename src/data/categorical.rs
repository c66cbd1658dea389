//! Categorical per-sample columns.
//!
//! A [`Categorical`] stores one string value per sample as an integer code
//! into a deduplicated category list. Categories are kept in **natural sort
//! order** (embedded integers compare numerically), so cluster label "2"
//! always sorts before "10" regardless of how many clusters a run produced.

use std::cmp::Ordering;
use std::collections::HashMap;

/// A per-sample categorical column with naturally sorted categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorical {
    /// Per-sample index into `categories`.
    codes: Vec<usize>,
    /// Distinct values, natural-sort ordered.
    categories: Vec<String>,
}

impl Categorical {
    /// Build a column from raw per-sample values.
    ///
    /// The category list is the set of distinct values, ordered by
    /// [`natord::compare`].
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();

        let mut categories: Vec<String> = values.clone();
        categories.sort_by(|a, b| natural_cmp(a, b));
        categories.dedup();

        let index: HashMap<&str, usize> = categories
            .iter()
            .enumerate()
            .map(|(code, cat)| (cat.as_str(), code))
            .collect();

        let codes = values.iter().map(|v| index[v.as_str()]).collect();

        Self { codes, categories }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the column has no samples.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The value of sample `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    pub fn value(&self, i: usize) -> &str {
        &self.categories[self.codes[i]]
    }

    /// Integer code of sample `i`.
    pub fn code(&self, i: usize) -> usize {
        self.codes[i]
    }

    /// Distinct values in natural sort order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of distinct values.
    pub fn n_categories(&self) -> usize {
        self.categories.len()
    }

    /// Iterate per-sample values in sample order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(|&c| self.categories[c].as_str())
    }
}

/// Natural string comparison: embedded integers compare by numeric value.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natord::compare(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_use_natural_order() {
        let col = Categorical::from_values(["10", "2", "1", "2"]);
        assert_eq!(col.categories(), &["1", "2", "10"]);
    }

    #[test]
    fn values_round_trip_through_codes() {
        let col = Categorical::from_values(["b", "a", "b", "c"]);
        let got: Vec<&str> = col.values().collect();
        assert_eq!(got, vec!["b", "a", "b", "c"]);
        assert_eq!(col.value(3), "c");
        assert_eq!(col.n_categories(), 3);
    }

    #[test]
    fn prefixed_labels_sort_naturally() {
        let col = Categorical::from_values(["A-B,10", "A-B,2", "C"]);
        assert_eq!(col.categories(), &["A-B,2", "A-B,10", "C"]);
    }

    #[test]
    fn empty_column() {
        let col = Categorical::from_values(Vec::<String>::new());
        assert!(col.is_empty());
        assert_eq!(col.n_categories(), 0);
    }
}
