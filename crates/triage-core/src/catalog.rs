//! Label catalog: the stable, published label schema for a router head.
//!
//! Built at training time from the distinct target labels observed in the
//! samples, sorted lexicographically so repeated training on the same data
//! (in any sample order) yields the same catalog. Inference reports one
//! score per catalog label regardless of what the underlying classifier
//! happened to learn.

use std::collections::BTreeSet;

/// Category assigned to samples whose target label is absent or empty.
pub const DEFAULT_LABEL: &str = "other";

/// Ordered sequence of distinct label strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog(Vec<String>);

impl LabelCatalog {
    /// Build a catalog from raw target labels: distinct, sorted.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let distinct: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self(distinct.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A multi-class head needs at least two classes to be worth fitting.
    pub fn is_trainable(&self) -> bool {
        self.0.len() >= 2
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn into_labels(self) -> Vec<String> {
        self.0
    }
}
