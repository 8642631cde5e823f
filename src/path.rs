//! Hierarchical segment paths.
//!
//! A [`Path`] is the immutable, `/`-joined name of a segment inside the
//! tree, built from the labels of its ancestors. Locations passed to the
//! resolver are parsed with [`Path::parse`].

use std::fmt;

/// An immutable sequence of labels identifying a segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    labels: Vec<String>,
}

impl Path {
    /// Create a single-label path.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            labels: vec![label.into()],
        }
    }

    /// Parse a `/`-separated location into a path.
    ///
    /// Empty components are discarded, so `"a//b/"` parses as `a/b`. The
    /// result may be empty if the location contains no labels at all.
    pub fn parse(location: &str) -> Self {
        Self {
            labels: location
                .split('/')
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Extend this path with a child label.
    pub fn child(&self, label: impl Into<String>) -> Self {
        let mut labels = self.labels.clone();
        labels.push(label.into());
        Self { labels }
    }

    /// The last label, naming the segment itself.
    ///
    /// Empty paths have no name.
    pub fn name(&self) -> Option<&str> {
        self.labels.last().map(String::as_str)
    }

    /// The individual labels, outermost first.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the path has no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Whether this path ends with the given label sequence.
    ///
    /// Matching is on whole labels, so `main/ab` does not end with `b`.
    pub fn ends_with(&self, suffix: &[&str]) -> bool {
        if suffix.is_empty() || suffix.len() > self.labels.len() {
            return false;
        }
        self.labels[self.labels.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(have, want)| have == want)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.labels.join("/"))
    }
}
