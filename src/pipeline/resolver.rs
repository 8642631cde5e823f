//! Location resolution.
//!
//! Maps a `/`-joined location to a segment by searching outward from the
//! caller: the caller's own container is searched first (children named in
//! the location's first label before anything else, then whole subtrees
//! depth first, then the node itself), and on a miss the search climbs one
//! ancestor and repeats. The result is the match nearest the caller, with
//! deeper matches inside a subtree beating a match on the subtree's own
//! node. A full path from the root always disambiguates.

use super::{Body, Pipeline, SegmentId};
use crate::path::Path;
use std::fmt;

impl<T: fmt::Debug, C> Pipeline<T, C> {
    /// Resolve a location from the root. See
    /// [`find_segment_from`](Pipeline::find_segment_from).
    pub fn find_segment(&self, location: &str) -> Option<SegmentId> {
        self.find_segment_from(self.root, location)
    }

    /// Resolve a location relative to `from`, expanding outward until a
    /// match is found. Returns `None` when no segment in the tree matches.
    pub fn find_segment_from(&self, from: SegmentId, location: &str) -> Option<SegmentId> {
        let parsed = Path::parse(location);
        let labels: Vec<&str> = parsed.labels().iter().map(String::as_str).collect();
        if labels.is_empty() {
            return None;
        }
        let mut cursor = match self.nodes[from.0].body {
            Body::Container { .. } => Some(from),
            Body::Processor { .. } => self.nodes[from.0].parent.or(Some(from)),
        };
        while let Some(at) = cursor {
            if let Some(found) = self.descendant(at, &labels) {
                return Some(found);
            }
            cursor = self.nodes[at.0].parent;
        }
        None
    }

    /// Search one subtree. Order of preference: the immediate child named
    /// by the first label (recursing with the remainder), then each child's
    /// subtree with the whole location, then the node itself by path
    /// suffix.
    fn descendant(&self, at: SegmentId, labels: &[&str]) -> Option<SegmentId> {
        if let Body::Container {
            children,
            directory,
        } = &self.nodes[at.0].body
        {
            if let Some(&named) = directory.get(labels[0]) {
                if labels.len() == 1 {
                    return Some(named);
                }
                if let Some(found) = self.descendant(named, &labels[1..]) {
                    return Some(found);
                }
            }
            for &child in children {
                if let Some(found) = self.descendant(child, labels) {
                    return Some(found);
                }
            }
        }
        if self.nodes[at.0].path.ends_with(labels) {
            return Some(at);
        }
        None
    }
}
