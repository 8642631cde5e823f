//! Container blueprints.

use super::{CommonAttrs, Segment};
use crate::{Config, Pipeline, Result};
use std::fmt;
use std::sync::Arc;

/// Blueprint for a non-leaf segment: an ordered list of children plus the
/// container's own attributes.
///
/// Children are wired in order at `init`: each child's output feeds the next
/// sibling, and the last child's output feeds the container's drain. A
/// container must have at least one child by the time it is instantiated.
///
/// # Example
///
/// ```rust,ignore
/// use piper::{Container, Processor};
///
/// let main = Container::named("main")
///     .batch_size(4)
///     .child(Processor::named("half", |scope, batch| {
///         for x in batch {
///             scope.emit([x / 2]);
///         }
///         Ok(())
///     }));
///
/// let mut pipeline = main.init(())?;
/// ```
pub struct Container<T, C = ()> {
    pub(crate) attrs: CommonAttrs<T>,
    pub(crate) children: Vec<Segment<T, C>>,
}

impl<T, C> Container<T, C> {
    /// Create an empty container. A unique label is generated at `init`
    /// unless one is set; children must be added before `init`.
    pub fn new() -> Self {
        Self {
            attrs: CommonAttrs::default(),
            children: Vec::new(),
        }
    }

    /// Create a labelled empty container.
    pub fn named(label: impl Into<String>) -> Self {
        Self::new().label(label)
    }

    /// Append a child segment.
    pub fn child(mut self, segment: impl Into<Segment<T, C>>) -> Self {
        self.children.push(segment.into());
        self
    }

    /// Append a child segment, overriding its label.
    pub fn child_named(mut self, label: impl Into<String>, segment: impl Into<Segment<T, C>>) -> Self {
        let mut segment = segment.into();
        segment.set_label(label.into());
        self.children.push(segment);
        self
    }

    /// Set the label identifying this segment within its parent.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.attrs.label = Some(label.into());
        self
    }

    /// Set the allow predicate. Items failing it skip the whole container
    /// and land in its drain.
    pub fn allow<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.attrs.allow = Some(Arc::new(predicate));
        self
    }

    /// Set the batch size inherited by children that do not set their own.
    /// Must be positive; validated at `init`.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.attrs.batch_size = Some(batch_size);
        self
    }

    /// Enable or disable this container and, by inheritance, its subtree.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.attrs.enabled = Some(enabled);
        self
    }

    /// Set the debug level for this subtree's log gating.
    pub fn debug(mut self, level: u32) -> Self {
        self.attrs.debug = Some(level);
        self
    }

    /// Set the verbose level for this subtree's log gating.
    pub fn verbose(mut self, level: u32) -> Self {
        self.attrs.verbose = Some(level);
        self
    }

    /// Instantiate this container as the root of a new pipeline with the
    /// default engine configuration.
    pub fn init(&self, args: C) -> Result<Pipeline<T, C>>
    where
        T: fmt::Debug + Send + 'static,
    {
        self.init_with(Config::default(), args)
    }

    /// Instantiate this container with an explicit engine configuration.
    pub fn init_with(&self, config: Config<T>, args: C) -> Result<Pipeline<T, C>>
    where
        T: fmt::Debug,
    {
        Pipeline::build(super::SpecRef::Container(self), config, args)
    }
}

impl<T, C> Default for Container<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> Clone for Container<T, C> {
    fn clone(&self) -> Self {
        Self {
            attrs: self.attrs.clone(),
            children: self.children.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Processor;

    fn passthrough() -> Processor<i64> {
        Processor::new(|scope, batch| {
            scope.emit(batch);
            Ok(())
        })
    }

    #[test]
    fn test_child_order_preserved() {
        let container = Container::named("main")
            .child(passthrough().label("first"))
            .child(passthrough().label("second"))
            .child(Container::named("inner").child(passthrough()));

        assert_eq!(container.children.len(), 3);
        assert_eq!(container.children[0].attrs().label.as_deref(), Some("first"));
        assert_eq!(container.children[1].attrs().label.as_deref(), Some("second"));
        assert_eq!(container.children[2].attrs().label.as_deref(), Some("inner"));
    }

    #[test]
    fn test_child_named_overrides_label() {
        let container = Container::named("main").child_named("renamed", passthrough().label("orig"));
        assert_eq!(
            container.children[0].attrs().label.as_deref(),
            Some("renamed")
        );
    }

    #[test]
    fn test_empty_container_rejected_at_init() {
        let container: Container<i64> = Container::named("main");
        assert!(container.init(()).is_err());
    }
}
