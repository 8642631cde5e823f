//! Segment blueprints.
//!
//! A blueprint is the immutable description of a pipeline tree, built once
//! and instantiable many times:
//!
//! - [`Processor`]: a leaf carrying a handler
//! - [`Container`]: an ordered, labelled group of child segments
//! - [`Segment`]: either of the two, for heterogeneous child lists
//!
//! Calling `init` on a blueprint produces a live
//! [`Pipeline`](crate::Pipeline) with its own queues and runtime attributes;
//! the blueprint itself is never mutated by execution.

mod container;
mod processor;

pub use container::Container;
pub use processor::Processor;

use crate::pipeline::Scope;
use crate::{Config, Pipeline, Result};
use std::fmt;
use std::sync::Arc;

/// Type-erased handler invoked with the running segment and one batch.
pub(crate) type Handler<T, C> =
    Arc<dyn Fn(&mut Scope<'_, T, C>, Vec<T>) -> Result<()> + Send + Sync>;

/// Type-erased allow predicate deciding whether an item enters a segment.
pub(crate) type Allow<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Borrowed view of a blueprint node, used while building an instance.
pub(crate) enum SpecRef<'s, T, C> {
    Processor(&'s Processor<T, C>),
    Container(&'s Container<T, C>),
}

/// Attributes shared by processor and container blueprints.
///
/// All fields are tri-state: unset attributes inherit from the nearest
/// ancestor at runtime, then fall back to the engine defaults.
pub(crate) struct CommonAttrs<T> {
    pub(crate) label: Option<String>,
    pub(crate) allow: Option<Allow<T>>,
    pub(crate) batch_size: Option<usize>,
    pub(crate) enabled: Option<bool>,
    pub(crate) debug: Option<u32>,
    pub(crate) verbose: Option<u32>,
}

impl<T> Default for CommonAttrs<T> {
    fn default() -> Self {
        Self {
            label: None,
            allow: None,
            batch_size: None,
            enabled: None,
            debug: None,
            verbose: None,
        }
    }
}

impl<T> Clone for CommonAttrs<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            allow: self.allow.as_ref().map(Arc::clone),
            batch_size: self.batch_size,
            enabled: self.enabled,
            debug: self.debug,
            verbose: self.verbose,
        }
    }
}

/// A blueprint node: either a processor or a container.
pub enum Segment<T, C = ()> {
    /// A leaf segment with a handler.
    Processor(Processor<T, C>),
    /// A group of child segments.
    Container(Container<T, C>),
}

impl<T, C> Segment<T, C> {
    /// Instantiate this blueprint as the root of a new pipeline with the
    /// default engine configuration.
    pub fn init(&self, args: C) -> Result<Pipeline<T, C>>
    where
        T: fmt::Debug + Send + 'static,
    {
        self.init_with(Config::default(), args)
    }

    /// Instantiate this blueprint with an explicit engine configuration.
    pub fn init_with(&self, config: Config<T>, args: C) -> Result<Pipeline<T, C>>
    where
        T: fmt::Debug,
    {
        Pipeline::build(self.as_spec(), config, args)
    }

    pub(crate) fn attrs(&self) -> &CommonAttrs<T> {
        match self {
            Segment::Processor(p) => &p.attrs,
            Segment::Container(c) => &c.attrs,
        }
    }

    pub(crate) fn as_spec(&self) -> SpecRef<'_, T, C> {
        match self {
            Segment::Processor(p) => SpecRef::Processor(p),
            Segment::Container(c) => SpecRef::Container(c),
        }
    }

    pub(crate) fn set_label(&mut self, label: String) {
        match self {
            Segment::Processor(p) => p.attrs.label = Some(label),
            Segment::Container(c) => c.attrs.label = Some(label),
        }
    }
}

impl<T, C> Clone for Segment<T, C> {
    fn clone(&self) -> Self {
        match self {
            Segment::Processor(p) => Segment::Processor(p.clone()),
            Segment::Container(c) => Segment::Container(c.clone()),
        }
    }
}

impl<T, C> From<Processor<T, C>> for Segment<T, C> {
    fn from(processor: Processor<T, C>) -> Self {
        Segment::Processor(processor)
    }
}

impl<T, C> From<Container<T, C>> for Segment<T, C> {
    fn from(container: Container<T, C>) -> Self {
        Segment::Container(container)
    }
}
