//! Processor blueprints.

use super::{CommonAttrs, Handler};
use crate::pipeline::Scope;
use crate::{Config, Pipeline, Result};
use std::fmt;
use std::sync::Arc;

/// Blueprint for a leaf segment: a handler plus its attributes.
///
/// The handler receives the running segment as a [`Scope`] and one batch of
/// items. It decides what happens to every result through the scope's
/// flow-control calls; nothing is forwarded implicitly.
///
/// # Example
///
/// ```rust,ignore
/// use piper::Processor;
///
/// let half = Processor::named("half", |scope, batch| {
///     for x in batch {
///         scope.emit([x / 2]);
///     }
///     Ok(())
/// })
/// .allow(|x: &i64| x % 2 == 0)
/// .batch_size(2);
///
/// let mut pipeline = half.init(())?;
/// ```
pub struct Processor<T, C = ()> {
    pub(crate) attrs: CommonAttrs<T>,
    pub(crate) handler: Handler<T, C>,
}

impl<T, C> Processor<T, C> {
    /// Create a processor from a handler. A unique label is generated at
    /// `init` unless one is set.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut Scope<'_, T, C>, Vec<T>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            attrs: CommonAttrs::default(),
            handler: Arc::new(handler),
        }
    }

    /// Create a labelled processor from a handler.
    pub fn named<F>(label: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Scope<'_, T, C>, Vec<T>) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(handler).label(label)
    }

    /// Set the label identifying this segment within its parent.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.attrs.label = Some(label.into());
        self
    }

    /// Set the allow predicate. Items failing it skip this segment and are
    /// forwarded to its output.
    pub fn allow<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.attrs.allow = Some(Arc::new(predicate));
        self
    }

    /// Set the batch size. Must be positive; validated at `init`.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.attrs.batch_size = Some(batch_size);
        self
    }

    /// Enable or disable this segment.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.attrs.enabled = Some(enabled);
        self
    }

    /// Set the debug level for this segment's log gating.
    pub fn debug(mut self, level: u32) -> Self {
        self.attrs.debug = Some(level);
        self
    }

    /// Set the verbose level for this segment's log gating.
    pub fn verbose(mut self, level: u32) -> Self {
        self.attrs.verbose = Some(level);
        self
    }

    /// Instantiate this processor as a single-segment pipeline with the
    /// default engine configuration.
    pub fn init(&self, args: C) -> Result<Pipeline<T, C>>
    where
        T: fmt::Debug + Send + 'static,
    {
        self.init_with(Config::default(), args)
    }

    /// Instantiate this processor with an explicit engine configuration.
    pub fn init_with(&self, config: Config<T>, args: C) -> Result<Pipeline<T, C>>
    where
        T: fmt::Debug,
    {
        Pipeline::build(super::SpecRef::Processor(self), config, args)
    }
}

impl<T, C> Clone for Processor<T, C> {
    fn clone(&self) -> Self {
        Self {
            attrs: self.attrs.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}
