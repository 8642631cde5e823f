//! Live pipeline instances.
//!
//! This module provides the runtime half of the engine:
//!
//! - [`Pipeline`]: the instantiated segment tree, owning every queue
//! - [`SegmentId`]: a stable handle to one segment inside an instance
//! - [`Scope`]: the handle passed to handlers, carrying flow control
//!
//! A pipeline is pull-driven. `enqueue` only files items into queues;
//! handlers run when `dequeue`, `flush`, `prepare` or `process_batch` force
//! progress. A single `process_batch` advances exactly one processor,
//! chosen by the pressure-based scheduler in [`Pipeline::process_batch`].
//!
//! # Example
//!
//! ```rust,ignore
//! use piper::{Container, Processor};
//!
//! let blueprint = Container::named("main").child(Processor::named(
//!     "double",
//!     |scope, batch| {
//!         for x in batch {
//!             scope.emit([x * 2]);
//!         }
//!         Ok(())
//!     },
//! ));
//!
//! let mut pipeline = blueprint.init(())?;
//! pipeline.enqueue([1, 2, 3]);
//! assert_eq!(pipeline.dequeue_n(3)?, vec![2, 4, 6]);
//! ```

mod resolver;
mod scheduler;
mod scope;

pub use scope::Scope;

use crate::config::{env_level, Config, DEBUG_ENV, VERBOSE_ENV};
use crate::path::Path;
use crate::queue::Queue;
use crate::segment::{Allow, Handler, SpecRef};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Stable handle to a segment within one pipeline instance.
///
/// Ids are only meaningful for the instance that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(pub(crate) usize);

impl SegmentId {
    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Where a segment's output goes: the next sibling, or an owning
/// container's drain.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Follower {
    Segment(SegmentId),
    Drain(SegmentId),
}

/// Kind-specific state of a live segment.
pub(crate) enum Body<T, C> {
    Processor {
        handler: Handler<T, C>,
        pending: Box<dyn Queue<T>>,
    },
    Container {
        children: Vec<SegmentId>,
        directory: HashMap<String, SegmentId>,
    },
}

/// One live segment in the instance arena.
pub(crate) struct Node<T, C> {
    pub(crate) label: String,
    pub(crate) path: Path,
    pub(crate) parent: Option<SegmentId>,
    pub(crate) follower: Follower,
    pub(crate) allow: Option<Allow<T>>,
    pub(crate) batch_size: Option<usize>,
    pub(crate) enabled: Option<bool>,
    pub(crate) debug: Option<u32>,
    pub(crate) verbose: Option<u32>,
    /// Output queue. Meaningful for containers and for the root; a non-root
    /// processor's drain is never routed to and stays empty.
    pub(crate) drain: Box<dyn Queue<T>>,
    pub(crate) body: Body<T, C>,
}

/// A live, stateful segment tree.
///
/// Created by calling `init` on a blueprint; see the module docs for the
/// overall flow. Dropping the pipeline drops every queue and any items
/// still buffered.
pub struct Pipeline<T, C = ()> {
    pub(crate) nodes: Vec<Node<T, C>>,
    pub(crate) root: SegmentId,
    pub(crate) config: Config<T>,
    pub(crate) args: C,
    pub(crate) debug_pin: Option<u32>,
    pub(crate) verbose_pin: Option<u32>,
}

impl<T: fmt::Debug, C> Pipeline<T, C> {
    pub(crate) fn build(spec: SpecRef<'_, T, C>, config: Config<T>, args: C) -> Result<Self> {
        config.validate()?;
        let mut nodes = Vec::new();
        let mut counter = 0u64;
        let root = Self::build_node(&mut nodes, &config, spec, None, &mut counter)?;
        Ok(Self {
            nodes,
            root,
            config,
            args,
            debug_pin: env_level(DEBUG_ENV),
            verbose_pin: env_level(VERBOSE_ENV),
        })
    }

    fn build_node(
        nodes: &mut Vec<Node<T, C>>,
        config: &Config<T>,
        spec: SpecRef<'_, T, C>,
        parent: Option<SegmentId>,
        counter: &mut u64,
    ) -> Result<SegmentId> {
        let attrs = match &spec {
            SpecRef::Processor(p) => &p.attrs,
            SpecRef::Container(c) => &c.attrs,
        };

        let label = match &attrs.label {
            Some(label) if label.is_empty() => {
                return Err(Error::Config("segment labels must be non-empty".into()));
            }
            Some(label) => label.clone(),
            None => {
                let kind = match &spec {
                    SpecRef::Processor(_) => "processor",
                    SpecRef::Container(_) => "container",
                };
                let label = format!("{kind}_{counter}");
                *counter += 1;
                label
            }
        };

        let path = match parent {
            Some(p) => nodes[p.0].path.child(label.clone()),
            None => Path::new(label.clone()),
        };

        if attrs.batch_size == Some(0) {
            return Err(Error::Config(format!(
                "segment '{path}': batch_size must be positive"
            )));
        }

        let id = SegmentId(nodes.len());
        let body = match &spec {
            SpecRef::Processor(p) => Body::Processor {
                handler: p.handler.clone(),
                pending: (config.queue_factory)(),
            },
            SpecRef::Container(_) => Body::Container {
                children: Vec::new(),
                directory: HashMap::new(),
            },
        };
        nodes.push(Node {
            label,
            path,
            parent,
            // Correct for the root; every other node is rewired by its
            // parent right below.
            follower: Follower::Drain(id),
            allow: attrs.allow.clone(),
            batch_size: attrs.batch_size,
            enabled: attrs.enabled,
            debug: attrs.debug,
            verbose: attrs.verbose,
            drain: (config.queue_factory)(),
            body,
        });

        if let SpecRef::Container(container) = spec {
            if container.children.is_empty() {
                return Err(Error::Config(format!(
                    "container '{}' must have at least one child",
                    nodes[id.0].path
                )));
            }
            let mut child_ids = Vec::with_capacity(container.children.len());
            for child in &container.children {
                child_ids.push(Self::build_node(
                    nodes,
                    config,
                    child.as_spec(),
                    Some(id),
                    counter,
                )?);
            }
            for (index, &child) in child_ids.iter().enumerate() {
                nodes[child.0].follower = match child_ids.get(index + 1) {
                    Some(&next) => Follower::Segment(next),
                    None => Follower::Drain(id),
                };
            }
            let mut directory = HashMap::new();
            for &child in &child_ids {
                // First occurrence wins for duplicate sibling labels; the
                // resolver's subtree search covers the rest.
                directory
                    .entry(nodes[child.0].label.clone())
                    .or_insert(child);
            }
            if let Body::Container {
                children,
                directory: dir,
            } = &mut nodes[id.0].body
            {
                *children = child_ids;
                *dir = directory;
            }
        }

        Ok(id)
    }

    // ---- root operations -------------------------------------------------

    /// Feed items into the pipeline.
    ///
    /// Items pass the enqueue gate of the root segment (and, transitively,
    /// of the first processor they reach) but no handler runs until the
    /// pipeline is driven by a consuming call.
    pub fn enqueue(&mut self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        let root = self.root;
        self.gate(root, items);
    }

    /// Pull one item, driving the pipeline as far as needed to produce it.
    ///
    /// Returns `Ok(None)` once the pipeline is exhausted.
    pub fn dequeue(&mut self) -> Result<Option<T>> {
        self.prepare(1)?;
        Ok(self.take_ready(1).pop())
    }

    /// Pull up to `n` items, driving the pipeline as far as needed.
    ///
    /// Returns fewer than `n` items only if the pipeline exhausts first.
    pub fn dequeue_n(&mut self, n: usize) -> Result<Vec<T>> {
        self.prepare(n)?;
        Ok(self.take_ready(n))
    }

    /// Number of items queued somewhere in the tree but not yet in the
    /// root's drain.
    pub fn pending(&self) -> usize {
        self.pending_at(self.root)
    }

    /// Number of items in the root's drain, ready to dequeue immediately.
    pub fn ready(&self) -> usize {
        self.ready_at(self.root)
    }

    /// The root's pressure metric; see [`Pipeline::segment_pressure`].
    pub fn pressure(&self) -> usize {
        self.pressure_at(self.root)
    }

    /// Whether any item is still queued short of the root's drain.
    pub fn has_pending(&self) -> bool {
        self.pending() > 0
    }

    /// Whether the pipeline holds no items at all. Pure check; never runs
    /// handlers.
    pub fn is_exhausted(&self) -> bool {
        !self.has_pending() && self.ready() == 0
    }

    /// Drive the pipeline until at least one item is ready or nothing is
    /// pending, then report whether an item is ready.
    pub fn isnt_exhausted(&mut self) -> Result<bool> {
        let root = self.root;
        while self.ready() == 0 && self.pending() > 0 {
            self.process_batch_at(root)?;
        }
        Ok(self.ready() > 0)
    }

    /// Run scheduler steps until nothing is pending anywhere in the tree.
    pub fn flush(&mut self) -> Result<()> {
        let root = self.root;
        while self.pending() > 0 {
            self.process_batch_at(root)?;
        }
        Ok(())
    }

    /// Run scheduler steps until at least `n` items are ready or nothing is
    /// pending.
    pub fn prepare(&mut self, n: usize) -> Result<()> {
        let root = self.root;
        while self.ready() < n && self.pending() > 0 {
            self.process_batch_at(root)?;
        }
        Ok(())
    }

    /// Advance the tree by a single scheduler step.
    pub fn process_batch(&mut self) -> Result<()> {
        let root = self.root;
        self.process_batch_at(root)
    }

    /// The root's immediate children, in tree order. Empty if the root is a
    /// lone processor.
    pub fn children(&self) -> Vec<SegmentId> {
        self.children_of(self.root)
    }

    /// The init args shared read-only with every handler.
    pub fn args(&self) -> &C {
        &self.args
    }

    /// Handle to the root segment.
    pub fn root(&self) -> SegmentId {
        self.root
    }

    fn take_ready(&mut self, n: usize) -> Vec<T> {
        self.nodes[self.root.0].drain.dequeue(n)
    }

    // ---- per-segment views and writable mirrors --------------------------

    /// Full path of a segment.
    pub fn segment_path(&self, id: SegmentId) -> &Path {
        &self.nodes[id.0].path
    }

    /// Label of a segment within its parent.
    pub fn segment_label(&self, id: SegmentId) -> &str {
        &self.nodes[id.0].label
    }

    /// Items queued in the segment's subtree, short of its own drain.
    pub fn segment_pending(&self, id: SegmentId) -> usize {
        self.pending_at(id)
    }

    /// Items in the segment's drain.
    pub fn segment_ready(&self, id: SegmentId) -> usize {
        self.ready_at(id)
    }

    /// Pressure of a segment: `round(100 * pending / batch_size)` for a
    /// processor, the maximum over children for a container. A value of 100
    /// or more means at least one full batch is buffered.
    pub fn segment_pressure(&self, id: SegmentId) -> usize {
        self.pressure_at(id)
    }

    /// A segment's immediate children, in tree order.
    pub fn children_of(&self, id: SegmentId) -> Vec<SegmentId> {
        match &self.nodes[id.0].body {
            Body::Container { children, .. } => children.clone(),
            Body::Processor { .. } => Vec::new(),
        }
    }

    /// Parent of a segment, absent for the root.
    pub fn parent_of(&self, id: SegmentId) -> Option<SegmentId> {
        self.nodes[id.0].parent
    }

    /// Effective batch size: the segment's own if set, else the nearest
    /// ancestor's, else the engine default.
    pub fn effective_batch_size(&self, id: SegmentId) -> usize {
        let mut cursor = Some(id);
        while let Some(at) = cursor {
            if let Some(batch_size) = self.nodes[at.0].batch_size {
                return batch_size;
            }
            cursor = self.nodes[at.0].parent;
        }
        self.config.batch_size
    }

    /// Effective debug level, honouring the `PIPER_DEBUG` pin.
    pub fn effective_debug(&self, id: SegmentId) -> u32 {
        if let Some(pin) = self.debug_pin {
            return pin;
        }
        let mut cursor = Some(id);
        while let Some(at) = cursor {
            if let Some(level) = self.nodes[at.0].debug {
                return level;
            }
            cursor = self.nodes[at.0].parent;
        }
        0
    }

    /// Effective verbose level, honouring the `PIPER_VERBOSE` pin.
    pub fn effective_verbose(&self, id: SegmentId) -> u32 {
        if let Some(pin) = self.verbose_pin {
            return pin;
        }
        let mut cursor = Some(id);
        while let Some(at) = cursor {
            if let Some(level) = self.nodes[at.0].verbose {
                return level;
            }
            cursor = self.nodes[at.0].parent;
        }
        0
    }

    /// Whether the segment and every ancestor is enabled.
    pub fn is_enabled(&self, id: SegmentId) -> bool {
        let mut cursor = Some(id);
        while let Some(at) = cursor {
            if !self.nodes[at.0].enabled.unwrap_or(true) {
                return false;
            }
            cursor = self.nodes[at.0].parent;
        }
        true
    }

    /// Set or unset a segment's enabled flag at runtime.
    pub fn set_enabled(&mut self, id: SegmentId, enabled: Option<bool>) {
        self.nodes[id.0].enabled = enabled;
    }

    /// Set or unset a segment's batch size at runtime. Rejects zero.
    pub fn set_batch_size(&mut self, id: SegmentId, batch_size: Option<usize>) -> Result<()> {
        if batch_size == Some(0) {
            return Err(Error::Config(format!(
                "segment '{}': batch_size must be positive",
                self.nodes[id.0].path
            )));
        }
        self.nodes[id.0].batch_size = batch_size;
        Ok(())
    }

    /// Set or unset a segment's debug level at runtime.
    pub fn set_debug(&mut self, id: SegmentId, level: Option<u32>) {
        self.nodes[id.0].debug = level;
    }

    /// Set or unset a segment's verbose level at runtime.
    pub fn set_verbose(&mut self, id: SegmentId, level: Option<u32>) {
        self.nodes[id.0].verbose = level;
    }

    // ---- aggregation -----------------------------------------------------

    pub(crate) fn pending_at(&self, id: SegmentId) -> usize {
        match &self.nodes[id.0].body {
            Body::Processor { pending, .. } => pending.ready(),
            // A child's drained-but-unmoved items are still short of this
            // segment's own drain, so they count as pending here. Without
            // them the drive loops would stop with items stranded mid-tree.
            Body::Container { children, .. } => children
                .iter()
                .map(|&child| self.pending_at(child) + self.ready_at(child))
                .sum(),
        }
    }

    pub(crate) fn ready_at(&self, id: SegmentId) -> usize {
        self.nodes[id.0].drain.ready()
    }

    pub(crate) fn pressure_at(&self, id: SegmentId) -> usize {
        match &self.nodes[id.0].body {
            Body::Processor { pending, .. } => {
                let batch_size = self.effective_batch_size(id);
                (100 * pending.ready() + batch_size / 2) / batch_size
            }
            Body::Container { children, .. } => children
                .iter()
                .map(|&child| self.pressure_at(child))
                .max()
                .unwrap_or(0),
        }
    }

    pub(crate) fn work_at(&self, id: SegmentId) -> usize {
        self.pending_at(id) + self.ready_at(id)
    }

    // ---- routing ---------------------------------------------------------

    /// The enqueue gate. Disabled segments and items rejected by the allow
    /// predicate are forwarded to the segment's output route; everything
    /// else enters the pending queue (processor) or the first child
    /// (container).
    pub(crate) fn gate(&mut self, id: SegmentId, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        if !self.is_enabled(id) {
            self.log_info(id, "skipping disabled segment", &items);
            self.route_output(id, items);
            return;
        }
        let items = match self.nodes[id.0].allow.clone() {
            Some(predicate) => {
                let (accepted, rejected): (Vec<T>, Vec<T>) =
                    items.into_iter().partition(|item| predicate(item));
                if !rejected.is_empty() {
                    self.log_info(id, "rejected by allow predicate", &rejected);
                    self.route_output(id, rejected);
                }
                accepted
            }
            None => items,
        };
        if items.is_empty() {
            return;
        }
        self.log_debug(id, &format!("queueing {} item(s)", items.len()), &items);
        let first_child = match &self.nodes[id.0].body {
            Body::Container { children, .. } => Some(children[0]),
            Body::Processor { .. } => None,
        };
        match first_child {
            Some(first) => self.gate(first, items),
            None => {
                if let Body::Processor { pending, .. } = &mut self.nodes[id.0].body {
                    pending.enqueue(items);
                }
            }
        }
    }

    /// Route items to the segment's skip destination: a container's own
    /// drain, or a processor's follower.
    pub(crate) fn route_output(&mut self, id: SegmentId, items: Vec<T>) {
        match &self.nodes[id.0].body {
            Body::Container { .. } => self.nodes[id.0].drain.enqueue(items),
            Body::Processor { .. } => self.route_follower(id, items),
        }
    }

    /// Route items to whatever receives this segment's output: the next
    /// sibling's gate, or an owning container's drain.
    pub(crate) fn route_follower(&mut self, id: SegmentId, items: Vec<T>) {
        match self.nodes[id.0].follower {
            Follower::Segment(next) => self.gate(next, items),
            Follower::Drain(owner) => self.nodes[owner.0].drain.enqueue(items),
        }
    }

    // ---- diagnostics -----------------------------------------------------

    fn render_log(&self, id: SegmentId, message: &str, items: &[T]) -> String {
        if self.effective_verbose(id) > 1 && !items.is_empty() {
            format!("{message}: {items:?}")
        } else {
            message.to_string()
        }
    }

    pub(crate) fn log_debug(&self, id: SegmentId, message: &str, items: &[T]) {
        if self.effective_debug(id) == 0 {
            return;
        }
        let rendered = self.render_log(id, message, items);
        self.config
            .logger
            .debug(&self.nodes[id.0].path.to_string(), &rendered);
    }

    pub(crate) fn log_info(&self, id: SegmentId, message: &str, items: &[T]) {
        if self.effective_verbose(id) == 0 && self.effective_debug(id) == 0 {
            return;
        }
        let rendered = self.render_log(id, message, items);
        self.config
            .logger
            .info(&self.nodes[id.0].path.to_string(), &rendered);
    }

    pub(crate) fn log_warn(&self, id: SegmentId, message: &str, items: &[T]) {
        let rendered = self.render_log(id, message, items);
        self.config
            .logger
            .warn(&self.nodes[id.0].path.to_string(), &rendered);
    }

    /// Report a terminating failure and build the error that surfaces it.
    pub(crate) fn log_error(&self, id: SegmentId, message: &str, items: &[T]) -> Error {
        let rendered = self.render_log(id, message, items);
        let path = self.nodes[id.0].path.to_string();
        self.config.logger.error(&path, &rendered);
        Error::Handler {
            segment: path,
            message: rendered,
        }
    }
}

impl<T: fmt::Debug, C> Iterator for Pipeline<T, C> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.isnt_exhausted() {
            Err(e) => Some(Err(e)),
            Ok(true) => self.take_ready(1).pop().map(Ok),
            Ok(false) => None,
        }
    }
}

impl<T: fmt::Debug, C> fmt::Debug for Pipeline<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("root", &self.nodes[self.root.0].path.to_string())
            .field("segments", &self.nodes.len())
            .field("pending", &self.pending())
            .field("ready", &self.ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Container, Processor};

    fn identity() -> Processor<i64> {
        Processor::new(|scope, batch| {
            scope.emit(batch);
            Ok(())
        })
    }

    #[test]
    fn test_build_assigns_paths_and_followers() {
        let pipeline = Container::named("main")
            .child(identity().label("a"))
            .child(identity().label("b"))
            .init(())
            .unwrap();

        let children = pipeline.children();
        assert_eq!(children.len(), 2);
        assert_eq!(pipeline.segment_path(children[0]).to_string(), "main/a");
        assert_eq!(pipeline.segment_path(children[1]).to_string(), "main/b");
        assert!(matches!(
            pipeline.nodes[children[0].0].follower,
            Follower::Segment(next) if next == children[1]
        ));
        assert!(matches!(
            pipeline.nodes[children[1].0].follower,
            Follower::Drain(owner) if owner == pipeline.root
        ));
    }

    #[test]
    fn test_generated_labels_are_unique() {
        let pipeline = Container::named("main")
            .child(identity())
            .child(identity())
            .init(())
            .unwrap();

        let children = pipeline.children();
        assert_ne!(
            pipeline.segment_label(children[0]),
            pipeline.segment_label(children[1])
        );
    }

    #[test]
    fn test_effective_batch_size_walks_up() {
        let mut pipeline = Container::named("main")
            .batch_size(16)
            .child(Container::named("inner").child(identity().label("leaf")))
            .init(())
            .unwrap();

        let leaf = pipeline.find_segment("leaf").unwrap();
        assert_eq!(pipeline.effective_batch_size(leaf), 16);

        // No cached inheritance: mutating the root shows through at once.
        let root = pipeline.root();
        pipeline.set_batch_size(root, Some(4)).unwrap();
        assert_eq!(pipeline.effective_batch_size(leaf), 4);

        pipeline.set_batch_size(root, None).unwrap();
        assert_eq!(
            pipeline.effective_batch_size(leaf),
            crate::DEFAULT_BATCH_SIZE
        );
    }

    #[test]
    fn test_is_enabled_is_a_conjunction() {
        let mut pipeline = Container::named("main")
            .child(Container::named("inner").child(identity().label("leaf")))
            .init(())
            .unwrap();

        let inner = pipeline.find_segment("inner").unwrap();
        let leaf = pipeline.find_segment("leaf").unwrap();
        assert!(pipeline.is_enabled(leaf));

        pipeline.set_enabled(inner, Some(false));
        assert!(!pipeline.is_enabled(inner));
        assert!(!pipeline.is_enabled(leaf));

        pipeline.set_enabled(inner, None);
        assert!(pipeline.is_enabled(leaf));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let blueprint = Container::named("main").child(identity().batch_size(0));
        assert!(matches!(blueprint.init(()), Err(Error::Config(_))));

        let mut pipeline = Container::named("main").child(identity()).init(()).unwrap();
        let root = pipeline.root();
        assert!(pipeline.set_batch_size(root, Some(0)).is_err());
    }

    #[test]
    fn test_pressure_rounding() {
        let mut pipeline = Container::named("main")
            .child(identity().label("p").batch_size(3))
            .init(())
            .unwrap();

        pipeline.enqueue([1, 2]);
        let p = pipeline.find_segment("p").unwrap();
        // round(100 * 2 / 3) = 67
        assert_eq!(pipeline.segment_pressure(p), 67);
    }
}
