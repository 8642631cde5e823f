//! The running-segment handle passed to handlers.

use super::{Body, Pipeline, SegmentId};
use crate::path::Path;
use crate::{Error, Result};
use std::fmt;

/// A handler's view of its own segment while a batch is being processed.
///
/// The scope carries the flow-control primitives that decide where results
/// go; nothing a handler computes is forwarded implicitly. It also exposes
/// the segment's attributes, the shared init args and the log methods.
///
/// # Example
///
/// ```rust,ignore
/// Processor::named("add_three", |scope, batch| {
///     for x in batch {
///         let result = x + 3;
///         if result < 0 {
///             scope.recycle([result]);
///         } else {
///             scope.emit([result]);
///         }
///     }
///     Ok(())
/// })
/// ```
pub struct Scope<'a, T, C = ()> {
    pipeline: &'a mut Pipeline<T, C>,
    id: SegmentId,
}

impl<'a, T: fmt::Debug, C> Scope<'a, T, C> {
    pub(crate) fn new(pipeline: &'a mut Pipeline<T, C>, id: SegmentId) -> Self {
        Self { pipeline, id }
    }

    // ---- flow control ----------------------------------------------------

    /// Send items onward to this segment's follower: the next sibling's
    /// gate, or the owning container's drain if this is the last child.
    ///
    /// The emitting segment's own allow predicate and enabled flag are
    /// bypassed; the segment is the producer here, not a recipient.
    pub fn emit(&mut self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return;
        }
        self.pipeline
            .log_debug(self.id, &format!("emitting {} item(s)", items.len()), &items);
        self.pipeline.route_follower(self.id, items);
    }

    /// Put items back at the front of this segment's pending queue so the
    /// next batch starts with them, in argument order.
    pub fn recycle(&mut self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return;
        }
        self.pipeline
            .log_debug(self.id, &format!("recycling {} item(s)", items.len()), &items);
        if let Body::Processor { pending, .. } = &mut self.pipeline.nodes[self.id.0].body {
            pending.requeue(items);
        }
    }

    /// Feed items back into the parent container's gate, or into this
    /// segment's own gate at the root.
    pub fn inject(&mut self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return;
        }
        let target = self.pipeline.nodes[self.id.0].parent.unwrap_or(self.id);
        self.pipeline.gate(target, items);
    }

    /// Drop items straight into the parent container's drain (or this
    /// segment's own drain at the root), past all remaining siblings.
    pub fn eject(&mut self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return;
        }
        let target = self.pipeline.nodes[self.id.0].parent.unwrap_or(self.id);
        self.pipeline.nodes[target.0].drain.enqueue(items);
    }

    /// Feed items into the gate of the segment at `location`, resolved
    /// relative to this segment.
    ///
    /// Targeting this segment itself re-runs its own gate, allow predicate
    /// included.
    pub fn inject_at(
        &mut self,
        location: &str,
        items: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        let Some(target) = self.pipeline.find_segment_from(self.id, location) else {
            return Err(Error::Unresolved {
                op: "inject_at",
                location: location.to_string(),
            });
        };
        let items: Vec<T> = items.into_iter().collect();
        self.pipeline.gate(target, items);
        Ok(())
    }

    /// Feed items to the follower of the segment at `location`, resolved
    /// relative to this segment.
    pub fn inject_after(
        &mut self,
        location: &str,
        items: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        let Some(target) = self.pipeline.find_segment_from(self.id, location) else {
            return Err(Error::Unresolved {
                op: "inject_after",
                location: location.to_string(),
            });
        };
        let items: Vec<T> = items.into_iter().collect();
        self.pipeline.route_follower(target, items);
        Ok(())
    }

    /// Resolve a location relative to this segment.
    pub fn find_segment(&self, location: &str) -> Option<SegmentId> {
        self.pipeline.find_segment_from(self.id, location)
    }

    // ---- segment attributes ----------------------------------------------

    /// Handle to this segment.
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Full path of this segment.
    pub fn path(&self) -> &Path {
        &self.pipeline.nodes[self.id.0].path
    }

    /// Label of this segment within its parent.
    pub fn label(&self) -> &str {
        &self.pipeline.nodes[self.id.0].label
    }

    /// The init args captured at root initialization.
    pub fn args(&self) -> &C {
        &self.pipeline.args
    }

    /// Effective batch size of this segment.
    pub fn batch_size(&self) -> usize {
        self.pipeline.effective_batch_size(self.id)
    }

    /// Items still waiting in this segment's pending queue.
    pub fn pending(&self) -> usize {
        self.pipeline.pending_at(self.id)
    }

    /// Whether this segment and all its ancestors are enabled.
    pub fn is_enabled(&self) -> bool {
        self.pipeline.is_enabled(self.id)
    }

    /// Set or unset this segment's enabled flag.
    pub fn set_enabled(&mut self, enabled: Option<bool>) {
        self.pipeline.set_enabled(self.id, enabled);
    }

    // ---- diagnostics -----------------------------------------------------

    /// Log at DEBUG severity, gated on the segment's effective debug level.
    pub fn debug(&self, message: &str) {
        self.pipeline.log_debug(self.id, message, &[]);
    }

    /// Log at INFO severity, gated on the segment's effective verbose or
    /// debug level.
    pub fn info(&self, message: &str) {
        self.pipeline.log_info(self.id, message, &[]);
    }

    /// Log at WARN severity. Never interrupts control flow.
    pub fn warn(&self, message: &str) {
        self.pipeline.log_warn(self.id, message, &[]);
    }

    /// Log at ERROR severity and build the failure for this handler to
    /// return, terminating the current drive of the pipeline.
    pub fn error(&self, message: &str) -> Error {
        self.pipeline.log_error(self.id, message, &[])
    }
}

impl<T: fmt::Debug, C> fmt::Debug for Scope<'_, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("segment", &self.pipeline.nodes[self.id.0].path.to_string())
            .finish()
    }
}
