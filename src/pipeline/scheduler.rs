//! The batch scheduler.
//!
//! A scheduler step on a container picks exactly one child to advance:
//!
//! 1. Scanning from the child closest to the drain backwards, the first
//!    overflowing child (pressure at 100 or above, meaning a full batch is
//!    buffered) wins. Draining back to front keeps upstream segments from
//!    stalling behind full successors and favours items nearest completion.
//! 2. Otherwise, among children with any work buffered, the one with the
//!    greatest pressure wins; the earliest child in tree order breaks ties.
//!
//! After the chosen child's step, every child's drained output is swept
//! forward to its follower, front to back, re-running the follower's
//! enqueue gate. The sweep covers all children rather than just the chosen
//! one so items skipped into an intermediate drain keep moving on later
//! steps.
//!
//! A step on a processor dequeues up to one effective batch from its
//! pending queue and hands it to the handler.

use super::{Body, Pipeline, SegmentId};
use crate::pipeline::Scope;
use crate::Result;
use std::fmt;
use std::sync::Arc;

impl<T: fmt::Debug, C> Pipeline<T, C> {
    /// Advance the segment by one step: run a batch on a processor, or pick
    /// and advance one child of a container.
    pub(crate) fn process_batch_at(&mut self, id: SegmentId) -> Result<()> {
        match &self.nodes[id.0].body {
            Body::Processor { .. } => self.process_processor(id),
            Body::Container { .. } => self.process_container(id),
        }
    }

    fn process_processor(&mut self, id: SegmentId) -> Result<()> {
        let batch_size = self.effective_batch_size(id);
        let taken = match &mut self.nodes[id.0].body {
            Body::Processor { handler, pending } if pending.ready() > 0 => {
                let take = batch_size.min(pending.ready());
                Some((Arc::clone(handler), pending.dequeue(take)))
            }
            _ => None,
        };
        let Some((handler, batch)) = taken else {
            return Ok(());
        };
        self.log_debug(id, &format!("processing batch of {}", batch.len()), &batch);
        let mut scope = Scope::new(self, id);
        handler(&mut scope, batch)
    }

    fn process_container(&mut self, id: SegmentId) -> Result<()> {
        let children: Vec<SegmentId> = match &self.nodes[id.0].body {
            Body::Container { children, .. } => children.clone(),
            Body::Processor { .. } => return Ok(()),
        };

        let mut chosen = children
            .iter()
            .rev()
            .copied()
            .find(|&child| self.pressure_at(child) >= 100);
        if let Some(child) = chosen {
            let message = format!(
                "chose overflowing segment closest to drain: {}",
                self.nodes[child.0].path
            );
            self.log_debug(id, &message, &[]);
        } else {
            let mut best: Option<(SegmentId, usize)> = None;
            for &child in &children {
                if self.work_at(child) == 0 {
                    continue;
                }
                let pressure = self.pressure_at(child);
                if best.map_or(true, |(_, top)| pressure > top) {
                    best = Some((child, pressure));
                }
            }
            if let Some((child, _)) = best {
                let message = format!(
                    "chose segment closest to overflow: {}",
                    self.nodes[child.0].path
                );
                self.log_debug(id, &message, &[]);
                chosen = Some(child);
            }
        }

        if let Some(child) = chosen {
            self.process_batch_at(child)?;
        }

        for &child in &children {
            let ready = self.ready_at(child);
            if ready > 0 {
                let items = self.nodes[child.0].drain.dequeue(ready);
                self.route_follower(child, items);
            }
        }
        Ok(())
    }
}
