//! # Piper
//!
//! A pull-driven pipeline engine with automatic batching, non-linear flow
//! control and location-based segment lookup.
//!
//! Piper separates a **blueprint** (an immutable description of a segment
//! tree, built from [`Processor`] and [`Container`] values) from an
//! **instance** (a live [`Pipeline`] with its own queues and runtime
//! attributes). A blueprint is built once and may be instantiated many
//! times.
//!
//! ## Features
//!
//! - **Automatic batching**: handlers receive whole batches, sized by the
//!   segment or inherited from its ancestors
//! - **Pressure-based scheduling**: each `dequeue` advances exactly the
//!   segments needed to produce output
//! - **Non-linear flow**: handlers `emit`, `recycle`, `inject` and `eject`
//!   items, or target any segment by location
//! - **Selective filtering**: per-segment allow predicates and enable
//!   flags, with skipped items forwarded untouched
//! - **Pluggable queues and logging**: swap the FIFO and the diagnostics
//!   sink through [`Config`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use piper::{Container, Processor};
//!
//! let blueprint = Container::named("main").batch_size(4).child(
//!     Processor::named("half", |scope, batch| {
//!         for x in batch {
//!             scope.emit([x / 2]);
//!         }
//!         Ok(())
//!     })
//!     .allow(|x: &i64| x % 2 == 0)
//!     .batch_size(2),
//! );
//!
//! let mut pipeline = blueprint.init(())?;
//! pipeline.enqueue([1, 2, 3, 4, 5, 6]);
//! for item in &mut pipeline {
//!     println!("{}", item?);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logger;
pub mod path;
pub mod pipeline;
pub mod queue;
pub mod segment;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::logger::Logger;
    pub use crate::path::Path;
    pub use crate::pipeline::{Pipeline, Scope, SegmentId};
    pub use crate::queue::Queue;
    pub use crate::segment::{Container, Processor, Segment};
}

pub use config::{Config, DEFAULT_BATCH_SIZE};
pub use error::{Error, Result};
pub use logger::{Logger, TracingLogger};
pub use path::Path;
pub use pipeline::{Pipeline, Scope, SegmentId};
pub use queue::{FifoQueue, Queue};
pub use segment::{Container, Processor, Segment};
