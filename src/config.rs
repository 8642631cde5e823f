//! Engine configuration.
//!
//! A [`Config`] is an explicit record passed to `init_with`, never ambient
//! state, so tests can instantiate engines with alternate defaults, queues
//! and loggers side by side. `init` uses `Config::default()`.

use crate::logger::{Logger, TracingLogger};
use crate::queue::{FifoQueue, Queue};
use crate::{Error, Result};
use std::sync::Arc;

/// Default batch size applied when no segment in the ancestor chain sets one.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Environment variable pinning the debug level for a whole instance.
pub const DEBUG_ENV: &str = "PIPER_DEBUG";

/// Environment variable pinning the verbose level for a whole instance.
pub const VERBOSE_ENV: &str = "PIPER_VERBOSE";

pub(crate) type QueueFactory<T> = Arc<dyn Fn() -> Box<dyn Queue<T>> + Send + Sync>;

/// Engine-wide defaults for one pipeline instance.
pub struct Config<T> {
    pub(crate) batch_size: usize,
    pub(crate) queue_factory: QueueFactory<T>,
    pub(crate) logger: Arc<dyn Logger>,
}

impl<T: Send + 'static> Default for Config<T> {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            queue_factory: Arc::new(|| Box::new(FifoQueue::new())),
            logger: Arc::new(TracingLogger),
        }
    }
}

impl<T> Config<T> {
    /// Set the default batch size. Must be positive; validated at `init`.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Install a factory producing the queue behind every pending queue and
    /// drain in the instance.
    pub fn queue_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Queue<T>> + Send + Sync + 'static,
    {
        self.queue_factory = Arc::new(factory);
        self
    }

    /// Install a diagnostics sink replacing the default tracing logger.
    pub fn logger<L: Logger + 'static>(mut self, logger: L) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be positive".into()));
        }
        Ok(())
    }
}

impl<T> Clone for Config<T> {
    fn clone(&self) -> Self {
        Self {
            batch_size: self.batch_size,
            queue_factory: Arc::clone(&self.queue_factory),
            logger: Arc::clone(&self.logger),
        }
    }
}

/// Read an integer level from the environment. Unset, empty or unparsable
/// values count as absent.
pub(crate) fn env_level(name: &str) -> Option<u32> {
    std::env::var(name).ok()?.trim().parse().ok()
}
