//! Configuration for how an experiment's runs are executed
//!
//! Runs are independent simulations, so they may be spread over a thread pool.
//! A single run always executes on one thread.

use serde::{Deserialize, Serialize};

/// Enumeration of supported concurrency modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    /// Runs execute one after another on the calling thread
    #[default]
    Sequential,
    /// Runs are distributed over a Rayon thread pool
    Rayon,
}

/// Configuration for experiment execution
///
/// Holds the concurrency mode and the thread pool size used when runs are
/// executed in parallel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// The concurrency mode to use for execution
    pub concurrency_mode: ConcurrencyMode,
    /// The size of the thread pool for parallel execution
    /// Only relevant when concurrency_mode is Rayon; `None` uses Rayon's default
    pub thread_pool_size: Option<usize>,
}

impl ExecutionConfig {
    /// Create a new execution configuration with default values
    ///
    /// Default configuration uses Sequential mode with no thread pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency mode
    ///
    /// # Arguments
    /// * `mode` - The concurrency mode to use
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for parallel execution
    ///
    /// # Note
    /// This setting only affects execution when concurrency_mode is Rayon
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.concurrency_mode == ConcurrencyMode::Rayon
    }
}
