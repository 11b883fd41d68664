//! Dump reader and traversal configuration

use serde::{Deserialize, Serialize};

/// Worker pool and queue sizing for the indexed reader
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Number of segment workers
    pub workers: usize,
    /// Chunks buffered between the index distributor and the workers
    pub work_queue_capacity: usize,
    /// Decoded pages buffered ahead of the consumer
    pub result_queue_capacity: usize,
    /// Buffer size for decompressed reads (bytes)
    pub read_buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            work_queue_capacity: 1000,
            result_queue_capacity: 1000,
            read_buffer_size: 1024 * 1024,
        }
    }
}

impl ReaderConfig {
    /// Default configuration with a fixed worker count
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }
}

/// Settings for the `traverse` command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraverseConfig {
    /// Log a progress line every N pages
    pub report_interval: u64,
    /// Extract `{{coord}}` templates from each page
    pub parse_coords: bool,
}

impl Default for TraverseConfig {
    fn default() -> Self {
        Self {
            report_interval: 1000,
            parse_coords: false,
        }
    }
}
