//! Configuration for the pipeline orchestrator.

use serde::{Deserialize, Serialize};

/// Orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Capacity of each request's progress event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Capacity of the internal channels between a subsystem and the
    /// request task.
    #[serde(default = "default_subsystem_channel_capacity")]
    pub subsystem_channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

fn default_subsystem_channel_capacity() -> usize {
    32
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            subsystem_channel_capacity: default_subsystem_channel_capacity(),
        }
    }
}

impl PipelineConfig {
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}
