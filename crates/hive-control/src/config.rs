// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration for the worker pool.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`Controller`](crate::Controller).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Number of workers the embedding application starts.
    pub workers: usize,
    /// Duration of one simulated unit of work, in milliseconds.
    pub work_duration_ms: u64,
    /// Maximum number of undelivered worker events.
    /// If the buffer is full, new events are dropped.
    pub event_buffer_size: usize,
    /// Prefix of worker thread names; the worker index is appended.
    pub thread_name_prefix: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            work_duration_ms: 1000,
            event_buffer_size: 1024,
            thread_name_prefix: "worker".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Duration of one simulated unit of work.
    pub fn work_duration(&self) -> Duration {
        Duration::from_millis(self.work_duration_ms)
    }

    /// Thread name of the worker at `index`.
    pub fn thread_name(&self, index: usize) -> String {
        format!("{}-{}", self.thread_name_prefix, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.workers, 2);
        assert_eq!(config.work_duration(), Duration::from_secs(1));
        assert_eq!(config.thread_name(1), "worker-1");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ControllerConfig::from_json_str(r#"{ "workers": 4 }"#).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.work_duration_ms, 1000);
        assert_eq!(config.event_buffer_size, 1024);
    }

    #[test]
    fn full_json() {
        let json = r#"{
            "workers": 3,
            "work_duration_ms": 50,
            "event_buffer_size": 16,
            "thread_name_prefix": "bee"
        }"#;
        let config = ControllerConfig::from_json_str(json).unwrap();
        assert_eq!(config.thread_name(2), "bee-2");
        assert_eq!(config.work_duration(), Duration::from_millis(50));
        assert_eq!(config.event_buffer_size, 16);
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(ControllerConfig::from_json_str(r#"{ "workers": "many" }"#).is_err());
    }
}
